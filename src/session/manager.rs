//! Connection manager: owns the session lifecycle.

use crate::common::{Error, Result};
use crate::session::keeper::{open_session, SessionKeeper, Shared};
use crate::store::StoreConnector;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex};

/// Effectively unbounded wait for `connect()`. One hundred years.
const FOREVER: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Opens the session to the coordinated store, hands out [`SessionKeeper`]s
/// and recovers lost sessions.
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn StoreConnector>, reconnect_deadline: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                current: Mutex::new(None),
                reconnect_lock: AsyncMutex::new(()),
                reconnect_deadline,
                connected_signal: Mutex::new(None),
            }),
        }
    }

    /// An indirection over the live session; cheap to clone, stays valid
    /// across reconnects.
    pub fn keeper(&self) -> SessionKeeper {
        SessionKeeper {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Open a session and block until the store reports it connected or
    /// the timeout elapses.
    pub async fn connect_with_timeout(&self, wait: Duration) -> Result<()> {
        let (signal_tx, signal_rx) = oneshot::channel();
        *self.shared.connected_signal.lock().unwrap() = Some(signal_tx);

        let session = open_session(&self.shared).await?;
        *self.shared.current.lock().unwrap() = Some(session);

        match tokio::time::timeout(wait, signal_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Error::CouldNotConnectToStorage(
                "connection signal dropped before the store connected".to_string(),
            )),
            Err(_) => Err(Error::CouldNotConnectToStorage(
                "connecting to the store timed out".to_string(),
            )),
        }
    }

    /// Connect with a wait long enough to be unbounded in practice.
    pub async fn connect(&self) -> Result<()> {
        self.connect_with_timeout(FOREVER).await
    }

    pub async fn resolve_connection_problems(&self) -> Result<bool> {
        self.keeper().resolve_connection_problems().await
    }

    /// Close the session. Ephemeral nodes it owns (claims included) are
    /// removed by the store.
    pub async fn close(&self) -> Result<()> {
        let session = self
            .shared
            .current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                Error::InvalidState("cannot close: not connected to storage".to_string())
            })?;
        session.close().await
    }
}
