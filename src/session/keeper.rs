//! Shared, swappable reference to the live store session.
//!
//! Claim stores and resolvers hold a [`SessionKeeper`] rather than a raw
//! session so that after a reconnect they observe the replacement session
//! without asking the manager again. Reconnection is serialized by one
//! async mutex held for the entire critical section; a caller that was
//! queued behind a successful reconnect sees a connected session and
//! reports success without opening anything.

use crate::common::{Error, Result};
use crate::store::{SessionEvent, SessionState, StoreConnector, StoreSession};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::time::{sleep, Instant};

const EVENT_CHANNEL_CAPACITY: usize = 16;
const RECONNECT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) struct Shared {
    pub(crate) connector: Arc<dyn StoreConnector>,
    pub(crate) current: Mutex<Option<Arc<dyn StoreSession>>>,
    /// Serializes reconnect attempts.
    pub(crate) reconnect_lock: AsyncMutex<()>,
    pub(crate) reconnect_deadline: Duration,
    /// Fired exactly once, on the first Connected event of the first
    /// session. Reconnects use the bounded poll path instead.
    pub(crate) connected_signal: Mutex<Option<oneshot::Sender<()>>>,
}

/// Open a session through the connector and start its event pump.
pub(crate) async fn open_session(shared: &Arc<Shared>) -> Result<Arc<dyn StoreSession>> {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let session = shared
        .connector
        .open(tx)
        .await
        .map_err(|e| Error::CouldNotConnectToStorage(e.to_string()))?;
    tokio::spawn(pump_events(rx, Arc::clone(shared)));
    Ok(session)
}

async fn pump_events(mut events: mpsc::Receiver<SessionEvent>, shared: Arc<Shared>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Connected => {
                tracing::info!("store session connected");
                if let Some(signal) = shared.connected_signal.lock().unwrap().take() {
                    let _ = signal.send(());
                }
            }
            SessionEvent::Lost => tracing::warn!("store session lost"),
            SessionEvent::Closed => tracing::info!("store session closed"),
            SessionEvent::AuthFailed => {
                tracing::error!("store session authentication failed")
            }
        }
    }
}

/// Clonable indirection over the live session.
#[derive(Clone)]
pub struct SessionKeeper {
    pub(crate) shared: Arc<Shared>,
}

impl SessionKeeper {
    /// The latest live session reference.
    pub fn current(&self) -> Result<Arc<dyn StoreSession>> {
        self.shared
            .current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::InvalidState("not connected to storage".to_string()))
    }

    /// Inspect the session and recover it if it is down.
    ///
    /// Already connected is a no-op success. An auth-failed session is
    /// fatal and surfaces as an error. A closed or lost session gets one
    /// bounded reconnect attempt; its failure is reported as `Ok(false)`
    /// so callers can degrade instead of unwinding.
    pub async fn resolve_connection_problems(&self) -> Result<bool> {
        let _guard = self.shared.reconnect_lock.lock().await;
        match self.current()?.state() {
            SessionState::Connected => {
                tracing::debug!("asked to reconnect, already connected");
                return Ok(true);
            }
            SessionState::AuthFailed => {
                return Err(Error::AuthenticationFailed(
                    "store session is in terminal auth-failed state".to_string(),
                ))
            }
            SessionState::Connecting => {
                return Err(Error::Store(
                    "store session still connecting, refusing to reconnect".to_string(),
                ))
            }
            SessionState::Closed | SessionState::Lost => {}
        }

        tracing::info!("store session down, attempting reconnect");
        match self.reconnect_within(self.shared.reconnect_deadline).await {
            Ok(()) => Ok(true),
            Err(err @ Error::AuthenticationFailed(_)) => Err(err),
            Err(e) => {
                tracing::warn!("could not reconnect: {}", e);
                Ok(false)
            }
        }
    }

    /// Open replacement sessions and poll their state until one reports
    /// Connected or the deadline passes. The first-connect one-shot has
    /// already fired and is never reused here.
    async fn reconnect_within(&self, deadline: Duration) -> Result<()> {
        let give_up = Instant::now() + deadline;
        loop {
            let session = match open_session(&self.shared).await {
                Ok(session) => session,
                Err(e) => {
                    if Instant::now() >= give_up {
                        return Err(e);
                    }
                    sleep(RECONNECT_POLL_INTERVAL).await;
                    continue;
                }
            };

            loop {
                match session.state() {
                    SessionState::Connected => {
                        *self.shared.current.lock().unwrap() = Some(session);
                        tracing::info!("reconnected to store");
                        return Ok(());
                    }
                    SessionState::AuthFailed => {
                        return Err(Error::AuthenticationFailed(
                            "authentication failed while reconnecting".to_string(),
                        ))
                    }
                    SessionState::Closed | SessionState::Lost => break,
                    SessionState::Connecting => {
                        if Instant::now() >= give_up {
                            return Err(Error::CouldNotConnectToStorage(
                                "reconnect deadline exceeded".to_string(),
                            ));
                        }
                        sleep(RECONNECT_POLL_INTERVAL).await;
                    }
                }
            }

            if Instant::now() >= give_up {
                return Err(Error::CouldNotConnectToStorage(
                    "reconnect deadline exceeded".to_string(),
                ));
            }
        }
    }
}
