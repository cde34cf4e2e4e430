//! The client facade: connect to the store, claim coordinates, resolve
//! endpoints.

use crate::claim::{ClaimState, ServiceHandle};
use crate::common::{Config, Error, Result};
use crate::naming::{Coordinate, PathCodec, ServiceStatus};
use crate::resolver::Resolver;
use crate::session::SessionManager;
use crate::store::{CreateMode, StoreConnector, StoreSession};
use std::sync::Arc;
use std::time::Duration;

/// Entry point for claiming and resolving coordinates.
///
/// Owns the one session to the coordinated store this process uses; all
/// handles and resolvers it hands out share that session and follow it
/// across reconnects.
pub struct Cellname {
    config: Config,
    codec: PathCodec,
    manager: SessionManager,
}

impl Cellname {
    pub fn new(config: Config, connector: Arc<dyn StoreConnector>) -> Self {
        let manager = SessionManager::new(
            connector,
            Duration::from_millis(config.reconnect_deadline_ms),
        );
        Self {
            codec: PathCodec::new(config.root_path.clone()),
            config,
            manager,
        }
    }

    /// Connect, waiting for the store to report the session connected.
    pub async fn connect_with_timeout(&self, wait: Duration) -> Result<()> {
        self.manager.connect_with_timeout(wait).await?;
        tracing::info!("connected to store {}", self.config.connect_string);
        Ok(())
    }

    /// Connect with an effectively unbounded wait.
    pub async fn connect(&self) -> Result<()> {
        self.manager.connect().await?;
        tracing::info!("connected to store {}", self.config.connect_string);
        Ok(())
    }

    /// Recover the session if it is down. See
    /// [`SessionKeeper::resolve_connection_problems`](crate::session::SessionKeeper::resolve_connection_problems).
    pub async fn resolve_connection_problems(&self) -> Result<bool> {
        self.manager.resolve_connection_problems().await
    }

    /// Create the coordinate's paths in the store. Idempotent: elements
    /// that already exist are fine.
    pub async fn create_coordinate(&self, coordinate: &Coordinate) -> Result<()> {
        let session = self.manager.keeper().current()?;
        ensure_path(&session, &self.codec.root_path(coordinate)).await?;
        let config_path = self.codec.config_path(coordinate, None)?;
        match session
            .create(&config_path, Vec::new(), CreateMode::Persistent)
            .await
        {
            Ok(()) | Err(Error::NodeExists(_)) => {}
            Err(e) => return Err(e),
        }
        tracing::info!("created coordinate {}", coordinate);
        Ok(())
    }

    /// Claim a coordinate, returning the handle through which the
    /// service publishes its status and endpoints.
    pub async fn claim(&self, coordinate: Coordinate) -> Result<ServiceHandle> {
        let keeper = self.manager.keeper();
        let mut state = ClaimState::new(keeper.clone(), &self.codec, coordinate.clone());
        state.claim().await?;
        let config_path = self.codec.config_path(&coordinate, None)?;
        Ok(ServiceHandle::new(coordinate, state, keeper, config_path))
    }

    /// One-shot read of the status another process published.
    pub async fn status(&self, coordinate: &Coordinate) -> Result<ServiceStatus> {
        let mut state = ClaimState::new(self.manager.keeper(), &self.codec, coordinate.clone());
        state.load().await?;
        Ok(state.status()?.clone())
    }

    /// A resolver sharing this client's session.
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.manager.keeper(), self.codec.clone())
    }

    /// Close the session to the store. Claims held by this process are
    /// released with it.
    pub async fn close(&self) -> Result<()> {
        self.manager.close().await
    }
}

/// Create every element of `path`, ignoring the ones already present.
async fn ensure_path(session: &Arc<dyn StoreSession>, path: &str) -> Result<()> {
    let mut prefix = String::with_capacity(path.len());
    for segment in path.trim_start_matches('/').split('/') {
        prefix.push('/');
        prefix.push_str(segment);
        match session
            .create(&prefix, Vec::new(), CreateMode::Persistent)
            .await
        {
            Ok(()) | Err(Error::NodeExists(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
