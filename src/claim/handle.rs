//! The service handle: how a claimed service talks to the outside world.

use crate::claim::state::ClaimState;
use crate::common::{Error, Result};
use crate::naming::{Coordinate, Endpoint, ServiceStatus};
use crate::session::SessionKeeper;
use crate::store::{NodeEvent, NodeEventKind};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// A configuration change under the coordinate's config sub-tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEvent {
    /// Name of the config node, relative to the config root.
    pub name: String,
    pub kind: ConfigEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEventKind {
    Created,
    Updated,
    Removed,
}

/// Callback invoked on configuration changes. Delivery is asynchronous
/// relative to the writer, at-least-once, with no ordering guarantee
/// between listeners.
pub trait ConfigListener: Send + Sync {
    fn on_config_event(&self, event: &ConfigEvent);
}

/// Handle returned by a successful claim.
///
/// Every mutating call is one round trip to the store. After [`close`]
/// the claim is released, its endpoints disappear with it, and all
/// further calls fail with `HandleClosed`.
///
/// [`close`]: ServiceHandle::close
pub struct ServiceHandle {
    coordinate: Coordinate,
    state: ClaimState,
    keeper: SessionKeeper,
    config_path: String,
    listeners: Arc<Mutex<Vec<Arc<dyn ConfigListener>>>>,
    watch_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("coordinate", &self.coordinate)
            .field("closed", &self.closed)
            .finish()
    }
}

impl ServiceHandle {
    pub(crate) fn new(
        coordinate: Coordinate,
        state: ClaimState,
        keeper: SessionKeeper,
        config_path: String,
    ) -> Self {
        Self {
            coordinate,
            state,
            keeper,
            config_path,
            listeners: Arc::new(Mutex::new(Vec::new())),
            watch_task: None,
            closed: false,
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub async fn set_status(&mut self, status: ServiceStatus) -> Result<()> {
        self.ensure_open()?;
        self.state.update_status(status).await
    }

    pub async fn put_endpoint(&mut self, endpoint: Endpoint) -> Result<()> {
        self.put_endpoints(vec![endpoint]).await
    }

    pub async fn put_endpoints(&mut self, endpoints: Vec<Endpoint>) -> Result<()> {
        self.ensure_open()?;
        self.state.put_endpoints(endpoints).await
    }

    pub async fn remove_endpoint(&mut self, name: &str) -> Result<()> {
        self.remove_endpoints(&[name.to_string()]).await
    }

    pub async fn remove_endpoints(&mut self, names: &[String]) -> Result<()> {
        self.ensure_open()?;
        self.state.remove_endpoints(names).await
    }

    /// Register a listener for changes under the config sub-tree. The
    /// watch on the store is established on the first registration.
    pub async fn register_config_listener(
        &mut self,
        listener: Arc<dyn ConfigListener>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.listeners.lock().unwrap().push(listener);
        if self.watch_task.is_none() {
            let session = self.keeper.current()?;
            let mut events = session.watch(&self.config_path).await?;
            let listeners = Arc::clone(&self.listeners);
            let config_path = self.config_path.clone();
            self.watch_task = Some(tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    let Some(config_event) = config_event_for(&config_path, &event) else {
                        continue;
                    };
                    for listener in listeners.lock().unwrap().iter() {
                        listener.on_config_event(&config_event);
                    }
                }
            }));
        }
        Ok(())
    }

    /// Release the claim and invalidate the handle. Only the status node
    /// is deleted; config nodes are operator-managed and survive.
    pub async fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state.release().await?;
        if let Some(task) = self.watch_task.take() {
            task.abort();
        }
        self.closed = true;
        tracing::info!("closed service handle for {}", self.coordinate);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::HandleClosed);
        }
        Ok(())
    }
}

fn config_event_for(config_path: &str, event: &NodeEvent) -> Option<ConfigEvent> {
    let name = event.path.strip_prefix(config_path)?.strip_prefix('/')?;
    let kind = match event.kind {
        NodeEventKind::Created => ConfigEventKind::Created,
        NodeEventKind::DataChanged => ConfigEventKind::Updated,
        NodeEventKind::Deleted => ConfigEventKind::Removed,
    };
    Some(ConfigEvent {
        name: name.to_string(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_event_mapping() {
        let event = NodeEvent {
            path: "/cn/c/u/s/1/config/db".to_string(),
            kind: NodeEventKind::DataChanged,
        };
        let mapped = config_event_for("/cn/c/u/s/1/config", &event).unwrap();
        assert_eq!(mapped.name, "db");
        assert_eq!(mapped.kind, ConfigEventKind::Updated);
    }

    #[test]
    fn test_config_root_itself_is_ignored() {
        let event = NodeEvent {
            path: "/cn/c/u/s/1/config".to_string(),
            kind: NodeEventKind::DataChanged,
        };
        assert!(config_event_for("/cn/c/u/s/1/config", &event).is_none());
    }
}
