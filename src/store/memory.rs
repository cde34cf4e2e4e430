//! In-memory coordinated store.
//!
//! A complete implementation of the store contract: hierarchical nodes,
//! exclusive creation, versioned conditional writes and deletes,
//! ephemeral nodes bound to their creating session, subtree watches and
//! per-session connection-state events. The tests run against it, and it
//! is usable as an embedded store for single-process setups.
//!
//! Test-facing controls: [`MemoryStore::hold_connections`] keeps new
//! sessions in `Connecting` forever, [`MemoryStore::fail_auth`] makes
//! them report `AuthFailed`, and [`MemoryStore::expire_all_sessions`]
//! simulates the store expiring every live session.

use crate::common::{Error, Result};
use crate::store::{
    CreateMode, NodeEvent, NodeEventKind, SessionEvent, SessionState, StoreConnector,
    StoreSession, Version,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const WATCH_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
struct Node {
    payload: Vec<u8>,
    version: Version,
    owner: Option<u64>,
}

struct Watcher {
    path: String,
    tx: mpsc::Sender<NodeEvent>,
}

impl Watcher {
    fn covers(&self, path: &str) -> bool {
        path == self.path
            || (path.len() > self.path.len()
                && path.starts_with(&self.path)
                && path.as_bytes()[self.path.len()] == b'/')
    }
}

#[derive(Default)]
struct Tree {
    nodes: HashMap<String, Node>,
    watchers: Vec<Watcher>,
}

impl Tree {
    fn emit(&mut self, event: NodeEvent) {
        self.watchers.retain(|w| {
            if !w.covers(&event.path) {
                return true;
            }
            match w.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("watch channel for {} full, dropping event", w.path);
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}

struct SessionCtl {
    state: Mutex<SessionState>,
    events: mpsc::Sender<SessionEvent>,
}

struct Inner {
    tree: Mutex<Tree>,
    sessions: Mutex<HashMap<u64, Arc<SessionCtl>>>,
    next_session_id: AtomicU64,
    hold_connections: AtomicBool,
    fail_auth: AtomicBool,
}

/// Shared handle to one in-memory store. Clones refer to the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tree: Mutex::new(Tree::default()),
                sessions: Mutex::new(HashMap::new()),
                next_session_id: AtomicU64::new(1),
                hold_connections: AtomicBool::new(false),
                fail_auth: AtomicBool::new(false),
            }),
        }
    }

    /// Keep sessions opened from now on stuck in `Connecting`.
    pub fn hold_connections(&self, hold: bool) {
        self.inner.hold_connections.store(hold, Ordering::SeqCst);
    }

    /// Make sessions opened from now on report `AuthFailed`.
    pub fn fail_auth(&self, fail: bool) {
        self.inner.fail_auth.store(fail, Ordering::SeqCst);
    }

    /// Expire every live session: mark them lost, strip their ephemeral
    /// nodes and deliver `Lost` on each session's event channel.
    pub fn expire_all_sessions(&self) {
        let expired: Vec<Arc<SessionCtl>> =
            self.inner.sessions.lock().unwrap().drain().map(|(_, c)| c).collect();
        for ctl in &expired {
            *ctl.state.lock().unwrap() = SessionState::Lost;
            let _ = ctl.events.try_send(SessionEvent::Lost);
        }
        let mut tree = self.inner.tree.lock().unwrap();
        let ephemerals: Vec<String> = tree
            .nodes
            .iter()
            .filter(|(_, node)| node.owner.is_some())
            .map(|(path, _)| path.clone())
            .collect();
        for path in ephemerals {
            tree.nodes.remove(&path);
            tree.emit(NodeEvent {
                path,
                kind: NodeEventKind::Deleted,
            });
        }
    }

    /// Does a node exist at `path`?
    pub fn has_node(&self, path: &str) -> bool {
        self.inner.tree.lock().unwrap().nodes.contains_key(path)
    }

    /// Number of sessions the store is currently tracking.
    pub fn live_session_count(&self) -> usize {
        self.inner.sessions.lock().unwrap().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn open(&self, events: mpsc::Sender<SessionEvent>) -> Result<Arc<dyn StoreSession>> {
        let id = self.inner.next_session_id.fetch_add(1, Ordering::SeqCst);
        let initial = if self.inner.fail_auth.load(Ordering::SeqCst) {
            SessionState::AuthFailed
        } else if self.inner.hold_connections.load(Ordering::SeqCst) {
            SessionState::Connecting
        } else {
            SessionState::Connected
        };

        let ctl = Arc::new(SessionCtl {
            state: Mutex::new(initial),
            events: events.clone(),
        });
        self.inner.sessions.lock().unwrap().insert(id, Arc::clone(&ctl));

        match initial {
            SessionState::Connected => {
                let _ = events.send(SessionEvent::Connected).await;
            }
            SessionState::AuthFailed => {
                let _ = events.send(SessionEvent::AuthFailed).await;
            }
            _ => {}
        }

        Ok(Arc::new(MemorySession {
            id,
            inner: Arc::clone(&self.inner),
            ctl,
        }))
    }
}

struct MemorySession {
    id: u64,
    inner: Arc<Inner>,
    ctl: Arc<SessionCtl>,
}

impl MemorySession {
    fn ensure_connected(&self) -> Result<()> {
        let state = *self.ctl.state.lock().unwrap();
        if state != SessionState::Connected {
            return Err(Error::Store(format!(
                "session {} is {}, not connected",
                self.id, state
            )));
        }
        Ok(())
    }
}

fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
        return Err(Error::Store(format!("malformed path: {:?}", path)));
    }
    if path[1..].split('/').any(str::is_empty) {
        return Err(Error::Store(format!("malformed path: {:?}", path)));
    }
    Ok(())
}

/// Parent path, or None for a top-level node.
fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) => None,
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn create(&self, path: &str, payload: Vec<u8>, mode: CreateMode) -> Result<()> {
        self.ensure_connected()?;
        validate_path(path)?;
        let mut tree = self.inner.tree.lock().unwrap();
        if tree.nodes.contains_key(path) {
            return Err(Error::NodeExists(path.to_string()));
        }
        if let Some(parent) = parent_of(path) {
            if !tree.nodes.contains_key(parent) {
                return Err(Error::NodeNotFound(parent.to_string()));
            }
        }
        let owner = match mode {
            CreateMode::Ephemeral => Some(self.id),
            CreateMode::Persistent => None,
        };
        tree.nodes.insert(
            path.to_string(),
            Node {
                payload,
                version: 0,
                owner,
            },
        );
        tree.emit(NodeEvent {
            path: path.to_string(),
            kind: NodeEventKind::Created,
        });
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<(Vec<u8>, Version)> {
        self.ensure_connected()?;
        let tree = self.inner.tree.lock().unwrap();
        let node = tree
            .nodes
            .get(path)
            .ok_or_else(|| Error::NodeNotFound(path.to_string()))?;
        Ok((node.payload.clone(), node.version))
    }

    async fn write(&self, path: &str, payload: Vec<u8>, expected: Version) -> Result<Version> {
        self.ensure_connected()?;
        let mut tree = self.inner.tree.lock().unwrap();
        let node = tree
            .nodes
            .get_mut(path)
            .ok_or_else(|| Error::NodeNotFound(path.to_string()))?;
        if node.version != expected {
            return Err(Error::VersionMismatch {
                path: path.to_string(),
                expected,
                actual: node.version,
            });
        }
        node.payload = payload;
        node.version += 1;
        let version = node.version;
        tree.emit(NodeEvent {
            path: path.to_string(),
            kind: NodeEventKind::DataChanged,
        });
        Ok(version)
    }

    async fn delete(&self, path: &str, expected: Version) -> Result<()> {
        self.ensure_connected()?;
        let mut tree = self.inner.tree.lock().unwrap();
        let node = tree
            .nodes
            .get(path)
            .ok_or_else(|| Error::NodeNotFound(path.to_string()))?;
        if node.version != expected {
            return Err(Error::VersionMismatch {
                path: path.to_string(),
                expected,
                actual: node.version,
            });
        }
        let child_prefix = format!("{}/", path);
        if tree.nodes.keys().any(|k| k.starts_with(&child_prefix)) {
            return Err(Error::Store(format!("node {} has children", path)));
        }
        tree.nodes.remove(path);
        tree.emit(NodeEvent {
            path: path.to_string(),
            kind: NodeEventKind::Deleted,
        });
        Ok(())
    }

    async fn children(&self, path: &str) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let tree = self.inner.tree.lock().unwrap();
        if !tree.nodes.contains_key(path) {
            return Err(Error::NodeNotFound(path.to_string()));
        }
        let prefix = format!("{}/", path);
        let mut names: Vec<String> = tree
            .nodes
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(|rest| rest.to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn watch(&self, path: &str) -> Result<mpsc::Receiver<NodeEvent>> {
        self.ensure_connected()?;
        validate_path(path)?;
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        self.inner.tree.lock().unwrap().watchers.push(Watcher {
            path: path.to_string(),
            tx,
        });
        Ok(rx)
    }

    fn state(&self) -> SessionState {
        *self.ctl.state.lock().unwrap()
    }

    async fn close(&self) -> Result<()> {
        {
            let mut state = self.ctl.state.lock().unwrap();
            if *state != SessionState::Connected && *state != SessionState::Connecting {
                return Ok(());
            }
            *state = SessionState::Closed;
        }
        self.inner.sessions.lock().unwrap().remove(&self.id);

        {
            let mut tree = self.inner.tree.lock().unwrap();
            let ephemerals: Vec<String> = tree
                .nodes
                .iter()
                .filter(|(_, node)| node.owner == Some(self.id))
                .map(|(path, _)| path.clone())
                .collect();
            for path in ephemerals {
                tree.nodes.remove(&path);
                tree.emit(NodeEvent {
                    path,
                    kind: NodeEventKind::Deleted,
                });
            }
        }

        let _ = self.ctl.events.send(SessionEvent::Closed).await;
        Ok(())
    }
}
