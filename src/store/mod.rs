//! The coordinated-store boundary.
//!
//! Everything cellname needs from the underlying store is expressed by
//! two traits: [`StoreConnector`] opens sessions and [`StoreSession`]
//! exposes versioned node operations, subtree watches and the session's
//! connection state. Connection-state transitions are delivered
//! asynchronously on the event channel handed to the connector; node
//! changes are delivered on per-watch channels.
//!
//! [`memory::MemoryStore`] is a complete in-process implementation used
//! by the tests and for embedding.

pub mod memory;

use crate::common::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Store-assigned revision token for a node. Every data write bumps it;
/// conditional writes and deletes must present the last observed value.
pub type Version = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Node survives the creating session.
    Persistent,
    /// Node is removed when the creating session closes or expires.
    Ephemeral,
}

/// Connection state of one session, as last reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    /// Session ended by the client.
    Closed,
    /// Session ended by the store (expiry, partition).
    Lost,
    /// Terminal; never retried.
    AuthFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Closed => write!(f, "closed"),
            SessionState::Lost => write!(f, "lost"),
            SessionState::AuthFailed => write!(f, "auth-failed"),
        }
    }
}

/// Asynchronous connection-state transition for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Closed,
    Lost,
    AuthFailed,
}

/// A change somewhere under a watched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    pub path: String,
    pub kind: NodeEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEventKind {
    Created,
    DataChanged,
    Deleted,
}

/// One live session against the coordinated store.
///
/// All node operations are round trips; they fail with a store error
/// when the session is not connected.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Create a node. The parent must already exist. Fails with
    /// `NodeExists` if the path is taken; exclusive creation is the
    /// primitive claims are built on.
    async fn create(&self, path: &str, payload: Vec<u8>, mode: CreateMode) -> Result<()>;

    /// Read a node's payload and current version.
    async fn read(&self, path: &str) -> Result<(Vec<u8>, Version)>;

    /// Conditionally overwrite a node's payload. Fails with
    /// `VersionMismatch` when `expected` is stale; returns the new
    /// version otherwise.
    async fn write(&self, path: &str, payload: Vec<u8>, expected: Version) -> Result<Version>;

    /// Conditionally delete a node.
    async fn delete(&self, path: &str, expected: Version) -> Result<()>;

    /// List the names (last path segment) of a node's children.
    async fn children(&self, path: &str) -> Result<Vec<String>>;

    /// Watch a path and everything below it. Events are delivered until
    /// the receiver is dropped or the session ends.
    async fn watch(&self, path: &str) -> Result<mpsc::Receiver<NodeEvent>>;

    /// Current connection state.
    fn state(&self) -> SessionState;

    /// End the session. Ephemeral nodes it owns are removed.
    async fn close(&self) -> Result<()>;
}

/// Opens sessions to the store. Connection-state events for each opened
/// session are delivered on the channel passed to `open`.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn open(&self, events: mpsc::Sender<SessionEvent>) -> Result<Arc<dyn StoreSession>>;
}
