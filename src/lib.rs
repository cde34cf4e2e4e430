//! # cellname
//!
//! A naming and coordination layer on top of a strongly-consistent
//! hierarchical store:
//! - claim a unique coordinate (one instance of one service owned by
//!   one user in one cell)
//! - publish a machine-readable status and named network endpoints
//!   under the claim
//! - resolve coordinate patterns to endpoints with pluggable matching
//!   strategies
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                  Cellname                      │
//! │  claim() / status() / resolver() / connect()   │
//! └──────┬───────────────┬───────────────┬─────────┘
//!        │               │               │
//! ┌──────▼──────┐ ┌──────▼───────┐ ┌─────▼────────┐
//! │ ClaimState  │ │  Resolver    │ │ SessionMgr   │
//! │ + Service   │ │  (All/Any)   │ │ + Keeper     │
//! │   Handle    │ │              │ │ (reconnect)  │
//! └──────┬──────┘ └──────┬───────┘ └─────┬────────┘
//!        └───────────────┴───────────────┘
//!                        │
//!              ┌─────────▼──────────┐
//!              │  StoreSession      │
//!              │  (versioned nodes, │
//!              │   watches, events) │
//!              └────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use cellname::{Cellname, Config, Coordinate, Endpoint, ServiceState, ServiceStatus};
//! use cellname::store::memory::MemoryStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> cellname::Result<()> {
//! let store = MemoryStore::new();
//! let cn = Cellname::new(Config::new("z1:2181"), Arc::new(store));
//! cn.connect_with_timeout(Duration::from_secs(5)).await?;
//!
//! let coordinate = Coordinate::new(1, "search", "ops", "dc1")?;
//! cn.create_coordinate(&coordinate).await?;
//!
//! let mut handle = cn.claim(coordinate).await?;
//! handle.put_endpoint(Endpoint::new("http", "node1", 8080, "http")).await?;
//! handle.set_status(ServiceStatus::new(ServiceState::Running, "serving")).await?;
//!
//! let hits = cn.resolver().resolve("http.any.search.ops.dc1").await?;
//! # Ok(())
//! # }
//! ```

pub mod claim;
pub mod client;
pub mod common;
pub mod naming;
pub mod resolver;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use claim::{ConfigEvent, ConfigEventKind, ConfigListener, ServiceHandle};
pub use client::Cellname;
pub use common::{Config, Error, Result};
pub use naming::{Coordinate, Endpoint, ServiceState, ServiceStatus};
pub use resolver::{ResolvedEndpoint, Resolver, Strategy};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
