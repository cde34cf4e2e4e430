//! Claim ownership: the record codec, the per-coordinate lifecycle and
//! the service handle built on top of it.

pub mod handle;
pub(crate) mod record;
pub mod state;

pub use handle::{ConfigEvent, ConfigEventKind, ConfigListener, ServiceHandle};
pub use state::ClaimState;
