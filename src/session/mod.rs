//! Session ownership and recovery for the coordinated store.
//!
//! One long-lived session per process, shared by every claim and
//! resolve operation. The [`SessionManager`] opens it; components hold a
//! [`SessionKeeper`], which always dereferences to the latest session
//! even after a reconnect.

mod keeper;
mod manager;

pub use keeper::SessionKeeper;
pub use manager::SessionManager;
