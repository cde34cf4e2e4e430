//! The naming model: coordinates, their store paths, and the status and
//! endpoint types published under them.

pub mod coordinate;
pub mod path;
pub mod status;

pub use coordinate::Coordinate;
pub use path::PathCodec;
pub use status::{Endpoint, ServiceState, ServiceStatus};
