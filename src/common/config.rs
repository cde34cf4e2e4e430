//! Configuration for the cellname client

use serde::{Deserialize, Serialize};

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connect string for the coordinated store, e.g. "z1:2181,z2:2181,z3:2181"
    pub connect_string: String,

    /// Namespace root under which all coordinates live
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Session timeout handed to the store client
    #[serde(default = "default_session_timeout")]
    pub session_timeout_ms: u64,

    /// Bounded deadline used when recovering a lost session
    #[serde(default = "default_reconnect_deadline")]
    pub reconnect_deadline_ms: u64,
}

fn default_root_path() -> String {
    "/cn".to_string()
}

fn default_session_timeout() -> u64 {
    5000
}

fn default_reconnect_deadline() -> u64 {
    600_000
}

impl Config {
    pub fn new(connect_string: impl Into<String>) -> Self {
        Self {
            connect_string: connect_string.into(),
            root_path: default_root_path(),
            session_timeout_ms: default_session_timeout(),
            reconnect_deadline_ms: default_reconnect_deadline(),
        }
    }
}
