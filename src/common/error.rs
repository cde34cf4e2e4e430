//! Error types for cellname

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Coordinate errors ===
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Coordinate not found: {0}")]
    CoordinateNotFound(String),

    // === Claim errors ===
    #[error("Coordinate already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("Corrupt claim record at {path}: {reason}")]
    CorruptRecord { path: String, reason: String },

    #[error("Endpoint already exists: {0}")]
    EndpointExists(String),

    #[error("Endpoint does not exist: {0}")]
    EndpointDoesNotExist(String),

    // === Lifecycle errors ===
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Service handle is closed")]
    HandleClosed,

    // === Resolver errors ===
    #[error("Invalid resolver expression: {0}")]
    InvalidResolverExpression(String),

    // === Store errors ===
    #[error("Node already exists: {0}")]
    NodeExists(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Version mismatch on {path}: expected {expected}, actual {actual}")]
    VersionMismatch {
        path: String,
        expected: i64,
        actual: i64,
    },

    // === Connection errors ===
    #[error("Could not connect to storage: {0}")]
    CouldNotConnectToStorage(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // === Generic ===
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Is this a retryable error?
    ///
    /// Lifecycle misuse and version conflicts are never retryable; only
    /// transport-level trouble is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Store(_) | Error::CouldNotConnectToStorage(_))
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Store(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Store(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Store("connection reset".into()).is_retryable());
        assert!(Error::CouldNotConnectToStorage("timed out".into()).is_retryable());

        assert!(!Error::HandleClosed.is_retryable());
        assert!(!Error::AlreadyClaimed("1.s.u.c".into()).is_retryable());
        assert!(!Error::VersionMismatch {
            path: "/cn/c/u/s/1/status".into(),
            expected: 3,
            actual: 4,
        }
        .is_retryable());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::CoordinateNotFound("42.service.user.cell".into());
        assert!(err.to_string().contains("42.service.user.cell"));

        let err = Error::VersionMismatch {
            path: "/cn/c/u/s/1/status".into(),
            expected: 1,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("/cn/c/u/s/1/status"));
        assert!(msg.contains("expected 1"));
    }
}
