// History store error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// History error code constants
///
/// Error code range: 3001-3004
pub struct HistoryErrorCodes {}

impl HistoryErrorCodes {
    /// Reading or writing the persisted history failed
    pub const PERSISTENCE_FAILURE: i32 = 3001;

    /// Persisted history could not be encoded or decoded
    pub const SERIALIZATION: i32 = 3002;

    /// Requested session is not in the history
    pub const SESSION_NOT_FOUND: i32 = 3003;

    /// History store lock was poisoned
    pub const STATE_POISONED: i32 = 3004;
}

/// Log a history error with structured context
///
/// Persistence failures are non-fatal: callers log them here and keep the
/// in-memory history.
pub fn log_history_error(err: &HistoryError, context: &str) {
    error!(
        "History error in {}: code={}, component=SessionHistoryStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session history errors
///
/// Error code ranges: 3001-3004
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// Storage read/write failed
    PersistenceFailure { reason: String },

    /// JSON encoding or decoding failed
    Serialization { reason: String },

    /// No session with the given id
    SessionNotFound { session_id: u64 },

    /// History store lock was poisoned
    StatePoisoned,
}

impl ErrorCode for HistoryError {
    fn code(&self) -> i32 {
        match self {
            HistoryError::PersistenceFailure { .. } => HistoryErrorCodes::PERSISTENCE_FAILURE,
            HistoryError::Serialization { .. } => HistoryErrorCodes::SERIALIZATION,
            HistoryError::SessionNotFound { .. } => HistoryErrorCodes::SESSION_NOT_FOUND,
            HistoryError::StatePoisoned => HistoryErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            HistoryError::PersistenceFailure { reason } => {
                format!("History persistence failed: {}", reason)
            }
            HistoryError::Serialization { reason } => {
                format!("History serialization failed: {}", reason)
            }
            HistoryError::SessionNotFound { session_id } => {
                format!("Session {} not found in history", session_id)
            }
            HistoryError::StatePoisoned => "History store lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HistoryError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for HistoryError {}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        HistoryError::PersistenceFailure {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_error_codes() {
        assert_eq!(
            HistoryError::PersistenceFailure {
                reason: "disk full".to_string()
            }
            .code(),
            3001
        );
        assert_eq!(
            HistoryError::Serialization {
                reason: "bad json".to_string()
            }
            .code(),
            3002
        );
        assert_eq!(HistoryError::SessionNotFound { session_id: 7 }.code(), 3003);
        assert_eq!(HistoryError::StatePoisoned.code(), 3004);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: HistoryError = io.into();
        assert!(matches!(err, HistoryError::PersistenceFailure { .. }));
        assert!(err.message().contains("denied"));
    }
}
