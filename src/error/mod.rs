// Error types for the hearing test engine
//
// This module defines custom error types for tone synthesis, the test state
// machine, session history and the remote analysis collaborator. Every error
// carries a numeric code so front-ends can branch on it without string matching.

mod analysis;
mod audio;
mod history;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};
pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use history::{log_history_error, HistoryError, HistoryErrorCodes};
pub use test::{log_test_error, TestError, TestErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and its front-ends.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
