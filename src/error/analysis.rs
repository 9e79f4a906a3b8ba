// Remote analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Error code range: 4001-4005
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Transport-level failure reaching the analysis service
    pub const NETWORK: i32 = 4001;

    /// Analysis service rejected the request for rate limiting
    pub const RATE_LIMITED: i32 = 4002;

    /// Analysis service reported an error
    pub const SERVER: i32 = 4003;

    /// Analysis service answered with an unusable payload
    pub const INVALID_RESPONSE: i32 = 4004;

    /// Reply arrived for a session that is no longer in the history
    pub const STALE: i32 = 4005;
}

/// Log an analysis error with structured context
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=AnalysisCoordinator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Failures of the remote text-analysis collaborator
///
/// None of these invalidate the stored session; it simply stays without
/// analysis text for the requested language.
///
/// Error code ranges: 4001-4005
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Network failure
    Network { details: String },

    /// Too many requests
    RateLimited,

    /// Server-side error with message
    Server { message: String },

    /// Response could not be decoded or was empty
    InvalidResponse,

    /// Session disappeared before the reply arrived
    Stale { session_id: u64 },
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::Network { .. } => AnalysisErrorCodes::NETWORK,
            AnalysisError::RateLimited => AnalysisErrorCodes::RATE_LIMITED,
            AnalysisError::Server { .. } => AnalysisErrorCodes::SERVER,
            AnalysisError::InvalidResponse => AnalysisErrorCodes::INVALID_RESPONSE,
            AnalysisError::Stale { .. } => AnalysisErrorCodes::STALE,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::Network { details } => format!("Network error: {}", details),
            AnalysisError::RateLimited => "Request rate limit exceeded".to_string(),
            AnalysisError::Server { message } => format!("Server error: {}", message),
            AnalysisError::InvalidResponse => "Invalid response".to_string(),
            AnalysisError::Stale { session_id } => {
                format!("Discarded analysis for session {} no longer in history", session_id)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}
