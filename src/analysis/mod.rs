// Analysis module - remote text analysis of completed sessions
//
// The text-analysis service itself lives outside this crate and is reached
// through the AnalysisClient trait. This module formats the request and
// keeps the per-language cache on each stored session coherent with late
// or failed replies.

use futures::future::BoxFuture;

use crate::error::AnalysisError;

pub mod coordinator;
pub mod prompt;

pub use coordinator::{AnalysisCoordinator, AnalysisOutcome};
pub use prompt::{format_prompt, severity_label};

/// Remote service that turns a formatted summary into prose.
///
/// One atomic request: the reply is either the full text or an error.
pub trait AnalysisClient: Send + Sync {
    fn analyze(
        &self,
        prompt: String,
        language: String,
    ) -> BoxFuture<'static, Result<String, AnalysisError>>;
}
