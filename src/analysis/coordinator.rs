// AnalysisCoordinator - cache-aware requests to the analysis service
//
// Cached text always wins. A reply is only written back if its session is
// still in the history when the reply lands; replies for evicted sessions
// are discarded as stale. A cache write happens before the coordinator
// returns, so a following lookup for the same pair sees it.

use std::sync::Arc;

use crate::analysis::prompt::format_prompt;
use crate::analysis::AnalysisClient;
use crate::error::{log_analysis_error, log_history_error, AnalysisError, HistoryError};
use crate::history::SessionHistoryStore;

/// Analysis text for one session and language
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub session_id: u64,
    pub language: String,
    pub text: String,
    /// Served from the session's cache without calling the service
    pub from_cache: bool,
    /// Set when a fresh reply was cached in memory but not persisted
    pub persistence_error: Option<HistoryError>,
}

pub struct AnalysisCoordinator {
    client: Arc<dyn AnalysisClient>,
    history: Arc<SessionHistoryStore>,
}

impl AnalysisCoordinator {
    pub fn new(client: Arc<dyn AnalysisClient>, history: Arc<SessionHistoryStore>) -> Self {
        Self { client, history }
    }

    /// Analysis of a stored session in `language`.
    ///
    /// # Errors
    /// * `AnalysisError::Stale` - Session not (or no longer) in the history
    /// * Any error reported by the service; the session stays saved without
    ///   text for this language
    pub async fn analyze(
        &self,
        session_id: u64,
        language: &str,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let session = match self.history.get(session_id) {
            Ok(Some(session)) => session,
            Ok(None) => return Err(self.stale(session_id, "AnalysisCoordinator::analyze")),
            Err(err) => {
                log_history_error(&err, "AnalysisCoordinator::analyze");
                return Err(self.stale(session_id, "AnalysisCoordinator::analyze"));
            }
        };

        if let Some(text) = session.analysis(language) {
            log::debug!(
                "[AnalysisCoordinator] Cache hit for session {} in '{}'",
                session_id,
                language
            );
            return Ok(AnalysisOutcome {
                session_id,
                language: language.to_string(),
                text: text.to_string(),
                from_cache: true,
                persistence_error: None,
            });
        }

        log::info!(
            "[AnalysisCoordinator] Requesting '{}' analysis for session {}",
            language,
            session_id
        );
        let prompt = format_prompt(&session, language);
        let text = self
            .client
            .analyze(prompt, language.to_string())
            .await
            .inspect_err(|err| log_analysis_error(err, "AnalysisCoordinator::analyze"))?;

        if text.trim().is_empty() {
            let err = AnalysisError::InvalidResponse;
            log_analysis_error(&err, "AnalysisCoordinator::analyze");
            return Err(err);
        }

        self.store_reply(session_id, language, text)
    }

    /// [`analyze`](Self::analyze) for the most recent session
    pub async fn analyze_latest(&self, language: &str) -> Result<AnalysisOutcome, AnalysisError> {
        let latest = self
            .history
            .latest()
            .inspect_err(|err| log_history_error(err, "AnalysisCoordinator::analyze_latest"))
            .ok()
            .flatten()
            .ok_or_else(|| self.stale(0, "AnalysisCoordinator::analyze_latest"))?;
        self.analyze(latest.id(), language).await
    }

    fn store_reply(
        &self,
        session_id: u64,
        language: &str,
        text: String,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let outcome = |text: String,
                       from_cache: bool,
                       persistence_error: Option<HistoryError>| AnalysisOutcome {
            session_id,
            language: language.to_string(),
            text,
            from_cache,
            persistence_error,
        };

        match self.history.cache_analysis(session_id, language, &text) {
            Ok(receipt) if receipt.stored => {
                if receipt.persistence_error.is_some() {
                    log::warn!(
                        "[AnalysisCoordinator] '{}' analysis for session {} kept in memory only",
                        language,
                        session_id
                    );
                }
                Ok(outcome(text, false, receipt.persistence_error))
            }
            // Another request cached this language first; keep its text
            Ok(_) => match self.history.lookup_analysis(session_id, language) {
                Ok(Some(existing)) => Ok(outcome(existing, true, None)),
                _ => Ok(outcome(text, false, None)),
            },
            Err(HistoryError::SessionNotFound { .. }) => {
                log::info!(
                    "[AnalysisCoordinator] Discarding reply for evicted session {}",
                    session_id
                );
                Err(AnalysisError::Stale { session_id })
            }
            Err(err) => {
                log_history_error(&err, "AnalysisCoordinator::store_reply");
                Ok(outcome(text, false, Some(err)))
            }
        }
    }

    fn stale(&self, session_id: u64, context: &str) -> AnalysisError {
        let err = AnalysisError::Stale { session_id };
        log_analysis_error(&err, context);
        err
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
