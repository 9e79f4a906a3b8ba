// Session - one completed test run
//
// A session is built exactly once from a full result set. Its results and
// derived classification never change afterwards; the only mutation is
// inserting analysis text for a language that has none yet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::audiometry::result::{HearingResult, ResultAggregator, SeverityLevel};

/// Completed test run with derived classification and cached analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredSession")]
pub struct Session {
    /// Store-assigned identity; 0 until appended
    id: u64,
    /// Completion time, milliseconds since the Unix epoch
    timestamp: u64,
    results: Vec<HearingResult>,
    average_threshold: f32,
    severity: SeverityLevel,
    analysis_by_language: BTreeMap<String, String>,
}

/// On-disk form. Classification is re-derived from `results` on load;
/// stored values are only compared against it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default)]
    id: u64,
    timestamp: u64,
    results: Vec<HearingResult>,
    #[serde(default)]
    average_threshold: Option<f32>,
    #[serde(default)]
    severity: Option<SeverityLevel>,
    #[serde(default)]
    analysis_by_language: BTreeMap<String, String>,
}

impl TryFrom<StoredSession> for Session {
    type Error = String;

    fn try_from(stored: StoredSession) -> Result<Self, Self::Error> {
        if stored.results.is_empty() {
            return Err(format!("session {} has no results", stored.id));
        }
        let mut session = Session::from_results(stored.results, stored.timestamp);
        session.id = stored.id;
        session.analysis_by_language = stored.analysis_by_language;

        let average_differs = stored
            .average_threshold
            .is_some_and(|avg| (avg - session.average_threshold).abs() > 1e-3);
        let severity_differs = stored.severity.is_some_and(|sev| sev != session.severity);
        if average_differs || severity_differs {
            log::warn!(
                "[Session] Stored classification {:?}/{:?} for session {} disagrees with results; using {:.1} dB/{}",
                stored.average_threshold,
                stored.severity,
                session.id,
                session.average_threshold,
                session.severity
            );
        }
        Ok(session)
    }
}

impl Session {
    /// Aggregate `results` into a new session.
    ///
    /// # Panics
    /// If `results` is empty.
    pub fn from_results(results: Vec<HearingResult>, timestamp_ms: u64) -> Self {
        let aggregate = ResultAggregator::aggregate(&results);
        Self {
            id: 0,
            timestamp: timestamp_ms,
            results,
            average_threshold: aggregate.average_threshold,
            severity: aggregate.severity,
            analysis_by_language: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp
    }

    pub fn results(&self) -> &[HearingResult] {
        &self.results
    }

    pub fn average_threshold(&self) -> f32 {
        self.average_threshold
    }

    pub fn severity(&self) -> SeverityLevel {
        self.severity
    }

    /// Cached analysis text for `language`
    pub fn analysis(&self, language: &str) -> Option<&str> {
        self.analysis_by_language.get(language).map(String::as_str)
    }

    /// Languages with cached analysis, sorted
    pub fn analysis_languages(&self) -> impl Iterator<Item = &str> {
        self.analysis_by_language.keys().map(String::as_str)
    }

    pub(crate) fn assign_id(&mut self, id: u64) {
        self.id = id;
    }

    /// Insert analysis text only if `language` has none. Returns whether
    /// the text was stored.
    pub(crate) fn insert_analysis(&mut self, language: &str, text: &str) -> bool {
        if self.analysis_by_language.contains_key(language) {
            return false;
        }
        self.analysis_by_language
            .insert(language.to_string(), text.to_string());
        true
    }
}
