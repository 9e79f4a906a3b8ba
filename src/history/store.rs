// SessionHistoryStore - bounded, persisted log of completed sessions
//
// Single owner of the history. Appends go to the back, eviction is FIFO
// from the front once the capacity is exceeded, and the only in-place
// mutation is adding analysis text for a language a session does not have
// yet. Every mutation is written through to the persistence collaborator;
// write failures are logged and reported but never roll back memory.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{log_history_error, HistoryError};
use crate::history::persistence::{HistoryPersistence, MemoryPersistence};
use crate::history::session::Session;

/// Orderings offered for history views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySort {
    DateAscending,
    DateDescending,
    SeverityAscending,
    SeverityDescending,
}

/// Outcome of appending a session
#[derive(Debug, Clone)]
pub struct AppendReceipt {
    /// The stored session with its assigned id
    pub session: Session,
    /// Sessions dropped from the front to respect the capacity
    pub evicted: Vec<Session>,
    /// Set when the in-memory append succeeded but the write-through failed
    pub persistence_error: Option<HistoryError>,
}

/// Outcome of caching analysis text
#[derive(Debug, Clone, PartialEq)]
pub struct CacheReceipt {
    /// False when the language already had text; the existing text is kept
    pub stored: bool,
    /// Set when the text was stored in memory but the write-through failed
    pub persistence_error: Option<HistoryError>,
}

struct HistoryInner {
    sessions: VecDeque<Session>,
    next_id: u64,
}

/// Owns the bounded session history
///
/// # Example
/// ```ignore
/// let store = SessionHistoryStore::open(10, Arc::new(JsonFilePersistence::new("history.json")));
/// let receipt = store.append(session)?;
/// store.cache_analysis(receipt.session.id(), "en", &text)?;
/// ```
pub struct SessionHistoryStore {
    inner: RwLock<HistoryInner>,
    capacity: usize,
    persistence: Arc<dyn HistoryPersistence>,
}

impl SessionHistoryStore {
    /// Load the persisted history, keeping at most `capacity` most recent
    /// sessions. A failed load is logged and yields an empty history.
    pub fn open(capacity: usize, persistence: Arc<dyn HistoryPersistence>) -> Self {
        assert!(capacity > 0, "history capacity must be positive");

        let loaded = persistence.load().unwrap_or_else(|err| {
            log_history_error(&err, "SessionHistoryStore::open");
            Vec::new()
        });

        let mut sessions: VecDeque<Session> = loaded.into();
        while sessions.len() > capacity {
            sessions.pop_front();
        }

        // Older files carry no ids; number them in stored order
        let mut next_id = sessions.iter().map(Session::id).max().unwrap_or(0) + 1;
        for session in sessions.iter_mut().filter(|s| s.id() == 0) {
            session.assign_id(next_id);
            next_id += 1;
        }

        log::info!(
            "[HistoryStore] Loaded {} session(s), capacity {}",
            sessions.len(),
            capacity
        );

        Self {
            inner: RwLock::new(HistoryInner { sessions, next_id }),
            capacity,
            persistence,
        }
    }

    /// History backed by process memory only
    pub fn in_memory(capacity: usize) -> Self {
        Self::open(capacity, Arc::new(MemoryPersistence::new()))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a completed session and evict the oldest beyond capacity.
    ///
    /// # Errors
    /// Only `HistoryError::StatePoisoned`; persistence failures are returned
    /// inside the receipt.
    pub fn append(&self, mut session: Session) -> Result<AppendReceipt, HistoryError> {
        let mut inner = self.write_inner()?;

        session.assign_id(inner.next_id);
        inner.next_id += 1;
        inner.sessions.push_back(session.clone());

        let mut evicted = Vec::new();
        while inner.sessions.len() > self.capacity {
            if let Some(oldest) = inner.sessions.pop_front() {
                evicted.push(oldest);
            }
        }

        log::info!(
            "[HistoryStore] Appended session {} (avg {:.1} dB, {}), {} stored, {} evicted",
            session.id(),
            session.average_threshold(),
            session.severity(),
            inner.sessions.len(),
            evicted.len()
        );

        let persistence_error = self.persist(&inner, "append").err();

        Ok(AppendReceipt {
            session,
            evicted,
            persistence_error,
        })
    }

    /// Store `text` under `language` for the given session unless that
    /// language already has text. Other languages are untouched.
    ///
    /// # Errors
    /// `HistoryError::SessionNotFound` if the session was evicted or never
    /// stored. Persistence failures are returned inside the receipt.
    pub fn cache_analysis(
        &self,
        session_id: u64,
        language: &str,
        text: &str,
    ) -> Result<CacheReceipt, HistoryError> {
        let mut inner = self.write_inner()?;

        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id() == session_id)
            .ok_or(HistoryError::SessionNotFound { session_id })?;

        if !session.insert_analysis(language, text) {
            log::debug!(
                "[HistoryStore] Analysis for session {} already cached in '{}'",
                session_id,
                language
            );
            return Ok(CacheReceipt {
                stored: false,
                persistence_error: None,
            });
        }

        log::info!(
            "[HistoryStore] Cached '{}' analysis for session {}",
            language,
            session_id
        );
        let persistence_error = self.persist(&inner, "cache_analysis").err();
        Ok(CacheReceipt {
            stored: true,
            persistence_error,
        })
    }

    /// [`cache_analysis`](Self::cache_analysis) against the most recent session
    pub fn cache_latest_analysis(
        &self,
        language: &str,
        text: &str,
    ) -> Result<CacheReceipt, HistoryError> {
        let latest_id = self
            .latest()?
            .map(|s| s.id())
            .ok_or(HistoryError::SessionNotFound { session_id: 0 })?;
        self.cache_analysis(latest_id, language, text)
    }

    /// Cached analysis text, or `None` if the session or language is absent
    pub fn lookup_analysis(
        &self,
        session_id: u64,
        language: &str,
    ) -> Result<Option<String>, HistoryError> {
        let inner = self.read_inner()?;
        Ok(inner
            .sessions
            .iter()
            .find(|s| s.id() == session_id)
            .and_then(|s| s.analysis(language))
            .map(str::to_string))
    }

    pub fn latest(&self) -> Result<Option<Session>, HistoryError> {
        Ok(self.read_inner()?.sessions.back().cloned())
    }

    pub fn get(&self, session_id: u64) -> Result<Option<Session>, HistoryError> {
        Ok(self
            .read_inner()?
            .sessions
            .iter()
            .find(|s| s.id() == session_id)
            .cloned())
    }

    pub fn contains(&self, session_id: u64) -> Result<bool, HistoryError> {
        Ok(self
            .read_inner()?
            .sessions
            .iter()
            .any(|s| s.id() == session_id))
    }

    /// Sessions in insertion order, oldest first
    pub fn sessions(&self) -> Result<Vec<Session>, HistoryError> {
        Ok(self.read_inner()?.sessions.iter().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        Ok(self.read_inner()?.sessions.len())
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.read_inner()?.sessions.is_empty())
    }

    /// Sorted copy of the history; stored order is unchanged. Ties keep
    /// insertion order.
    pub fn sorted(&self, order: HistorySort) -> Result<Vec<Session>, HistoryError> {
        let mut sessions = self.sessions()?;
        match order {
            HistorySort::DateAscending => sessions.sort_by_key(|s| s.timestamp_ms()),
            HistorySort::DateDescending => {
                sessions.sort_by(|a, b| b.timestamp_ms().cmp(&a.timestamp_ms()))
            }
            HistorySort::SeverityAscending => sessions.sort_by_key(|s| s.severity()),
            HistorySort::SeverityDescending => {
                sessions.sort_by(|a, b| b.severity().cmp(&a.severity()))
            }
        }
        Ok(sessions)
    }

    // ========================================================================
    // HELPER METHODS - Lock management and write-through
    // ========================================================================

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, HistoryInner>, HistoryError> {
        self.inner.read().map_err(|_| HistoryError::StatePoisoned)
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, HistoryInner>, HistoryError> {
        self.inner.write().map_err(|_| HistoryError::StatePoisoned)
    }

    fn persist(&self, inner: &HistoryInner, context: &str) -> Result<(), HistoryError> {
        let snapshot: Vec<Session> = inner.sessions.iter().cloned().collect();
        self.persistence
            .save(&snapshot)
            .inspect_err(|err| log_history_error(err, context))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
