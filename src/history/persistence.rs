//! Persistence collaborators for the session history.
//!
//! The store only relies on "load returns what save wrote". Failures are
//! reported as [`HistoryError`] and treated as non-fatal by the store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::HistoryError;
use crate::history::session::Session;

/// Durable slot holding the serialized session sequence
pub trait HistoryPersistence: Send + Sync {
    /// Load the stored sequence; an empty slot yields an empty list
    fn load(&self) -> Result<Vec<Session>, HistoryError>;

    /// Replace the stored sequence
    fn save(&self, sessions: &[Session]) -> Result<(), HistoryError>;
}

/// JSON array stored in a single file.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous history intact.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Vec<Session>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, sessions: &[Session]) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(sessions)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process slot; serializes like the file backend so tests exercise the
/// same encoding. Saves can be made to fail on demand.
#[derive(Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<String>>,
    fail_saves: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Raw JSON currently stored
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl HistoryPersistence for MemoryPersistence {
    fn load(&self) -> Result<Vec<Session>, HistoryError> {
        let slot = self.slot.lock().map_err(|_| HistoryError::StatePoisoned)?;
        match slot.as_deref() {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, sessions: &[Session]) -> Result<(), HistoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(HistoryError::PersistenceFailure {
                reason: "simulated write failure".to_string(),
            });
        }
        let json = serde_json::to_string(sessions)?;
        let mut slot = self.slot.lock().map_err(|_| HistoryError::StatePoisoned)?;
        *slot = Some(json);
        Ok(())
    }
}
