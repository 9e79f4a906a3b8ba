// Observable test state and the events reported on every change

use serde::{Deserialize, Serialize};

use crate::audiometry::result::HearingResult;
use crate::history::Session;

/// Lifecycle state of a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    Idle,
    Running,
    /// Operator pause; ticking and playback suspended, progress kept
    Paused,
    /// Ceiling reached without a response; waiting for retry or skip
    Inconclusive,
    Completed,
}

impl TestState {
    /// Whether a tone is expected to be audible
    pub fn is_playing(&self) -> bool {
        matches!(self, TestState::Running)
    }
}

/// Change reported by the state machine, in the order it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TestEvent {
    Started {
        frequencies_hz: Vec<u32>,
    },
    FrequencyStarted {
        index: usize,
        frequency_hz: u32,
    },
    LoudnessChanged {
        frequency_hz: u32,
        loudness_db: f32,
    },
    ResultRecorded {
        result: HearingResult,
        /// Recorded by the operator skipping an inconclusive frequency
        skipped: bool,
    },
    MaxLoudnessReached {
        frequency_hz: u32,
        loudness_db: f32,
    },
    Paused {
        loudness_db: f32,
    },
    Resumed {
        loudness_db: f32,
    },
    Completed {
        session: Session,
    },
    /// Session completed but could not be written to durable storage
    HistoryNotSaved {
        code: i32,
        message: String,
    },
    PlaybackFailed {
        code: i32,
        message: String,
    },
    Reset,
}

/// Point-in-time view of a test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSnapshot {
    pub state: TestState,
    pub frequency_index: usize,
    /// `None` once every frequency has a result
    pub frequency_hz: Option<u32>,
    pub loudness_db: f32,
    /// Ramp position of the current frequency in `[0, 1]`
    pub progress: f32,
    pub total_frequencies: usize,
    pub results: Vec<HearingResult>,
}
