//! Configuration management for the hearing test engine
//!
//! This module provides runtime configuration loading from JSON files.
//! The defaults reproduce the standard screening protocol: six octave-spaced
//! frequencies, a 0-90 dB ramp in 2 dB steps every 500 ms, 1 s tone buffers
//! at 44.1 kHz and a ten-session history.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Test frequencies in presentation order (Hz)
pub const DEFAULT_FREQUENCIES_HZ: [u32; 6] = [250, 500, 1000, 2000, 4000, 8000];

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub test: TestConfig,
    #[serde(default)]
    pub tone: ToneConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Staircase and frequency progression parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Ordered frequency list; order defines test progression
    pub frequencies_hz: Vec<u32>,
    /// Loudness each frequency starts from (dB)
    pub min_loudness_db: f32,
    /// Ceiling loudness; reaching it without a response is a timeout (dB)
    pub max_loudness_db: f32,
    /// Loudness increment per tick (dB)
    pub step_db: f32,
    /// Interval between ticks (ms)
    pub tick_interval_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            frequencies_hz: DEFAULT_FREQUENCIES_HZ.to_vec(),
            min_loudness_db: 0.0,
            max_loudness_db: 90.0,
            step_db: 2.0,
            tick_interval_ms: 500,
        }
    }
}

/// Tone synthesis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    /// Output sample rate (Hz)
    pub sample_rate: u32,
    /// Length of each looped buffer (seconds)
    pub duration_seconds: f32,
    /// dB value mapped to unity gain
    pub reference_db: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            duration_seconds: 1.0,
            reference_db: 100.0,
        }
    }
}

/// Session history parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of sessions retained
    pub capacity: usize,
    /// JSON file used as the persistence slot
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            path: PathBuf::from("hearing_history.json"),
        }
    }
}

/// Remote analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Language code used when the caller does not specify one
    pub default_language: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration. A missing, malformed or invalid file is
    /// logged and replaced by the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                        config
                    }
                    Err(reason) => {
                        log::warn!(
                            "[Config] Invalid configuration in {:?}: {}. Using defaults.",
                            path.as_ref(),
                            reason
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the conventional location
    pub fn load() -> Self {
        Self::load_from_file("assets/hearing_config.json")
    }

    /// Check the invariants the engine relies on
    pub fn validate(&self) -> Result<(), String> {
        let test = &self.test;
        if test.frequencies_hz.is_empty() {
            return Err("frequency list is empty".to_string());
        }
        if let Some(bad) = test.frequencies_hz.iter().find(|&&hz| hz == 0) {
            return Err(format!("frequency {} Hz is not positive", bad));
        }
        if !(test.step_db > 0.0) {
            return Err(format!("step_db must be positive (got {})", test.step_db));
        }
        if !(test.max_loudness_db >= test.min_loudness_db) {
            return Err(format!(
                "max_loudness_db {} is below min_loudness_db {}",
                test.max_loudness_db, test.min_loudness_db
            ));
        }
        if test.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be positive".to_string());
        }
        if self.tone.sample_rate == 0 {
            return Err("sample_rate must be positive".to_string());
        }
        if !(self.tone.duration_seconds > 0.0) {
            return Err("duration_seconds must be positive".to_string());
        }
        if self.history.capacity == 0 {
            return Err("history capacity must be positive".to_string());
        }
        Ok(())
    }
}
