// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Tone frequency is not a positive finite value
    pub const INVALID_FREQUENCY: i32 = 1001;

    /// Sample rate is zero
    pub const INVALID_SAMPLE_RATE: i32 = 1002;

    /// Tone duration is not a positive finite value
    pub const INVALID_DURATION: i32 = 1003;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1004;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1005;

    /// Writing a tone buffer to disk failed
    pub const WAV_EXPORT_FAILED: i32 = 1006;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component={}, message={}",
        context,
        err.code(),
        err.component(),
        err.message()
    );
}

/// Audio-related errors
///
/// The first three variants are contract violations at the synthesis
/// boundary; the rest come from the playback device or the file system.
///
/// Error code ranges: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Frequency must be > 0 Hz
    InvalidFrequency { frequency_hz: f32 },

    /// Sample rate must be > 0 Hz
    InvalidSampleRate { sample_rate: u32 },

    /// Duration must be > 0 seconds
    InvalidDuration { duration_seconds: f32 },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Failed to write a WAV file
    WavExportFailed { reason: String },
}

impl AudioError {
    /// Subsystem that raised the error, for log lines
    pub fn component(&self) -> &'static str {
        match self {
            AudioError::InvalidFrequency { .. }
            | AudioError::InvalidSampleRate { .. }
            | AudioError::InvalidDuration { .. } => "ToneSynthesizer",
            AudioError::StreamOpenFailed { .. } | AudioError::HardwareError { .. } => "ToneOutput",
            AudioError::WavExportFailed { .. } => "WavExport",
        }
    }
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::InvalidFrequency { .. } => AudioErrorCodes::INVALID_FREQUENCY,
            AudioError::InvalidSampleRate { .. } => AudioErrorCodes::INVALID_SAMPLE_RATE,
            AudioError::InvalidDuration { .. } => AudioErrorCodes::INVALID_DURATION,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::WavExportFailed { .. } => AudioErrorCodes::WAV_EXPORT_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::InvalidFrequency { frequency_hz } => {
                format!("Frequency must be greater than 0 Hz (got {})", frequency_hz)
            }
            AudioError::InvalidSampleRate { sample_rate } => {
                format!("Sample rate must be greater than 0 Hz (got {})", sample_rate)
            }
            AudioError::InvalidDuration { duration_seconds } => {
                format!(
                    "Duration must be greater than 0 seconds (got {})",
                    duration_seconds
                )
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::WavExportFailed { reason } => {
                format!("Failed to export WAV: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

/// Convert from hound::Error to AudioError
impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::WavExportFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::InvalidFrequency { frequency_hz: 0.0 }.code(),
            AudioErrorCodes::INVALID_FREQUENCY
        );
        assert_eq!(
            AudioError::InvalidSampleRate { sample_rate: 0 }.code(),
            AudioErrorCodes::INVALID_SAMPLE_RATE
        );
        assert_eq!(
            AudioError::InvalidDuration {
                duration_seconds: -1.0
            }
            .code(),
            AudioErrorCodes::INVALID_DURATION
        );
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            AudioErrorCodes::HARDWARE_ERROR
        );
        assert_eq!(
            AudioError::WavExportFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::WAV_EXPORT_FAILED
        );
    }

    #[test]
    fn test_audio_error_component_follows_variant() {
        assert_eq!(
            AudioError::InvalidFrequency { frequency_hz: 0.0 }.component(),
            "ToneSynthesizer"
        );
        assert_eq!(
            AudioError::InvalidDuration {
                duration_seconds: 0.0
            }
            .component(),
            "ToneSynthesizer"
        );
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .component(),
            "ToneOutput"
        );
        assert_eq!(
            AudioError::WavExportFailed {
                reason: "test".to_string()
            }
            .component(),
            "WavExport"
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::InvalidFrequency { frequency_hz: -5.0 };
        assert_eq!(err.message(), "Frequency must be greater than 0 Hz (got -5)");

        let err = AudioError::InvalidSampleRate { sample_rate: 0 };
        assert!(err.message().contains("Sample rate"));

        let err = AudioError::StreamOpenFailed {
            reason: "no device".to_string(),
        };
        assert_eq!(err.message(), "Failed to open audio stream: no device");
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::InvalidSampleRate { sample_rate: 0 };
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains("1002"));
    }
}
