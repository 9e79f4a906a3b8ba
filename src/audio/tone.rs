//! Tone synthesis - pure-tone PCM buffers for looped playback
//!
//! Buffers are regenerated on every loudness step because the output device
//! loops raw samples without live gain control. Key properties:
//! - Pure functions (no I/O, deterministic output)
//! - Loudness mapped to linear gain relative to a fixed reference level
//! - Invalid input rejected at the boundary, never clamped

use std::f64::consts::PI;

use crate::config::ToneConfig;
use crate::error::AudioError;

/// Converts an engine loudness value (dB) to a linear amplitude.
///
/// `amplitude = 10 ^ ((loudness - reference) / 20)`. With the default
/// 100 dB reference every loudness in `[0, 90]` maps into `(0, 1]`:
/// 90 dB gives ~0.316, 0 dB gives 1e-5.
///
/// # Examples
/// ```
/// use hearing_test::audio::tone::amplitude_for_loudness;
/// let amp = amplitude_for_loudness(80.0, 100.0);
/// assert!((amp - 0.1).abs() < 1e-6);
/// ```
#[inline]
pub fn amplitude_for_loudness(loudness_db: f32, reference_db: f32) -> f32 {
    10f32.powf((loudness_db - reference_db) / 20.0)
}

/// Single-channel PCM buffer holding one synthesized tone
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub frequency_hz: f32,
    pub loudness_db: f32,
}

impl ToneBuffer {
    /// Buffer length in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Generates sine buffers at a fixed sample rate and duration
#[derive(Debug, Clone)]
pub struct ToneSynthesizer {
    sample_rate: u32,
    duration_seconds: f32,
    reference_db: f32,
}

impl ToneSynthesizer {
    /// Create a synthesizer, validating rate and duration up front
    pub fn new(sample_rate: u32, duration_seconds: f32, reference_db: f32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate { sample_rate });
        }
        if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
            return Err(AudioError::InvalidDuration { duration_seconds });
        }
        Ok(Self {
            sample_rate,
            duration_seconds,
            reference_db,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &ToneConfig) -> Result<Self, AudioError> {
        Self::new(config.sample_rate, config.duration_seconds, config.reference_db)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples in every buffer this synthesizer produces
    pub fn frame_count(&self) -> usize {
        (self.sample_rate as f64 * self.duration_seconds as f64) as usize
    }

    /// Synthesize one buffer: `sample[n] = sin(2π·f·n/sr) · amplitude(loudness)`
    ///
    /// # Errors
    /// `AudioError::InvalidFrequency` if `frequency_hz` is not a positive
    /// finite value.
    pub fn synthesize(&self, frequency_hz: f32, loudness_db: f32) -> Result<ToneBuffer, AudioError> {
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(AudioError::InvalidFrequency { frequency_hz });
        }

        let amplitude = amplitude_for_loudness(loudness_db, self.reference_db) as f64;
        let frame_count = self.frame_count();
        let phase_step = 2.0 * PI * frequency_hz as f64 / self.sample_rate as f64;

        let samples = (0..frame_count)
            .map(|n| ((phase_step * n as f64).sin() * amplitude) as f32)
            .collect();

        Ok(ToneBuffer {
            samples,
            sample_rate: self.sample_rate,
            frequency_hz,
            loudness_db,
        })
    }
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        let config = ToneConfig::default();
        Self {
            sample_rate: config.sample_rate,
            duration_seconds: config.duration_seconds,
            reference_db: config.reference_db,
        }
    }
}
