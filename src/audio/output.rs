//! Audio output collaborator abstraction.
//!
//! The engine hands every freshly synthesized buffer to a [`ToneOutput`] and
//! never waits for playback. Implementations loop the most recent buffer
//! until told to stop or given a replacement.

use std::sync::{Arc, Mutex};

use crate::audio::tone::ToneBuffer;
use crate::error::AudioError;

/// Trait implemented by playback backends.
pub trait ToneOutput: Send {
    /// Begin looping `buffer`, replacing whatever was playing.
    fn play_looped(&mut self, buffer: Arc<ToneBuffer>) -> Result<(), AudioError>;

    /// Stop playback. Stopping an idle output is not an error.
    fn stop(&mut self) -> Result<(), AudioError>;
}

/// Output that discards everything; used for headless runs.
#[derive(Debug, Default)]
pub struct SilentOutput {
    _unit: (),
}

impl ToneOutput for SilentOutput {
    fn play_looped(&mut self, _buffer: Arc<ToneBuffer>) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// One call observed by a [`RecordingOutput`].
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Play { frequency_hz: f32, loudness_db: f32 },
    Stop,
}

/// Output that records calls for assertions in tests and fixtures.
///
/// Clones share the same log, so a test can keep one handle while the
/// engine owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    calls: Arc<Mutex<Vec<OutputCall>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Loudness values of every played buffer, in order
    pub fn played_loudness(&self) -> Vec<f32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OutputCall::Play { loudness_db, .. } => Some(loudness_db),
                OutputCall::Stop => None,
            })
            .collect()
    }

    /// Whether the last call left the output playing
    pub fn is_playing(&self) -> bool {
        matches!(self.calls().last(), Some(OutputCall::Play { .. }))
    }

    fn push(&self, call: OutputCall) -> Result<(), AudioError> {
        let mut calls = self.calls.lock().map_err(|_| AudioError::HardwareError {
            details: "recording output lock poisoned".to_string(),
        })?;
        calls.push(call);
        Ok(())
    }
}

impl ToneOutput for RecordingOutput {
    fn play_looped(&mut self, buffer: Arc<ToneBuffer>) -> Result<(), AudioError> {
        self.push(OutputCall::Play {
            frequency_hz: buffer.frequency_hz,
            loudness_db: buffer.loudness_db,
        })
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.push(OutputCall::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tone::ToneSynthesizer;

    #[test]
    fn test_recording_output_tracks_calls() {
        let recorder = RecordingOutput::new();
        let mut output: Box<dyn ToneOutput> = Box::new(recorder.clone());
        let synth = ToneSynthesizer::default();

        output
            .play_looped(Arc::new(synth.synthesize(500.0, 0.0).unwrap()))
            .unwrap();
        output
            .play_looped(Arc::new(synth.synthesize(500.0, 2.0).unwrap()))
            .unwrap();
        assert!(recorder.is_playing());

        output.stop().unwrap();
        assert!(!recorder.is_playing());
        assert_eq!(recorder.played_loudness(), vec![0.0, 2.0]);
        assert_eq!(recorder.calls().len(), 3);
    }

    #[test]
    fn test_silent_output_accepts_everything() {
        let mut output = SilentOutput::default();
        let synth = ToneSynthesizer::default();
        assert!(output
            .play_looped(Arc::new(synth.synthesize(8000.0, 90.0).unwrap()))
            .is_ok());
        assert!(output.stop().is_ok());
        assert!(output.stop().is_ok());
    }
}
