// Audio module - tone synthesis and playback collaborators

pub mod output;
#[cfg(not(target_os = "android"))]
pub mod output_cpal;
pub mod tone;
pub mod wav;

// Re-export commonly used types for convenience
pub use output::{OutputCall, RecordingOutput, SilentOutput, ToneOutput};
#[cfg(not(target_os = "android"))]
pub use output_cpal::CpalToneOutput;
pub use tone::{amplitude_for_loudness, ToneBuffer, ToneSynthesizer};
pub use wav::write_tone_wav;
