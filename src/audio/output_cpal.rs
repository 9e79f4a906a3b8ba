//! CPAL-based tone output for desktop platforms (Linux, macOS, Windows)
//!
//! The cpal stream lives on a dedicated thread because streams are not `Send`
//! on every host. Buffers reach the output callback through a lock-free SPSC
//! queue; replaced buffers travel back through a second queue so the audio
//! thread never frees memory.
//!
//! Buffer flow:
//! 1. Engine pushes `ToneCommand::Play(buffer)` to the command queue
//! 2. Output callback swaps it in and loops it sample by sample
//! 3. Callback pushes the replaced buffer to the retired queue
//! 4. Engine drains and drops retired buffers on its next call

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::audio::output::ToneOutput;
use crate::audio::tone::ToneBuffer;
use crate::error::{log_audio_error, AudioError};

/// Pending commands the callback can lag behind by
const COMMAND_QUEUE_CAPACITY: usize = 16;

enum ToneCommand {
    Play(Arc<ToneBuffer>),
    Stop,
}

/// Loops the latest tone buffer on the default output device.
pub struct CpalToneOutput {
    commands: Producer<ToneCommand>,
    retired: Consumer<Arc<ToneBuffer>>,
    shutdown: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalToneOutput {
    /// Open the default output device and start a silent stream.
    pub fn new() -> Result<Self, AudioError> {
        let (commands, command_rx) = RingBuffer::<ToneCommand>::new(COMMAND_QUEUE_CAPACITY);
        let (retired_tx, retired) = RingBuffer::<Arc<ToneBuffer>>::new(COMMAND_QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("tone-output".to_string())
            .spawn(move || {
                let stream = match open_output_stream(command_rx, retired_tx) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::HardwareError {
                        details: format!("Output start failed: {}", e),
                    }));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Park until the owner is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| AudioError::HardwareError {
                details: format!("Failed to spawn output thread: {}", e),
            })?;

        ready_rx
            .recv()
            .map_err(|_| AudioError::HardwareError {
                details: "Output thread exited during startup".to_string(),
            })?
            .inspect_err(|err| log_audio_error(err, "CpalToneOutput::new"))?;

        log::info!("[CpalToneOutput] Output stream running");

        Ok(Self {
            commands,
            retired,
            shutdown: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    fn send(&mut self, command: ToneCommand) -> Result<(), AudioError> {
        while let Ok(buffer) = self.retired.pop() {
            drop(buffer);
        }
        self.commands
            .push(command)
            .map_err(|_| AudioError::HardwareError {
                details: "Tone command queue full".to_string(),
            })
    }
}

impl ToneOutput for CpalToneOutput {
    fn play_looped(&mut self, buffer: Arc<ToneBuffer>) -> Result<(), AudioError> {
        self.send(ToneCommand::Play(buffer))
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.send(ToneCommand::Stop)
    }
}

impl Drop for CpalToneOutput {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Callback-side playback state. Never allocates or frees.
struct LoopPlayer {
    current: Option<Arc<ToneBuffer>>,
    position: f64,
    step: f64,
    device_rate: f64,
}

impl LoopPlayer {
    fn new(device_rate: f64) -> Self {
        Self {
            current: None,
            position: 0.0,
            step: 1.0,
            device_rate,
        }
    }

    /// Apply queued commands. A command that would retire the current
    /// buffer waits in the queue while the retired queue is full.
    fn apply_commands(
        &mut self,
        commands: &mut Consumer<ToneCommand>,
        retired: &mut Producer<Arc<ToneBuffer>>,
    ) {
        while self.current.is_none() || !retired.is_full() {
            let Ok(command) = commands.pop() else {
                break;
            };
            let next = match command {
                ToneCommand::Play(buffer) => Some(buffer),
                ToneCommand::Stop => None,
            };
            // Same frequency keeps its phase so loudness steps do not click
            let same_tone = matches!(
                (&self.current, &next),
                (Some(old), Some(new)) if old.frequency_hz == new.frequency_hz
            );
            if !same_tone {
                self.position = 0.0;
            }
            if let Some(buffer) = &next {
                self.step = buffer.sample_rate as f64 / self.device_rate;
            }
            if let Some(old) = std::mem::replace(&mut self.current, next) {
                if let Err(rtrb::PushError::Full(old)) = retired.push(old) {
                    // Loop guard keeps a slot free; never free on this thread
                    self.current = Some(old);
                }
            }
        }
    }

    fn next_sample(&mut self) -> f32 {
        match &self.current {
            Some(buffer) if !buffer.samples.is_empty() => {
                let len = buffer.samples.len() as f64;
                if self.position >= len {
                    self.position = 0.0;
                }
                let value = buffer.samples[self.position as usize];
                self.position = (self.position + self.step) % len;
                value
            }
            _ => 0.0,
        }
    }

    #[cfg(test)]
    fn current(&self) -> Option<&Arc<ToneBuffer>> {
        self.current.as_ref()
    }
}

fn open_output_stream(
    mut command_rx: Consumer<ToneCommand>,
    mut retired_tx: Producer<Arc<ToneBuffer>>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: "No default output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    let stream_config: cpal::StreamConfig = config.clone().into();
    let channels_count = stream_config.channels as usize;
    let device_rate = stream_config.sample_rate.0 as f64;

    let mut player = LoopPlayer::new(device_rate);

    let err_fn = |err| log::error!("[CpalToneOutput] Output stream error: {}", err);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                player.apply_commands(&mut command_rx, &mut retired_tx);
                for frame in data.chunks_mut(channels_count) {
                    let value = player.next_sample();
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                }
            },
            err_fn,
            None,
        ),
        _ => {
            return Err(AudioError::StreamOpenFailed {
                reason: "Only F32 sample format is currently supported for output".to_string(),
            })
        }
    }
    .map_err(|e| AudioError::StreamOpenFailed {
        reason: format!("{:?}", e),
    })?;

    Ok(stream)
}
