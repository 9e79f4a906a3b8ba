// TestStateMachine - orchestrates one hearing test run
//
// Walks the configured frequency list in order, owning the staircase for the
// active frequency and collecting exactly one result per frequency. Every
// operator command first catches the staircase up with the clock, so a
// "heard" always records the loudness that was audible at that instant.
//
// State flow:
//   Idle --start--> Running --heard (last frequency)--> Completed
//   Running --pause--> Paused --resume--> Running
//   Running --max loudness--> Inconclusive --retry/skip--> Running
//   any --reset--> Idle

use std::sync::Arc;

use crate::audio::output::ToneOutput;
use crate::audio::tone::ToneSynthesizer;
use crate::audiometry::events::{TestEvent, TestSnapshot, TestState};
use crate::audiometry::result::HearingResult;
use crate::audiometry::staircase::{StaircaseController, TickOutcome};
use crate::config::TestConfig;
use crate::engine::clock::TimeSource;
use crate::error::{log_audio_error, log_test_error, AudioError, ErrorCode, TestError};
use crate::history::{Session, SessionHistoryStore};

pub struct TestStateMachine {
    config: TestConfig,
    synth: ToneSynthesizer,
    output: Box<dyn ToneOutput>,
    clock: Arc<dyn TimeSource>,
    history: Arc<SessionHistoryStore>,
    staircase: StaircaseController,
    state: TestState,
    index: usize,
    results: Vec<HearingResult>,
    last_session: Option<Session>,
    events: Vec<TestEvent>,
}

impl TestStateMachine {
    /// Create an idle machine.
    ///
    /// # Errors
    /// `AudioError::InvalidFrequency` if any configured frequency is zero.
    ///
    /// # Panics
    /// If the frequency list is empty.
    pub fn new(
        config: TestConfig,
        synth: ToneSynthesizer,
        output: Box<dyn ToneOutput>,
        clock: Arc<dyn TimeSource>,
        history: Arc<SessionHistoryStore>,
    ) -> Result<Self, AudioError> {
        assert!(
            !config.frequencies_hz.is_empty(),
            "a test needs at least one frequency"
        );
        if let Some(&bad) = config.frequencies_hz.iter().find(|&&hz| hz == 0) {
            return Err(AudioError::InvalidFrequency {
                frequency_hz: bad as f32,
            });
        }
        debug_assert!(config.step_db > 0.0);

        let staircase = StaircaseController::new(&config);
        Ok(Self {
            config,
            synth,
            output,
            clock,
            history,
            staircase,
            state: TestState::Idle,
            index: 0,
            results: Vec::new(),
            last_session: None,
            events: Vec::new(),
        })
    }

    // ========================================================================
    // OPERATOR COMMANDS
    // ========================================================================

    /// Begin the run at the first frequency.
    pub fn start(&mut self) -> Result<(), TestError> {
        match self.state {
            TestState::Idle => {}
            TestState::Completed => return Err(TestError::AlreadyCompleted),
            _ => return Err(TestError::AlreadyStarted),
        }

        log::info!(
            "[TestStateMachine] Starting test over {:?} Hz",
            self.config.frequencies_hz
        );
        self.state = TestState::Running;
        self.index = 0;
        self.results.clear();
        self.emit(TestEvent::Started {
            frequencies_hz: self.config.frequencies_hz.clone(),
        });
        self.begin_frequency();
        Ok(())
    }

    /// The subject heard the tone.
    ///
    /// Ignored unless a frequency is actively ramping. Returns the recorded
    /// result, if any.
    pub fn heard(&mut self) -> Option<HearingResult> {
        self.poll();
        if self.state != TestState::Running {
            log::debug!(
                "[TestStateMachine] Ignoring heard while {:?}",
                self.state
            );
            return None;
        }
        let threshold = self.staircase.acknowledge()?;
        Some(self.record_result(threshold, false))
    }

    /// Suspend ticking and playback; loudness and frequency are kept.
    pub fn pause(&mut self) -> Result<(), TestError> {
        self.poll();
        match self.state {
            TestState::Idle => return Err(TestError::NotStarted),
            TestState::Completed => return Err(TestError::AlreadyCompleted),
            TestState::Paused | TestState::Inconclusive => return Ok(()),
            TestState::Running => {}
        }

        self.staircase.stop();
        self.stop_output();
        self.state = TestState::Paused;
        let loudness_db = self.staircase.loudness_db();
        log::info!("[TestStateMachine] Paused at {:.1} dB", loudness_db);
        self.emit(TestEvent::Paused { loudness_db });
        Ok(())
    }

    /// Continue from the retained loudness.
    pub fn resume(&mut self) -> Result<(), TestError> {
        match self.state {
            TestState::Idle => return Err(TestError::NotStarted),
            TestState::Completed => return Err(TestError::AlreadyCompleted),
            TestState::Running => return Ok(()),
            TestState::Inconclusive => return Err(self.inconclusive_error()),
            TestState::Paused => {}
        }

        self.staircase.resume(self.clock.now_ms());
        self.state = TestState::Running;
        self.play_current();
        let loudness_db = self.staircase.loudness_db();
        log::info!("[TestStateMachine] Resumed at {:.1} dB", loudness_db);
        self.emit(TestEvent::Resumed { loudness_db });
        Ok(())
    }

    /// Restart the inconclusive frequency from minimum loudness.
    pub fn retry(&mut self) -> Result<(), TestError> {
        self.require_inconclusive()?;
        log::info!(
            "[TestStateMachine] Retrying {} Hz",
            self.config.frequencies_hz[self.index]
        );
        self.state = TestState::Running;
        self.begin_frequency();
        Ok(())
    }

    /// Record the inconclusive frequency at the ceiling loudness and move on.
    pub fn skip(&mut self) -> Result<HearingResult, TestError> {
        self.require_inconclusive()?;
        self.state = TestState::Running;
        let ceiling = self.staircase.max_loudness_db();
        Ok(self.record_result(ceiling, true))
    }

    /// Abandon the current run. Saved sessions are untouched.
    pub fn reset(&mut self) {
        if self.state != TestState::Idle {
            self.stop_output();
        }
        self.state = TestState::Idle;
        self.index = 0;
        self.results.clear();
        self.staircase = StaircaseController::new(&self.config);
        log::info!("[TestStateMachine] Reset to idle");
        self.emit(TestEvent::Reset);
    }

    /// Deliver every staircase tick due by now.
    ///
    /// Returns the number of ticks applied.
    pub fn poll(&mut self) -> usize {
        if self.state != TestState::Running {
            return 0;
        }
        let outcomes = self.staircase.advance(self.clock.now_ms());
        let applied = outcomes.len();
        for outcome in outcomes {
            match outcome {
                TickOutcome::LoudnessChanged { loudness_db } => {
                    self.play_at(loudness_db);
                    self.emit(TestEvent::LoudnessChanged {
                        frequency_hz: self.config.frequencies_hz[self.index],
                        loudness_db,
                    });
                }
                TickOutcome::MaxLoudnessReached { loudness_db } => {
                    self.on_max_loudness(loudness_db);
                }
            }
        }
        applied
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn results(&self) -> &[HearingResult] {
        &self.results
    }

    /// Session produced by the most recent completed run
    pub fn last_session(&self) -> Option<&Session> {
        self.last_session.as_ref()
    }

    pub fn current_frequency_hz(&self) -> Option<u32> {
        match self.state {
            TestState::Idle | TestState::Completed => None,
            _ => self.config.frequencies_hz.get(self.index).copied(),
        }
    }

    /// Timeline position of the next tick, for schedulers
    pub fn next_tick_due_ms(&self) -> Option<u64> {
        self.staircase.next_tick_due_ms()
    }

    pub fn snapshot(&self) -> TestSnapshot {
        TestSnapshot {
            state: self.state,
            frequency_index: self.index,
            frequency_hz: self.current_frequency_hz(),
            loudness_db: self.staircase.loudness_db(),
            progress: self.staircase.progress(),
            total_frequencies: self.config.frequencies_hz.len(),
            results: self.results.clone(),
        }
    }

    /// Take the events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<TestEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // HELPER METHODS
    // ========================================================================

    fn begin_frequency(&mut self) {
        let frequency_hz = self.config.frequencies_hz[self.index];
        self.staircase.start(self.clock.now_ms());
        log::debug!(
            "[TestStateMachine] Frequency {}/{}: {} Hz",
            self.index + 1,
            self.config.frequencies_hz.len(),
            frequency_hz
        );
        self.emit(TestEvent::FrequencyStarted {
            index: self.index,
            frequency_hz,
        });
        self.play_current();
    }

    fn record_result(&mut self, threshold: f32, skipped: bool) -> HearingResult {
        let result = HearingResult::new(self.config.frequencies_hz[self.index], threshold);
        self.results.push(result);
        log::info!(
            "[TestStateMachine] {} Hz threshold {:.1} dB{}",
            result.frequency,
            result.threshold,
            if skipped { " (skipped)" } else { "" }
        );
        self.emit(TestEvent::ResultRecorded { result, skipped });

        if self.index + 1 < self.config.frequencies_hz.len() {
            self.index += 1;
            self.begin_frequency();
        } else {
            self.complete();
        }
        result
    }

    fn complete(&mut self) {
        self.staircase.stop();
        self.stop_output();
        self.state = TestState::Completed;

        assert_eq!(
            self.results.len(),
            self.config.frequencies_hz.len(),
            "completed with a partial result set"
        );

        let session = Session::from_results(self.results.clone(), self.clock.wall_clock_ms());
        let session = match self.history.append(session.clone()) {
            Ok(receipt) => {
                if let Some(err) = receipt.persistence_error {
                    self.emit(TestEvent::HistoryNotSaved {
                        code: err.code(),
                        message: err.message(),
                    });
                }
                receipt.session
            }
            Err(err) => {
                self.emit(TestEvent::HistoryNotSaved {
                    code: err.code(),
                    message: err.message(),
                });
                session
            }
        };

        log::info!(
            "[TestStateMachine] Completed: average {:.1} dB, {}",
            session.average_threshold(),
            session.severity()
        );
        self.last_session = Some(session.clone());
        self.emit(TestEvent::Completed { session });
    }

    fn on_max_loudness(&mut self, loudness_db: f32) {
        self.stop_output();
        self.state = TestState::Inconclusive;
        let frequency_hz = self.config.frequencies_hz[self.index];
        log::warn!(
            "[TestStateMachine] {}",
            TestError::Inconclusive {
                frequency_hz,
                loudness_db
            }
            .message()
        );
        self.emit(TestEvent::MaxLoudnessReached {
            frequency_hz,
            loudness_db,
        });
    }

    fn play_current(&mut self) {
        self.play_at(self.staircase.loudness_db());
    }

    /// Batched ticks each carry their own step loudness
    fn play_at(&mut self, loudness_db: f32) {
        let frequency_hz = self.config.frequencies_hz[self.index];
        let played = self
            .synth
            .synthesize(frequency_hz as f32, loudness_db)
            .and_then(|buffer| self.output.play_looped(Arc::new(buffer)));
        if let Err(err) = played {
            self.report_playback_error(err, "TestStateMachine::play_at");
        }
    }

    fn stop_output(&mut self) {
        if let Err(err) = self.output.stop() {
            self.report_playback_error(err, "TestStateMachine::stop_output");
        }
    }

    fn report_playback_error(&mut self, err: AudioError, context: &str) {
        log_audio_error(&err, context);
        self.emit(TestEvent::PlaybackFailed {
            code: err.code(),
            message: err.message(),
        });
    }

    fn require_inconclusive(&self) -> Result<(), TestError> {
        let result = match self.state {
            TestState::Inconclusive => Ok(()),
            TestState::Idle => Err(TestError::NotStarted),
            TestState::Completed => Err(TestError::AlreadyCompleted),
            _ => Err(TestError::NotInconclusive),
        };
        result.inspect_err(|err| log_test_error(err, "TestStateMachine::require_inconclusive"))
    }

    fn inconclusive_error(&self) -> TestError {
        TestError::Inconclusive {
            frequency_hz: self.config.frequencies_hz[self.index],
            loudness_db: self.staircase.loudness_db(),
        }
    }

    fn emit(&mut self, event: TestEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
