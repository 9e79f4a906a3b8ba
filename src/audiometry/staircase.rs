// StaircaseController - ascending loudness ramp for one frequency
//
// The controller owns at most one repeating timer, represented as the
// timeline position of its next tick. Starting always replaces the previous
// timer, and stopping clears it, so two timers can never run at once and no
// tick is delivered after a stop.

use crate::config::TestConfig;

/// Result of one timer tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Loudness increased; a fresh tone buffer is needed
    LoudnessChanged { loudness_db: f32 },
    /// Ceiling reached with no acknowledgement; controller is now inactive
    MaxLoudnessReached { loudness_db: f32 },
}

/// Pending repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TickTimer {
    next_due_ms: u64,
}

/// Drives the loudness ramp for the active frequency
#[derive(Debug, Clone)]
pub struct StaircaseController {
    loudness_db: f32,
    active: bool,
    timer: Option<TickTimer>,
    min_loudness_db: f32,
    max_loudness_db: f32,
    step_db: f32,
    tick_interval_ms: u64,
}

impl StaircaseController {
    pub fn new(config: &TestConfig) -> Self {
        Self {
            loudness_db: config.min_loudness_db,
            active: false,
            timer: None,
            min_loudness_db: config.min_loudness_db,
            max_loudness_db: config.max_loudness_db,
            step_db: config.step_db,
            tick_interval_ms: config.tick_interval_ms,
        }
    }

    /// Begin a fresh ramp at minimum loudness with the first tick one
    /// interval from `now_ms`. Any running timer is cancelled first.
    pub fn start(&mut self, now_ms: u64) {
        self.stop();
        self.loudness_db = self.min_loudness_db;
        self.arm(now_ms);
    }

    /// Restart ticking from the retained loudness
    pub fn resume(&mut self, now_ms: u64) {
        self.stop();
        self.arm(now_ms);
    }

    /// Cancel the timer without recording anything. Loudness is retained.
    pub fn stop(&mut self) {
        self.timer = None;
        self.active = false;
    }

    /// Capture the current loudness as the threshold.
    ///
    /// Returns `None` while inactive so a late press can never record a
    /// stale loudness.
    pub fn acknowledge(&mut self) -> Option<f32> {
        if !self.active {
            return None;
        }
        self.stop();
        Some(self.loudness_db)
    }

    /// Apply one ramp step.
    ///
    /// Returns `None` if the controller is inactive.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if !self.active {
            return None;
        }
        if self.loudness_db < self.max_loudness_db {
            self.loudness_db = (self.loudness_db + self.step_db).min(self.max_loudness_db);
            Some(TickOutcome::LoudnessChanged {
                loudness_db: self.loudness_db,
            })
        } else {
            self.stop();
            Some(TickOutcome::MaxLoudnessReached {
                loudness_db: self.loudness_db,
            })
        }
    }

    /// Deliver every tick due at or before `now_ms`, in order.
    pub fn advance(&mut self, now_ms: u64) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        while let Some(timer) = self.timer {
            if timer.next_due_ms > now_ms {
                break;
            }
            self.timer = Some(TickTimer {
                next_due_ms: timer.next_due_ms + self.tick_interval_ms,
            });
            match self.tick() {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        outcomes
    }

    pub fn loudness_db(&self) -> f32 {
        self.loudness_db
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn max_loudness_db(&self) -> f32 {
        self.max_loudness_db
    }

    /// Timeline position of the next tick, if a timer is running
    pub fn next_tick_due_ms(&self) -> Option<u64> {
        self.timer.map(|t| t.next_due_ms)
    }

    /// Ramp position in `[0, 1]`
    pub fn progress(&self) -> f32 {
        let span = self.max_loudness_db - self.min_loudness_db;
        if span <= 0.0 {
            return 1.0;
        }
        ((self.loudness_db - self.min_loudness_db) / span).clamp(0.0, 1.0)
    }

    fn arm(&mut self, now_ms: u64) {
        self.active = true;
        self.timer = Some(TickTimer {
            next_due_ms: now_ms + self.tick_interval_ms,
        });
    }
}
