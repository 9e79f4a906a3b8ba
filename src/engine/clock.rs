//! Time sources for the staircase timeline.
//!
//! Every scheduling decision in the engine is expressed in milliseconds on a
//! monotonic timeline supplied by a [`TimeSource`]. Production code uses the
//! system or tokio clock; tests inject [`ManualTimeSource`] and advance it by
//! hand, so no test waits on a real 0.5 s cadence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Trait representing a monotonic time source.
pub trait TimeSource: Send + Sync {
    /// Milliseconds elapsed since the source was created
    fn now_ms(&self) -> u64;

    /// Wall-clock time in milliseconds since the Unix epoch, used for
    /// session timestamps
    fn wall_clock_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Default time source backed by `Instant::now`.
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Time source backed by `tokio::time::Instant`.
///
/// Follows tokio's clock, including a paused clock under
/// `#[tokio::test(start_paused = true)]`.
pub struct TokioTimeSource {
    origin: tokio::time::Instant,
}

impl TokioTimeSource {
    /// Must be called from within a tokio runtime when the clock is paused.
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }

    /// Convert a timeline position back into a tokio deadline
    pub fn instant_at(&self, at_ms: u64) -> tokio::time::Instant {
        self.origin + std::time::Duration::from_millis(at_ms)
    }
}

impl Default for TokioTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioTimeSource {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Virtual clock advanced explicitly.
///
/// Wall-clock time starts at a fixed epoch offset and moves with the
/// monotonic timeline, giving deterministic session timestamps.
pub struct ManualTimeSource {
    epoch_ms: u64,
    offset_ms: AtomicU64,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::starting_at(1_700_000_000_000)
    }

    /// Create with a specific wall-clock origin (ms since the Unix epoch)
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self {
            epoch_ms,
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, ms: u64) {
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.offset_ms.load(Ordering::SeqCst)
    }

    fn wall_clock_ms(&self) -> u64 {
        self.epoch_ms + self.now_ms()
    }
}
