//! Engine module: clocks and the async test driver.
//!
//! `clock` supplies the millisecond timeline the staircase is scheduled on;
//! `core` runs a [`TestStateMachine`](crate::audiometry::TestStateMachine)
//! inside a tokio task behind a command/event channel pair.

pub mod clock;
pub mod core;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource, TokioTimeSource};
pub use core::TestHandle;
