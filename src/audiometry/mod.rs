// Audiometry module - the pure-tone threshold procedure
//
// 1. StaircaseController: ascending loudness ramp for one frequency
// 2. TestStateMachine: frequency progression, pause/resume, retry/skip
// 3. ResultAggregator: average threshold and severity band

pub mod events;
pub mod result;
pub mod staircase;
pub mod state_machine;

pub use events::{TestEvent, TestSnapshot, TestState};
pub use result::{Aggregate, HearingResult, ResultAggregator, SeverityLevel};
pub use staircase::{StaircaseController, TickOutcome};
pub use state_machine::TestStateMachine;
