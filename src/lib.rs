// Hearing Test Engine - pure-tone threshold screening
// Staircase loudness procedure, session history and analysis caching

// Module declarations
pub mod analysis;
pub mod audio;
pub mod audiometry;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;

// Re-exports for convenience
pub use audiometry::{HearingResult, SeverityLevel, TestEvent, TestSnapshot, TestState, TestStateMachine};
pub use config::AppConfig;
pub use engine::TestHandle;
pub use history::{Session, SessionHistoryStore};

use tracing_subscriber::EnvFilter;

/// Install the global log subscriber.
///
/// Honors `RUST_LOG` and defaults to `info`. Output goes to stderr so JSON
/// printed by the CLI stays parseable. `log` records from library code are
/// forwarded to the same subscriber. Calling it again is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
    {
        log::debug!("[Logging] Subscriber installed");
    }
}
