//! TestHandle: async driver for a hearing test run.
//!
//! A tokio task owns the [`TestStateMachine`] outright. Operator commands
//! arrive over an `mpsc` channel with `oneshot` replies, every state change
//! is published on a `broadcast` channel, and between commands the task
//! sleeps until the staircase's next scheduled tick. The machine is never
//! touched from two places at once, so there is exactly one timeline.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::audio::output::ToneOutput;
use crate::audio::tone::ToneSynthesizer;
use crate::audiometry::{HearingResult, TestEvent, TestSnapshot, TestStateMachine};
use crate::config::TestConfig;
use crate::engine::clock::{TimeSource, TokioTimeSource};
use crate::error::{log_test_error, AudioError, TestError};
use crate::history::SessionHistoryStore;

const COMMAND_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 256;

type Reply<T> = oneshot::Sender<T>;

/// Operator command routed to the driver task.
#[derive(Debug)]
enum TestCommand {
    Start(Reply<Result<(), TestError>>),
    Heard(Reply<Option<HearingResult>>),
    Pause(Reply<Result<(), TestError>>),
    Resume(Reply<Result<(), TestError>>),
    Retry(Reply<Result<(), TestError>>),
    Skip(Reply<Result<HearingResult, TestError>>),
    Reset(Reply<()>),
    Snapshot(Reply<TestSnapshot>),
}

/// Handle to a running test driver.
///
/// Dropping every handle closes the command channel and ends the task.
pub struct TestHandle {
    command_tx: mpsc::Sender<TestCommand>,
    events_tx: broadcast::Sender<TestEvent>,
    worker: JoinHandle<()>,
}

impl TestHandle {
    /// Spawn the driver on the current tokio runtime.
    ///
    /// The staircase follows tokio's clock, so a paused test runtime drives
    /// the tick cadence without real waiting.
    pub fn spawn(
        config: TestConfig,
        synth: ToneSynthesizer,
        output: Box<dyn ToneOutput>,
        history: Arc<SessionHistoryStore>,
    ) -> Result<Self, AudioError> {
        let clock = Arc::new(TokioTimeSource::new());
        let time_source: Arc<dyn TimeSource> = clock.clone();
        let machine = TestStateMachine::new(config, synth, output, time_source, history)?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let worker = tokio::spawn(drive(machine, clock, command_rx, events_tx.clone()));
        tracing::info!("[TestHandle] Driver task started");

        Ok(Self {
            command_tx,
            events_tx,
            worker,
        })
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.events_tx.subscribe()
    }

    pub async fn start(&self) -> Result<(), TestError> {
        self.request(TestCommand::Start)
            .await
            .unwrap_or(Err(TestError::NotRunning))
    }

    /// Returns the recorded result, or `None` if the press was ignored.
    pub async fn heard(&self) -> Option<HearingResult> {
        self.request(TestCommand::Heard).await.flatten()
    }

    pub async fn pause(&self) -> Result<(), TestError> {
        self.request(TestCommand::Pause)
            .await
            .unwrap_or(Err(TestError::NotRunning))
    }

    pub async fn resume(&self) -> Result<(), TestError> {
        self.request(TestCommand::Resume)
            .await
            .unwrap_or(Err(TestError::NotRunning))
    }

    pub async fn retry(&self) -> Result<(), TestError> {
        self.request(TestCommand::Retry)
            .await
            .unwrap_or(Err(TestError::NotRunning))
    }

    pub async fn skip(&self) -> Result<HearingResult, TestError> {
        self.request(TestCommand::Skip)
            .await
            .unwrap_or(Err(TestError::NotRunning))
    }

    pub async fn reset(&self) {
        let _ = self.request(TestCommand::Reset).await;
    }

    /// Current state, or `None` if the driver has stopped.
    pub async fn snapshot(&self) -> Option<TestSnapshot> {
        self.request(TestCommand::Snapshot).await
    }

    /// Close the command channel and wait for the driver to finish.
    pub async fn shutdown(self) {
        let Self {
            command_tx, worker, ..
        } = self;
        drop(command_tx);
        if let Err(err) = worker.await {
            tracing::warn!("[TestHandle] Driver task ended abnormally: {}", err);
        }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> TestCommand) -> Option<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.command_tx.send(make(reply_tx)).await.is_err() {
            log_test_error(&TestError::NotRunning, "TestHandle::request");
            return None;
        }
        reply_rx.await.ok()
    }
}

async fn drive(
    mut machine: TestStateMachine,
    clock: Arc<TokioTimeSource>,
    mut commands: mpsc::Receiver<TestCommand>,
    events_tx: broadcast::Sender<TestEvent>,
) {
    loop {
        let deadline = machine.next_tick_due_ms().map(|ms| clock.instant_at(ms));

        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => apply(&mut machine, command),
                None => break,
            },
            _ = sleep_until(deadline) => {
                machine.poll();
            }
        }

        for event in machine.drain_events() {
            // No subscribers is not an error
            let _ = events_tx.send(event);
        }
    }

    machine.reset();
    tracing::info!("[TestHandle] Driver task stopped");
}

fn apply(machine: &mut TestStateMachine, command: TestCommand) {
    // A dropped reply receiver only means the caller stopped waiting
    match command {
        TestCommand::Start(reply) => {
            let _ = reply.send(machine.start());
        }
        TestCommand::Heard(reply) => {
            let _ = reply.send(machine.heard());
        }
        TestCommand::Pause(reply) => {
            let _ = reply.send(machine.pause());
        }
        TestCommand::Resume(reply) => {
            let _ = reply.send(machine.resume());
        }
        TestCommand::Retry(reply) => {
            let _ = reply.send(machine.retry());
        }
        TestCommand::Skip(reply) => {
            let _ = reply.send(machine.skip());
        }
        TestCommand::Reset(reply) => {
            machine.reset();
            let _ = reply.send(());
        }
        TestCommand::Snapshot(reply) => {
            machine.poll();
            let _ = reply.send(machine.snapshot());
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
