use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hearing_test::analysis::format_prompt;
use hearing_test::audio::{write_tone_wav, SilentOutput, ToneOutput, ToneSynthesizer};
use hearing_test::audiometry::{TestEvent, TestState, TestStateMachine};
use hearing_test::config::AppConfig;
use hearing_test::engine::{ManualTimeSource, TestHandle, TimeSource};
use hearing_test::history::{HistorySort, JsonFilePersistence, Session, SessionHistoryStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(
    name = "hearing_cli",
    about = "Pure-tone hearing test engine: tones, simulated and interactive runs, history"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/hearing_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize one tone buffer and write it as a WAV file
    Tone {
        #[arg(long)]
        frequency: f32,
        #[arg(long)]
        loudness: f32,
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a full test against a seeded virtual subject
    Simulate {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Run an interactive test on the default output device
    Run {
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Print stored sessions as JSON
    History {
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = SortArg::DateDescending)]
        sort: SortArg,
    },
    /// Print the analysis request for a stored session
    Prompt {
        #[arg(long)]
        history: Option<PathBuf>,
        /// Session id (defaults to the most recent session)
        #[arg(long)]
        session: Option<u64>,
        #[arg(long)]
        language: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    DateAscending,
    DateDescending,
    SeverityAscending,
    SeverityDescending,
}

impl From<SortArg> for HistorySort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::DateAscending => HistorySort::DateAscending,
            SortArg::DateDescending => HistorySort::DateDescending,
            SortArg::SeverityAscending => HistorySort::SeverityAscending,
            SortArg::SeverityDescending => HistorySort::SeverityDescending,
        }
    }
}

fn main() -> ExitCode {
    hearing_test::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Tone {
            frequency,
            loudness,
            out,
        } => run_tone(&config, frequency, loudness, out),
        Commands::Simulate { seed, history } => run_simulate(&config, seed, history),
        Commands::Run { history } => run_interactive(&config, history),
        Commands::History { history, sort } => run_history(&config, history, sort),
        Commands::Prompt {
            history,
            session,
            language,
        } => run_prompt(&config, history, session, language),
    }
}

fn open_history(config: &AppConfig, path: Option<PathBuf>) -> Arc<SessionHistoryStore> {
    let path = path.unwrap_or_else(|| config.history.path.clone());
    Arc::new(SessionHistoryStore::open(
        config.history.capacity,
        Arc::new(JsonFilePersistence::new(path)),
    ))
}

fn run_tone(config: &AppConfig, frequency: f32, loudness: f32, out: PathBuf) -> Result<ExitCode> {
    let synth = ToneSynthesizer::from_config(&config.tone)?;
    let buffer = synth
        .synthesize(frequency, loudness)
        .with_context(|| format!("synthesizing {} Hz at {} dB", frequency, loudness))?;
    write_tone_wav(&buffer, &out).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "{} samples at {} Hz, peak {:.6} -> {}",
        buffer.samples.len(),
        buffer.sample_rate,
        buffer.peak(),
        out.display()
    );
    Ok(ExitCode::from(0))
}

fn run_simulate(config: &AppConfig, seed: Option<u64>, history: Option<PathBuf>) -> Result<ExitCode> {
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    // Anything above the ceiling times out and gets skipped
    let hearing_levels: Vec<f32> = config
        .test
        .frequencies_hz
        .iter()
        .map(|_| rng.gen_range(0.0..100.0))
        .collect();
    log::info!(
        "[Simulate] Seed {} hearing levels {:?}",
        seed,
        hearing_levels
    );

    let clock = Arc::new(ManualTimeSource::new());
    let time_source: Arc<dyn TimeSource> = clock.clone();
    let store = open_history(config, history);
    let mut machine = TestStateMachine::new(
        config.test.clone(),
        ToneSynthesizer::from_config(&config.tone)?,
        Box::new(SilentOutput::default()),
        time_source,
        Arc::clone(&store),
    )?;

    machine.start()?;
    loop {
        match machine.state() {
            TestState::Completed => break,
            TestState::Inconclusive => {
                machine.skip()?;
            }
            TestState::Running => {
                let snapshot = machine.snapshot();
                if snapshot.loudness_db >= hearing_levels[snapshot.frequency_index] {
                    machine.heard();
                } else if let Some(due) = machine.next_tick_due_ms() {
                    clock.advance(due.saturating_sub(clock.now_ms()));
                    machine.poll();
                } else {
                    bail!("staircase stopped while running");
                }
            }
            state => bail!("unexpected state {:?} during simulation", state),
        }
    }

    let session = machine
        .last_session()
        .ok_or_else(|| anyhow!("simulation finished without a session"))?;
    println!("{}", serde_json::to_string_pretty(session)?);
    Ok(ExitCode::from(0))
}

#[cfg(not(target_os = "android"))]
fn open_output() -> Box<dyn ToneOutput> {
    match hearing_test::audio::CpalToneOutput::new() {
        Ok(output) => Box::new(output),
        Err(err) => {
            log::warn!("[Run] No audio output ({}), continuing silently", err);
            Box::new(SilentOutput::default())
        }
    }
}

#[cfg(target_os = "android")]
fn open_output() -> Box<dyn ToneOutput> {
    Box::new(SilentOutput::default())
}

fn run_interactive(config: &AppConfig, history: Option<PathBuf>) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let config = config.clone();
    runtime.block_on(async move {
        let store = open_history(&config, history);
        let handle = TestHandle::spawn(
            config.test.clone(),
            ToneSynthesizer::from_config(&config.tone)?,
            open_output(),
            store,
        )?;
        let mut events = handle.subscribe();

        // Stdin is blocking; read it on its own thread
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        println!("Commands: h heard, p pause, r resume, t retry, s skip, q quit");
        handle.start().await?;

        let code = loop {
            tokio::select! {
                line = line_rx.recv() => {
                    let Some(line) = line else { break ExitCode::from(0) };
                    let outcome = match line.trim() {
                        "h" => {
                            handle.heard().await;
                            Ok(())
                        }
                        "p" => handle.pause().await,
                        "r" => handle.resume().await,
                        "t" => handle.retry().await,
                        "s" => handle.skip().await.map(|_| ()),
                        "q" => break ExitCode::from(0),
                        "" => Ok(()),
                        other => {
                            println!("Unknown command '{}'", other);
                            Ok(())
                        }
                    };
                    if let Err(err) = outcome {
                        println!("{}", err);
                    }
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(session) = print_event(&event) {
                            println!("{}", serde_json::to_string_pretty(&session)?);
                            break ExitCode::from(0);
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("[Run] Dropped {} events", skipped);
                    }
                    Err(_) => break ExitCode::from(1),
                },
            }
        };

        handle.shutdown().await;
        Ok::<ExitCode, anyhow::Error>(code)
    })
}

/// Print one event; returns the session once the run completes
fn print_event(event: &TestEvent) -> Option<Session> {
    match event {
        TestEvent::FrequencyStarted {
            index,
            frequency_hz,
        } => println!("Frequency {} - {} Hz", index + 1, frequency_hz),
        TestEvent::LoudnessChanged { loudness_db, .. } => println!("  {:.0} dB", loudness_db),
        TestEvent::ResultRecorded { result, skipped } => println!(
            "  threshold {:.0} dB{}",
            result.threshold,
            if *skipped { " (skipped)" } else { "" }
        ),
        TestEvent::MaxLoudnessReached { frequency_hz, .. } => {
            println!("  no response at {} Hz; t retry, s skip", frequency_hz)
        }
        TestEvent::Paused { .. } => println!("  paused"),
        TestEvent::Resumed { .. } => println!("  resumed"),
        TestEvent::HistoryNotSaved { message, .. } => println!("History not saved: {}", message),
        TestEvent::PlaybackFailed { message, .. } => println!("Playback failed: {}", message),
        TestEvent::Completed { session } => return Some(session.clone()),
        TestEvent::Started { .. } | TestEvent::Reset => {}
    }
    None
}

fn run_history(config: &AppConfig, history: Option<PathBuf>, sort: SortArg) -> Result<ExitCode> {
    let store = open_history(config, history);
    let sessions = store.sorted(sort.into())?;
    println!("{}", serde_json::to_string_pretty(&sessions)?);
    Ok(ExitCode::from(0))
}

fn run_prompt(
    config: &AppConfig,
    history: Option<PathBuf>,
    session_id: Option<u64>,
    language: Option<String>,
) -> Result<ExitCode> {
    let store = open_history(config, history);
    let session = match session_id {
        Some(id) => store.get(id)?,
        None => store.latest()?,
    };
    let Some(session) = session else {
        eprintln!("No matching session in history");
        return Ok(ExitCode::from(2));
    };
    let language = language.unwrap_or_else(|| config.analysis.default_language.clone());
    println!("{}", format_prompt(&session, &language));
    Ok(ExitCode::from(0))
}
