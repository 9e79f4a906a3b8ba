use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hearing_cli"))
}

fn temp_file(name: &str, extension: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let unique = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "hearing_cli_{}_{}_{}.{}",
        name,
        std::process::id(),
        unique,
        extension
    ))
}

#[test]
fn simulate_prints_session_and_appends_history() {
    let history = temp_file("simulate", "json");
    let output = cli()
        .args(["simulate", "--seed", "7", "--history"])
        .arg(&history)
        .output()
        .expect("failed to run hearing_cli simulate");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let session: Value = serde_json::from_str(&stdout).expect("session JSON");
    let results = session["results"].as_array().expect("results array");
    assert_eq!(results.len(), 6);
    assert_eq!(results[0]["frequency"], 250);
    assert_eq!(results[5]["frequency"], 8000);
    assert!(session["severity"].is_string());

    let listed = cli()
        .args(["history", "--history"])
        .arg(&history)
        .output()
        .expect("failed to run hearing_cli history");
    assert!(listed.status.success());
    let sessions: Value =
        serde_json::from_slice(&listed.stdout).expect("history JSON");
    assert_eq!(sessions.as_array().map(Vec::len), Some(1));

    let _ = std::fs::remove_file(&history);
}

#[test]
fn simulate_is_deterministic_for_a_seed() {
    let run = |history: &PathBuf| {
        let output = cli()
            .args(["simulate", "--seed", "1234", "--history"])
            .arg(history)
            .output()
            .expect("failed to run hearing_cli simulate");
        assert!(output.status.success());
        let session: Value = serde_json::from_slice(&output.stdout).expect("session JSON");
        session["results"].clone()
    };

    let first_history = temp_file("seed_a", "json");
    let second_history = temp_file("seed_b", "json");
    assert_eq!(run(&first_history), run(&second_history));

    let _ = std::fs::remove_file(&first_history);
    let _ = std::fs::remove_file(&second_history);
}

#[test]
fn tone_writes_wav_file() {
    let out = temp_file("tone", "wav");
    let output = cli()
        .args(["tone", "--frequency", "1000", "--loudness", "90", "--out"])
        .arg(&out)
        .output()
        .expect("failed to run hearing_cli tone");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let reader = hound::WavReader::open(&out).expect("readable wav");
    assert_eq!(reader.spec().sample_rate, 44_100);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.duration(), 44_100);

    let _ = std::fs::remove_file(&out);
}

#[test]
fn tone_rejects_non_positive_frequency() {
    let out = temp_file("bad_tone", "wav");
    let output = cli()
        .args(["tone", "--frequency", "0", "--loudness", "40", "--out"])
        .arg(&out)
        .output()
        .expect("failed to run hearing_cli tone");
    assert!(!output.status.success());
    assert!(!out.exists());
}

#[test]
fn prompt_without_history_reports_missing_session() {
    let history = temp_file("empty", "json");
    let output = cli()
        .args(["prompt", "--history"])
        .arg(&history)
        .output()
        .expect("failed to run hearing_cli prompt");
    assert_eq!(output.status.code(), Some(2));
}
