//! Basic CLI E2E tests.
//!
//! Tests invoke the built `pulse` binary with a throwaway home directory and
//! verify exit codes and output.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Run a CLI command against `home` and return (stdout, stderr, exit code).
fn run_cli(home: &TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pulse"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("PULSE_ENV")
        .env("PULSE_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is JSON"))
        .collect()
}

fn types(events: &[serde_json::Value]) -> Vec<&str> {
    events.iter().filter_map(|e| e["type"].as_str()).collect()
}

#[test]
fn test_config_get_default() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["config", "get", "timers.snooze_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");
    assert!(home.path().join(".config/pulse/config.toml").exists());
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(&home, &["config", "set", "session.preparation_seconds", "8"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(&home, &["config", "get", "session.preparation_seconds"]);
    assert_eq!(stdout.trim(), "8");
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&home, &["config", "get", "timers.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, stderr, code) = run_cli(&home, &["config", "set", "audio.sound_enabled", "loud"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("audio.sound_enabled"));
}

#[test]
fn test_config_list_is_json() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["timers"]["default_interval_minutes"], 45);
}

#[test]
fn test_routine_list_json() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["routine", "list", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let routines = parsed.as_array().unwrap();
    assert_eq!(routines.len(), 2);
    assert_eq!(routines[0]["name"], "Micro Pausa");
    assert_eq!(routines[0]["interval_minutes"], 30);
}

#[test]
fn test_routine_show_unknown_fails() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["routine", "show", "Pausa Activa"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["exercises"].as_array().unwrap().len(), 4);

    let (_, stderr, code) = run_cli(&home, &["routine", "show", "Yoga"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Yoga"));
}

#[test]
fn test_simulate_fires_and_completes_session() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(&home, &["simulate", "--seconds", "1900"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let events = json_lines(&stdout);
    let kinds = types(&events);
    assert_eq!(kinds[0], "TimersStarted");

    let fired: Vec<&serde_json::Value> = events
        .iter()
        .filter(|e| e["type"] == "RoutineFired")
        .collect();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0]["routine_id"], "Micro Pausa");

    let completed = events
        .iter()
        .find(|e| e["type"] == "SessionCompleted")
        .expect("session completes");
    assert_eq!(completed["logs"].as_array().unwrap().len(), 3);
    assert!(kinds.contains(&"RoutineRestarted"));
}

#[test]
fn test_simulate_fire_with_auto_skip() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(
        &home,
        &["simulate", "--seconds", "3", "--fire", "Pausa Activa", "--auto-skip", "--status"],
    );
    assert_eq!(code, 0);
    let events = json_lines(&stdout);
    let kinds = types(&events);
    assert_eq!(&kinds[..3], &["TimersStarted", "RoutineFired", "SessionStarted"]);
    let last = events.last().unwrap();
    assert_eq!(last["type"], "SessionSnapshot");
    assert_eq!(last["exercise_name"], "Walk");
    assert_eq!(last["remaining_secs"], 117);
}

#[test]
fn test_simulate_unknown_routine_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&home, &["simulate", "--seconds", "1", "--fire", "Yoga"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Yoga"));
}

#[test]
fn test_run_reads_commands_from_stdin() {
    let home = TempDir::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_pulse"))
        .arg("run")
        .env("HOME", home.path())
        .env_remove("PULSE_ENV")
        .env("PULSE_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"pause\nstatus\nquit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events = json_lines(&stdout);
    let kinds = types(&events);
    assert!(kinds.contains(&"TimersStarted"));
    assert!(kinds.contains(&"TimersPaused"));
    let snapshot = events
        .iter()
        .find(|e| e["type"] == "TimerSnapshot")
        .unwrap();
    assert_eq!(snapshot["state"], "paused");
}
