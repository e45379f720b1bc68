//! End-to-end tests over the built-in `door_reach` environment.
//!
//! Library-level tests drive train -> resolve -> evaluate in-process; CLI
//! tests spawn the `paws` binary and check exit codes.

use std::fs;
use std::path::Path;
use std::process::Command;

use paws::evaluate::evaluate_with;
use paws::exit_codes;
use paws::interrupt::Interrupt;
use paws::io::config::{ExperimentConfig, parse_config};
use paws::io::progress_log::read_progress;
use paws::io::runs::resolve_run;
use paws::looping::{LoopEvent, SessionEnd, StopReason};
use paws::registry::Registry;
use paws::train::train;

fn config_toml(root: &Path, timesteps: u64) -> String {
    format!(
        r#"
[env]
kind = "door_reach"
max_episode_steps = 25
render_fps = 1000.0
seed = 3

[env.shaping]

[model]
kind = "hill_climb"
experiment_name = "door"
log_dir = "{logs}"
net_arch = [8]
seed = 1
verbose = false

[training]
timesteps = {timesteps}
model_dir = "{models}"
"#,
        logs = root.join("logs").display(),
        models = root.join("models").display(),
    )
}

fn config(root: &Path, timesteps: u64) -> ExperimentConfig {
    parse_config(&config_toml(root, timesteps)).expect("config")
}

#[test]
fn train_then_evaluate_latest_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    let registry = Registry::with_builtins();
    let config = config(temp.path(), 60);

    let first = train(&registry, &config).expect("first train");
    let second = train(&registry, &config).expect("second train");

    assert_eq!(first.run.name, "HILL_CLIMB_1");
    assert_eq!(second.run.name, "HILL_CLIMB_2");
    assert_eq!(second.steps, 60);
    let progress = read_progress(
        &temp
            .path()
            .join("logs/door/HILL_CLIMB_2/progress.jsonl"),
    )
    .expect("progress");
    // Episodes last at most 25 steps, so 60 steps finish at least two.
    assert!(progress.len() >= 2, "{progress:?}");
    assert!(progress.iter().all(|record| record.steps_done <= 60));

    let latest = resolve_run(&config.training.model_dir, None).expect("resolve");
    assert_eq!(latest, second.run);

    let interrupt = Interrupt::new();
    let mut resets = 0;
    let end = evaluate_with(&registry, &config, &interrupt, |event| match event {
        LoopEvent::Reset { .. } => resets += 1,
        LoopEvent::Step { step, .. } => {
            if *step == 60 {
                interrupt.raise();
            }
        }
    })
    .expect("evaluate");

    let SessionEnd::Stopped(outcome) = end else {
        panic!("expected a stopped session, got {end:?}");
    };
    assert_eq!(outcome.stop, StopReason::Interrupted);
    assert_eq!(outcome.steps, 60);
    assert!(resets >= 3, "truncation must reset: {resets}");
    assert_eq!(outcome.episodes, resets);
}

#[test]
fn cli_train_then_inspect_succeeds() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp.path().join("exp.toml");
    fs::write(&config_path, config_toml(temp.path(), 30)).expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_paws"))
        .args(["train", "--config"])
        .arg(&config_path)
        .output()
        .expect("paws train");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Training for 30 timesteps"), "{stdout}");
    assert!(temp.path().join("models/HILL_CLIMB_1/model").is_file());

    let output = Command::new(env!("CARGO_BIN_EXE_paws"))
        .args(["inspect", "--config"])
        .arg(&config_path)
        .output()
        .expect("paws inspect");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("S_handle"), "{stdout}");
    assert!(stdout.contains("Total reward (10 steps)"), "{stdout}");
}

#[test]
fn cli_eval_without_runs_aborts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp.path().join("exp.toml");
    fs::write(&config_path, config_toml(temp.path(), 30)).expect("write config");
    fs::create_dir_all(temp.path().join("models")).expect("mkdir");

    let output = Command::new(env!("CARGO_BIN_EXE_paws"))
        .args(["eval", "--config"])
        .arg(&config_path)
        .output()
        .expect("paws eval");

    assert_eq!(output.status.code(), Some(exit_codes::ABORTED));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no runs found"));
}

#[test]
fn cli_rejects_invalid_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp.path().join("exp.toml");
    let contents = config_toml(temp.path(), 30).replace("timesteps = 30", "timesteps = 0");
    fs::write(&config_path, contents).expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_paws"))
        .args(["train", "--config"])
        .arg(&config_path)
        .output()
        .expect("paws train");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("training.timesteps"));
    assert!(!temp.path().join("models").exists());
}
