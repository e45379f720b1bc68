//! `paws` command-line entry point.
//!
//! Every subcommand takes a single `--config` TOML file describing the
//! environment, the agent and where runs are stored.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use paws::evaluate::evaluate;
use paws::exit_codes;
use paws::inspect::inspect;
use paws::interrupt::Interrupt;
use paws::io::config::load_config;
use paws::logging;
use paws::looping::SessionEnd;
use paws::registry::Registry;
use paws::train::train;
use paws::visualize::visualize;

#[derive(Debug, Parser)]
#[command(
    name = "paws",
    version,
    about = "Train, evaluate and visualize reinforcement-learning agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train an agent and save it as a run under `training.model_dir`.
    Train(ConfigArgs),
    /// Replay the latest (or `evaluation.run_name`) run until Ctrl-C.
    Eval(ConfigArgs),
    /// Watch the environment under random actions until Ctrl-C.
    Visualize(ConfigArgs),
    /// Print observation layout, named points, sample rewards and policy.
    Inspect(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Experiment config file (TOML).
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(command: Command) -> Result<i32> {
    let registry = Registry::with_builtins();
    match command {
        Command::Train(args) => cmd_train(&registry, &args.config),
        Command::Eval(args) => cmd_eval(&registry, &args.config),
        Command::Visualize(args) => cmd_visualize(&registry, &args.config),
        Command::Inspect(args) => cmd_inspect(&registry, &args.config),
    }
}

fn cmd_train(registry: &Registry, config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    println!("Training for {} timesteps...", config.training.timesteps);
    let outcome = train(registry, &config)?;
    println!(
        "Trained {} steps; model saved to {}",
        outcome.steps,
        outcome.artifact_path.display()
    );
    Ok(exit_codes::OK)
}

fn cmd_eval(registry: &Registry, config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let interrupt = Interrupt::new();
    interrupt.install_ctrlc_handler()?;
    report_session(evaluate(registry, &config, &interrupt)?)
}

fn cmd_visualize(registry: &Registry, config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let interrupt = Interrupt::new();
    interrupt.install_ctrlc_handler()?;
    report_session(visualize(registry, &config, &interrupt)?)
}

fn cmd_inspect(registry: &Registry, config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    print!("{}", inspect(registry, &config)?);
    Ok(exit_codes::OK)
}

fn report_session(end: SessionEnd) -> Result<i32> {
    match end {
        SessionEnd::Stopped(outcome) => {
            println!("Stopped by user.");
            println!(
                "{} steps over {} episodes",
                outcome.steps, outcome.episodes
            );
            Ok(exit_codes::OK)
        }
        SessionEnd::Aborted(reason) => {
            eprintln!("{reason}");
            Ok(exit_codes::ABORTED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn each_subcommand_takes_a_config_path() {
        for name in ["train", "eval", "visualize", "inspect"] {
            let cli = Cli::try_parse_from(["paws", name, "--config", "exp.toml"])
                .unwrap_or_else(|err| panic!("{name}: {err}"));
            let args = match cli.command {
                Command::Train(args)
                | Command::Eval(args)
                | Command::Visualize(args)
                | Command::Inspect(args) => args,
            };
            assert_eq!(args.config, PathBuf::from("exp.toml"));
        }
    }

    #[test]
    fn config_flag_is_required() {
        let err = Cli::try_parse_from(["paws", "train"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
