//! Learning-agent abstraction.
//!
//! The [`Agent`] trait decouples orchestration from the learning algorithm.
//! [`AgentBuilder`] is the constructor side: it builds a fresh agent bound to
//! an environment's spaces, or loads a persisted artifact.

pub mod hill_climb;
pub mod mlp;

use std::path::Path;

use anyhow::Result;

use crate::core::types::{Action, Observation};
use crate::env::Environment;
use crate::io::config::ModelConfig;

/// Totals reported by [`Agent::learn`].
#[derive(Debug, Clone, PartialEq)]
pub struct LearnSummary {
    /// Environment steps taken; always equals the requested total.
    pub steps: u64,
    /// Episodes that ran to termination or truncation.
    pub episodes: u64,
    pub best_return: Option<f64>,
}

pub trait Agent {
    /// Interact with `env` for exactly `total_steps` steps, updating the policy.
    fn learn(
        &mut self,
        env: &mut dyn Environment,
        total_steps: u64,
        progress: bool,
    ) -> Result<LearnSummary>;

    /// Choose an action; `deterministic` disables exploration noise.
    fn predict(&mut self, observation: &Observation, deterministic: bool) -> Result<Action>;

    /// Persist parameters and hyperparameters to `path`.
    fn save(&self, path: &Path) -> Result<()>;

    /// Log directory of the most recent `learn` call, if the agent keeps one.
    /// Its file name names the run.
    fn run_dir_hint(&self) -> Option<&Path>;

    /// Human-readable summary of the policy architecture.
    fn describe(&self) -> String;
}

pub trait AgentBuilder {
    fn build(&self, config: &ModelConfig, env: &dyn Environment) -> Result<Box<dyn Agent>>;

    fn load(&self, path: &Path) -> Result<Box<dyn Agent>>;
}
