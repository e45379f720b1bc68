//! `paws inspect`: sanity-check an experiment config without training.
//!
//! Builds the environment, reports its observation layout and named
//! reference points, steps a few random actions and describes the policy the
//! configured agent would train.

use std::fmt;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, instrument};

use crate::core::types::Position;
use crate::env::{EnvHandle, Environment};
use crate::io::config::ExperimentConfig;
use crate::registry::Registry;

/// Random steps taken to verify the reward signal.
pub const INSPECT_STEPS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    /// Keys of a dict observation; empty for vector observations.
    pub observation_keys: Vec<String>,
    pub observation_size: usize,
    /// `None` when the environment exposes no named reference points.
    pub named_points: Option<Vec<(String, Position)>>,
    /// Reward of each random step, in order.
    pub rewards: Vec<f64>,
    pub total_reward: f64,
    /// Set when stepping failed part way; `rewards` holds the steps before it.
    pub stepping_error: Option<String>,
    pub policy: PolicyReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyReport {
    Described(String),
    BuildFailed(String),
}

/// Inspect the environment and agent named by `config`.
///
/// Stepping faults and agent construction failures are captured in the
/// report. The environment is closed before returning.
#[instrument(skip_all, fields(env = %config.env.kind, model = %config.model.kind))]
pub fn inspect(registry: &Registry, config: &ExperimentConfig) -> Result<InspectReport> {
    let mut env = EnvHandle::new(
        registry
            .make_env(&config.env)
            .context("construct environment")?,
    );
    let (observation, _) = env.reset().context("reset environment")?;
    let named_points = read_named_points(&*env)?;

    let mut rng = match config.env.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut rewards = Vec::with_capacity(INSPECT_STEPS);
    let mut stepping_error = None;
    for _ in 0..INSPECT_STEPS {
        match step_once(&mut *env, &mut rng) {
            Ok(reward) => rewards.push(reward),
            Err(err) => {
                debug!(error = %format!("{err:#}"), "stepping failed during inspection");
                stepping_error = Some(format!("{err:#}"));
                break;
            }
        }
    }

    let policy = match registry
        .agent_builder(&config.model.kind)
        .and_then(|builder| builder.build(&config.model, &*env))
    {
        Ok(agent) => PolicyReport::Described(agent.describe()),
        Err(err) => PolicyReport::BuildFailed(format!("{err:#}")),
    };

    let observation_size = env.observation_size();
    env.close().context("close environment")?;
    Ok(InspectReport {
        observation_keys: observation.keys().into_iter().map(str::to_string).collect(),
        observation_size,
        named_points,
        total_reward: rewards.iter().sum(),
        rewards,
        stepping_error,
        policy,
    })
}

fn read_named_points(env: &dyn Environment) -> Result<Option<Vec<(String, Position)>>> {
    let Some(points) = env.named_points() else {
        return Ok(None);
    };
    let mut found = Vec::new();
    for name in points.point_names() {
        if let Some(position) = points.try_get_named_point(&name)? {
            found.push((name, position));
        }
    }
    Ok(Some(found))
}

fn step_once(env: &mut dyn Environment, rng: &mut StdRng) -> Result<f64> {
    let action = env.action_space().sample(rng);
    let result = env.step(&action)?;
    if result.episode_over() {
        env.reset()?;
    }
    Ok(result.reward)
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Environment ---")?;
        if self.observation_keys.is_empty() {
            writeln!(f, "Observation: vector of {}", self.observation_size)?;
        } else {
            writeln!(
                f,
                "Observation keys: {} ({} values)",
                self.observation_keys.join(", "),
                self.observation_size
            )?;
        }
        match &self.named_points {
            Some(points) => {
                writeln!(f, "Named points:")?;
                for (name, [x, y, z]) in points {
                    writeln!(f, "  {name}: ({x:.3}, {y:.3}, {z:.3})")?;
                }
            }
            None => writeln!(f, "No named points exposed")?,
        }

        writeln!(f, "\n--- Rewards ---")?;
        for (idx, reward) in self.rewards.iter().enumerate() {
            writeln!(f, "Step {}: reward = {reward:.4}", idx + 1)?;
        }
        if let Some(err) = &self.stepping_error {
            writeln!(f, "Error during stepping: {err}")?;
        }
        writeln!(
            f,
            "Total reward ({} steps): {:.4}",
            self.rewards.len(),
            self.total_reward
        )?;

        writeln!(f, "\n--- Policy ---")?;
        match &self.policy {
            PolicyReport::Described(description) => writeln!(f, "{description}"),
            PolicyReport::BuildFailed(err) => {
                writeln!(f, "Failed to build agent for inspection: {err}")
            }
        }
    }
}
