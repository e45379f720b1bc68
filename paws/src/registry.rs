//! Explicit registry of environment and agent constructors.
//!
//! Built once at process start and passed by shared reference to the
//! orchestration entry points; it is not mutated afterwards.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::agent::AgentBuilder;
use crate::agent::hill_climb::{self, HillClimbBuilder};
use crate::env::Environment;
use crate::env::door::{self, DoorReachEnv};
use crate::env::shaper::RewardShaper;
use crate::io::config::EnvConfig;

/// Constructs a base (unshaped) environment from its config.
pub type EnvFactory = Box<dyn Fn(&EnvConfig) -> Result<Box<dyn Environment>>>;

#[derive(Default)]
pub struct Registry {
    envs: BTreeMap<String, EnvFactory>,
    agents: BTreeMap<String, Box<dyn AgentBuilder>>,
}

impl Registry {
    /// Empty registry; see [`Registry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `door_reach` and `hill_climb`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_env(door::KIND, |config: &EnvConfig| {
            Ok(Box::new(DoorReachEnv::new(config)?) as Box<dyn Environment>)
        });
        registry.register_agent(hill_climb::KIND, HillClimbBuilder);
        registry
    }

    pub fn register_env<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&EnvConfig) -> Result<Box<dyn Environment>> + 'static,
    {
        self.envs.insert(kind.to_string(), Box::new(factory));
    }

    pub fn register_agent<B: AgentBuilder + 'static>(&mut self, kind: &str, builder: B) {
        self.agents.insert(kind.to_string(), Box::new(builder));
    }

    /// Build the environment named by `config.kind`, wrapped in
    /// [`RewardShaper`] when `config.shaping` is set.
    pub fn make_env(&self, config: &EnvConfig) -> Result<Box<dyn Environment>> {
        let factory = self.envs.get(&config.kind).ok_or_else(|| {
            anyhow!(
                "unknown env kind '{}' (registered: {})",
                config.kind,
                join_keys(self.envs.keys())
            )
        })?;
        debug!(kind = %config.kind, render_mode = ?config.render_mode, "constructing environment");
        let env = factory(config)?;
        Ok(match &config.shaping {
            Some(shaping) => Box::new(RewardShaper::with_points(
                env,
                shaping.grasp_point.clone(),
                shaping.handle_point.clone(),
                shaping.params(),
            )),
            None => env,
        })
    }

    pub fn agent_builder(&self, kind: &str) -> Result<&dyn AgentBuilder> {
        self.agents
            .get(kind)
            .map(|builder| builder.as_ref())
            .ok_or_else(|| {
                anyhow!(
                    "unknown model kind '{}' (registered: {})",
                    kind,
                    join_keys(self.agents.keys())
                )
            })
    }

    /// Fail early on tags that no factory is registered for.
    pub fn check_kinds(&self, env_kind: &str, model_kind: &str) -> Result<()> {
        if !self.envs.contains_key(env_kind) {
            return Err(anyhow!(
                "unknown env kind '{}' (registered: {})",
                env_kind,
                join_keys(self.envs.keys())
            ));
        }
        self.agent_builder(model_kind).map(|_| ())
    }
}

fn join_keys<'a>(keys: impl Iterator<Item = &'a String>) -> String {
    let keys: Vec<&str> = keys.map(String::as_str).collect();
    if keys.is_empty() {
        return "none".to_string();
    }
    keys.join(", ")
}
