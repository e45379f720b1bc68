//! Execution loop shared by `paws eval` and `paws visualize`.
//!
//! Reset, then act/step/render forever, resetting whenever an episode ends.
//! The loop only stops on an external interrupt (polled at iteration
//! boundaries) or on a collaborator fault; the environment is released
//! exactly once on every exit path.

use anyhow::{Result, anyhow};
use rand::rngs::StdRng;
use tracing::{debug, info, instrument};

use crate::agent::Agent;
use crate::core::loop_state::{LoopInput, LoopState, transition};
use crate::core::types::{Action, Observation};
use crate::env::{EnvHandle, Environment};
use crate::interrupt::Interrupt;
use crate::io::config::{EnvConfig, RenderMode};
use crate::registry::Registry;

/// Where actions come from.
pub enum ActionSource<'a> {
    /// Agent inference.
    Agent {
        agent: &'a mut dyn Agent,
        deterministic: bool,
    },
    /// Uniform samples from the environment's action space.
    Random(StdRng),
}

impl ActionSource<'_> {
    fn next_action(&mut self, observation: &Observation, env: &dyn Environment) -> Result<Action> {
        match self {
            ActionSource::Agent {
                agent,
                deterministic,
            } => agent.predict(observation, *deterministic),
            ActionSource::Random(rng) => Ok(env.action_space().sample(rng)),
        }
    }
}

/// Observable progress of a running loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// Environment was reset; `episode` is 1 for the initial reset.
    Reset { episode: u64 },
    Step {
        step: u64,
        reward: f64,
        terminated: bool,
        truncated: bool,
    },
}

/// Reason why [`ExecutionLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub steps: u64,
    /// Episodes started, including the one in progress when stopped.
    pub episodes: u64,
    pub stop: StopReason,
}

/// How an evaluation or visualization session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The loop ran until interrupted.
    Stopped(LoopOutcome),
    /// Run resolution or agent loading failed before the loop started.
    Aborted(String),
}

/// One evaluation or visualization session.
pub struct ExecutionLoop<'r> {
    registry: &'r Registry,
    env_config: EnvConfig,
}

impl<'r> ExecutionLoop<'r> {
    /// With `force_human`, the environment is constructed in human render
    /// mode regardless of the configured one.
    pub fn new(registry: &'r Registry, env_config: &EnvConfig, force_human: bool) -> Self {
        let env_config = if force_human {
            env_config.with_render_mode(RenderMode::Human)
        } else {
            env_config.clone()
        };
        Self {
            registry,
            env_config,
        }
    }

    pub fn env_config(&self) -> &EnvConfig {
        &self.env_config
    }

    /// Drive the environment until `interrupt` is raised.
    #[instrument(skip_all, fields(env = %self.env_config.kind))]
    pub fn run<F: FnMut(&LoopEvent)>(
        &self,
        source: &mut ActionSource<'_>,
        interrupt: &Interrupt,
        mut on_event: F,
    ) -> Result<LoopOutcome> {
        let mut state = LoopState::Initializing;
        let mut env = EnvHandle::new(self.registry.make_env(&self.env_config)?);
        let (mut observation, _) = env.reset()?;
        let mut episodes = 1u64;
        on_event(&LoopEvent::Reset { episode: episodes });
        state = advance(state, LoopInput::Initialized)?;
        info!("execution loop running");

        let mut steps = 0u64;
        loop {
            if interrupt.is_raised() {
                state = advance(state, LoopInput::Interrupted)?;
                break;
            }

            let action = source.next_action(&observation, &*env)?;
            let result = env.step(&action)?;
            steps += 1;
            env.render()?;
            on_event(&LoopEvent::Step {
                step: steps,
                reward: result.reward,
                terminated: result.terminated,
                truncated: result.truncated,
            });

            state = advance(
                state,
                LoopInput::Stepped {
                    episode_over: result.episode_over(),
                },
            )?;
            if state == LoopState::Resetting {
                debug!(
                    steps,
                    terminated = result.terminated,
                    truncated = result.truncated,
                    "episode over; resetting"
                );
                (observation, _) = env.reset()?;
                episodes += 1;
                on_event(&LoopEvent::Reset { episode: episodes });
                state = advance(state, LoopInput::ResetDone)?;
            } else {
                observation = result.observation;
            }
        }

        debug_assert_eq!(state, LoopState::Stopped);
        env.close()?;
        info!(steps, episodes, "execution loop stopped");
        Ok(LoopOutcome {
            steps,
            episodes,
            stop: StopReason::Interrupted,
        })
    }
}

fn advance(state: LoopState, input: LoopInput) -> Result<LoopState> {
    transition(state, input)
        .ok_or_else(|| anyhow!("illegal loop transition from {state:?} on {input:?}"))
}
