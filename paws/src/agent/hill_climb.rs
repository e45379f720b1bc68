//! Built-in `hill_climb` agent: episodic random-search over MLP parameters.
//!
//! Every episode runs a Gaussian perturbation of the best parameters found so
//! far. A finished episode whose return matches or beats the best return
//! replaces them. The first episode scores the initial parameters.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::agent::mlp::{Mlp, gaussian};
use crate::agent::{Agent, AgentBuilder, LearnSummary};
use crate::core::space::BoxSpace;
use crate::core::types::{Action, Observation};
use crate::env::Environment;
use crate::io::artifact::{read_json, write_json_atomic};
use crate::io::config::ModelConfig;
use crate::io::progress_log::{EpisodeRecord, ProgressLog, allocate_run_dir};

pub const KIND: &str = "hill_climb";
/// Prefix of per-run log directories (`HILL_CLIMB_<n>`).
pub const RUN_PREFIX: &str = "HILL_CLIMB";
const FORMAT_VERSION: u32 = 1;

/// On-disk artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Artifact {
    kind: String,
    format_version: u32,
    hyperparameters: ModelConfig,
    action_space: BoxSpace,
    best_return: Option<f64>,
    trained_steps: u64,
    policy: Mlp,
}

pub struct HillClimbAgent {
    config: ModelConfig,
    action_space: BoxSpace,
    policy: Mlp,
    best_return: Option<f64>,
    trained_steps: u64,
    rng: StdRng,
    run_dir: Option<PathBuf>,
}

impl HillClimbAgent {
    pub fn new(config: &ModelConfig, env: &dyn Environment) -> Result<Self> {
        let observation_size = env.observation_size();
        if observation_size == 0 {
            bail!("{KIND}: environment reports an empty observation");
        }
        let action_space = env.action_space().clone();
        let mut rng = seeded_rng(config.seed);
        let policy = Mlp::new(
            observation_size,
            &config.net_arch,
            action_space.dim(),
            config.activation,
            &mut rng,
        );
        Ok(Self {
            config: config.clone(),
            action_space,
            policy,
            best_return: None,
            trained_steps: 0,
            rng,
            run_dir: None,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let artifact: Artifact = read_json(path)?;
        if artifact.kind != KIND {
            bail!(
                "artifact {} holds a '{}' agent, expected '{KIND}'",
                path.display(),
                artifact.kind
            );
        }
        if artifact.format_version != FORMAT_VERSION {
            bail!(
                "artifact {} has format version {}, expected {FORMAT_VERSION}",
                path.display(),
                artifact.format_version
            );
        }
        let shapes_match = artifact.policy.outputs() == artifact.action_space.dim();
        if !artifact.policy.is_consistent() || !shapes_match {
            bail!("artifact {} has inconsistent policy shapes", path.display());
        }
        debug!(path = %path.display(), trained_steps = artifact.trained_steps, "loaded agent");
        Ok(Self {
            rng: seeded_rng(artifact.hyperparameters.seed),
            config: artifact.hyperparameters,
            action_space: artifact.action_space,
            policy: artifact.policy,
            best_return: artifact.best_return,
            trained_steps: artifact.trained_steps,
            run_dir: None,
        })
    }

    pub fn best_return(&self) -> Option<f64> {
        self.best_return
    }

    pub fn trained_steps(&self) -> u64 {
        self.trained_steps
    }

    fn act(&self, policy: &Mlp, observation: &Observation) -> Result<Action> {
        let input = observation.flatten();
        if input.len() != policy.inputs() {
            bail!(
                "observation has {} values, policy expects {}",
                input.len(),
                policy.inputs()
            );
        }
        let squashed = policy.forward(&input);
        let values = squashed
            .iter()
            .zip(self.action_space.low().iter().zip(self.action_space.high()))
            .map(|(out, (lo, hi))| lo + (out + 1.0) / 2.0 * (hi - lo))
            .collect();
        Ok(Action(values))
    }
}

impl Agent for HillClimbAgent {
    #[instrument(skip_all, fields(total_steps = total_steps))]
    fn learn(
        &mut self,
        env: &mut dyn Environment,
        total_steps: u64,
        progress: bool,
    ) -> Result<LearnSummary> {
        let log = match &self.config.log_dir {
            Some(root) => {
                let dir = allocate_run_dir(root, &self.config.experiment_name, RUN_PREFIX)?;
                let log = ProgressLog::new(&dir);
                self.run_dir = Some(dir);
                Some(log)
            }
            None => None,
        };

        let mut steps_done = 0u64;
        let mut episodes = 0u64;
        while steps_done < total_steps {
            let candidate = match self.best_return {
                None => self.policy.clone(),
                Some(_) => self.policy.perturbed(self.config.noise_std, &mut self.rng),
            };

            let (mut observation, _) = env.reset()?;
            let mut episode_return = 0.0;
            let mut episode_steps = 0u64;
            let mut finished = false;
            while steps_done < total_steps {
                let action = self.act(&candidate, &observation)?;
                let result = env.step(&action)?;
                steps_done += 1;
                episode_steps += 1;
                episode_return += result.reward;
                observation = result.observation;
                if result.terminated || result.truncated {
                    finished = true;
                    break;
                }
            }
            if !finished {
                debug!(episode_steps, "step budget exhausted mid-episode; not scored");
                break;
            }

            episodes += 1;
            let accepted = self.best_return.is_none_or(|best| episode_return >= best);
            if accepted {
                self.policy = candidate;
                self.best_return = Some(episode_return);
            }
            let best_return = self.best_return.unwrap_or(episode_return);
            if progress {
                info!(
                    episode = episodes,
                    steps_done,
                    total_steps,
                    episode_return,
                    best_return,
                    accepted,
                    "episode finished"
                );
            }
            if let Some(log) = &log {
                log.append(&EpisodeRecord {
                    episode: episodes,
                    steps_done,
                    episode_steps,
                    episode_return,
                    best_return,
                    accepted,
                })?;
            }
        }

        self.trained_steps += steps_done;
        Ok(LearnSummary {
            steps: steps_done,
            episodes,
            best_return: self.best_return,
        })
    }

    fn predict(&mut self, observation: &Observation, deterministic: bool) -> Result<Action> {
        let action = self.act(&self.policy, observation)?;
        if deterministic || self.config.noise_std == 0.0 {
            return Ok(action);
        }
        let noisy = action
            .values()
            .iter()
            .map(|value| value + self.config.noise_std * gaussian(&mut self.rng))
            .collect();
        Ok(self.action_space.clip(&Action(noisy)))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let artifact = Artifact {
            kind: KIND.to_string(),
            format_version: FORMAT_VERSION,
            hyperparameters: self.config.clone(),
            action_space: self.action_space.clone(),
            best_return: self.best_return,
            trained_steps: self.trained_steps,
            policy: self.policy.clone(),
        };
        write_json_atomic(path, &artifact)
    }

    fn run_dir_hint(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }

    fn describe(&self) -> String {
        format!(
            "{KIND} policy: obs({}) -> hidden {:?} ({:?}) -> action({}) tanh; {} parameters; noise_std={}",
            self.policy.inputs(),
            self.policy.hidden(),
            self.policy.activation(),
            self.policy.outputs(),
            self.policy.param_count(),
            self.config.noise_std
        )
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Registry entry for [`HillClimbAgent`].
pub struct HillClimbBuilder;

impl AgentBuilder for HillClimbBuilder {
    fn build(&self, config: &ModelConfig, env: &dyn Environment) -> Result<Box<dyn Agent>> {
        Ok(Box::new(HillClimbAgent::new(config, env)?))
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Agent>> {
        Ok(Box::new(HillClimbAgent::load(path)?))
    }
}
