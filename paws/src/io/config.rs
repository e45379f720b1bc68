//! Experiment configuration loaded from a TOML file.
//!
//! ```toml
//! [env]
//! kind = "door_reach"
//! render_mode = "none"
//! render_fps = 20.0          # pacing of "human" frames
//!
//! [env.shaping]            # presence wraps the environment in RewardShaper
//!
//! [model]
//! kind = "hill_climb"
//! log_dir = "logs"
//!
//! [training]
//! timesteps = 100000
//! model_dir = "models/door"
//!
//! [evaluation]
//! run_name = "HILL_CLIMB_1"  # optional; latest run when omitted
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::reward::{PROXIMITY_BONUS, PROXIMITY_THRESHOLD, ShapingParams};
use crate::env::shaper::{DEFAULT_GRASP_POINT, DEFAULT_HANDLE_POINT};

/// Full experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentConfig {
    pub env: EnvConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// How frames are presented by `render`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    None,
    Human,
}

/// Default `human` frame rate: one frame per simulated `door_reach` step.
pub const DEFAULT_RENDER_FPS: f64 = 20.0;

/// Environment construction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvConfig {
    /// Registry tag of the environment backend.
    pub kind: String,
    pub render_mode: RenderMode,
    /// Episodes are truncated after this many steps.
    pub max_episode_steps: u32,
    /// Frame rate that `human` rendering is paced to.
    pub render_fps: f64,
    pub seed: Option<u64>,
    /// Wrap the environment in `RewardShaper` when present.
    pub shaping: Option<ShapingConfig>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            kind: String::new(),
            render_mode: RenderMode::None,
            max_episode_steps: 200,
            render_fps: DEFAULT_RENDER_FPS,
            seed: None,
            shaping: None,
        }
    }
}

impl EnvConfig {
    /// Copy with the render mode replaced.
    ///
    /// This is the only adjustment made to a loaded configuration, applied
    /// before the environment is constructed.
    pub fn with_render_mode(&self, render_mode: RenderMode) -> Self {
        Self {
            render_mode,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShapingConfig {
    pub grasp_point: String,
    pub handle_point: String,
    pub proximity_threshold: f64,
    pub proximity_bonus: f64,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            grasp_point: DEFAULT_GRASP_POINT.to_string(),
            handle_point: DEFAULT_HANDLE_POINT.to_string(),
            proximity_threshold: PROXIMITY_THRESHOLD,
            proximity_bonus: PROXIMITY_BONUS,
        }
    }
}

impl ShapingConfig {
    pub fn params(&self) -> ShapingParams {
        ShapingParams {
            proximity_threshold: self.proximity_threshold,
            proximity_bonus: self.proximity_bonus,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
}

/// Agent construction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Registry tag of the agent implementation.
    pub kind: String,
    pub experiment_name: String,
    /// Root for per-run progress logs. No run directory is allocated when unset.
    pub log_dir: Option<PathBuf>,
    /// Hidden layer widths of the policy network.
    pub net_arch: Vec<usize>,
    pub activation: Activation,
    /// Standard deviation of parameter perturbations and exploration noise.
    pub noise_std: f64,
    pub seed: Option<u64>,
    pub verbose: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: String::new(),
            experiment_name: "default_experiment".to_string(),
            log_dir: None,
            net_arch: vec![256, 256],
            activation: Activation::Relu,
            noise_std: 0.1,
            seed: None,
            verbose: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainingConfig {
    /// Environment interaction steps per training session.
    pub timesteps: u64,
    /// Root directory holding one sub-directory per run.
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Run to evaluate; the most recently modified run when unset.
    pub run_name: Option<String>,
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.env.kind.trim().is_empty() {
            return Err(anyhow!("env.kind must be non-empty"));
        }
        if self.env.max_episode_steps == 0 {
            return Err(anyhow!("env.max_episode_steps must be > 0"));
        }
        if !self.env.render_fps.is_finite() || self.env.render_fps <= 0.0 {
            return Err(anyhow!("env.render_fps must be a positive number"));
        }
        if let Some(shaping) = &self.env.shaping {
            if shaping.grasp_point.trim().is_empty() || shaping.handle_point.trim().is_empty() {
                return Err(anyhow!("env.shaping point names must be non-empty"));
            }
            if shaping.proximity_threshold.is_nan() || shaping.proximity_threshold < 0.0 {
                return Err(anyhow!("env.shaping.proximity_threshold must be >= 0"));
            }
        }
        if self.model.kind.trim().is_empty() {
            return Err(anyhow!("model.kind must be non-empty"));
        }
        if self.model.experiment_name.trim().is_empty() {
            return Err(anyhow!("model.experiment_name must be non-empty"));
        }
        if self.model.net_arch.contains(&0) {
            return Err(anyhow!("model.net_arch layer widths must be > 0"));
        }
        if self.model.noise_std.is_nan() || self.model.noise_std < 0.0 {
            return Err(anyhow!("model.noise_std must be >= 0"));
        }
        if self.training.timesteps == 0 {
            return Err(anyhow!("training.timesteps must be >= 1"));
        }
        if self.training.model_dir.as_os_str().is_empty() {
            return Err(anyhow!("training.model_dir must be non-empty"));
        }
        if let Some(run_name) = &self.evaluation.run_name {
            validate_run_name(run_name)?;
        }
        Ok(())
    }
}

/// Run names address a single directory directly under `model_dir`.
fn validate_run_name(run_name: &str) -> Result<()> {
    let path = Path::new(run_name);
    let single_component = path.components().count() == 1 && path.file_name().is_some();
    if run_name.trim().is_empty() || !single_component {
        return Err(anyhow!(
            "evaluation.run_name must be a single directory name, got '{run_name}'"
        ));
    }
    Ok(())
}

/// Load and validate an experiment config from a TOML file.
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parse {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<ExperimentConfig> {
    let cfg: ExperimentConfig = toml::from_str(contents)?;
    cfg.validate()?;
    Ok(cfg)
}
