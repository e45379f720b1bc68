//! Test-only doubles for environments and agents.

use std::cell::RefCell;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow, bail};

use crate::agent::hill_climb;
use crate::agent::{Agent, AgentBuilder, LearnSummary};
use crate::core::space::BoxSpace;
use crate::core::types::{Action, InfoMap, Observation, Position, StepResult};
use crate::env::{Environment, NamedPoints};
use crate::io::artifact::{read_json, write_atomic};
use crate::io::config::{
    EnvConfig, EvaluationConfig, ExperimentConfig, ModelConfig, TrainingConfig,
};
use crate::registry::Registry;

/// Kind under which [`registry_with_env`] registers a scripted environment.
pub const SCRIPTED_KIND: &str = "scripted";

const DEFAULT_OBSERVATION_SIZE: usize = 3;

/// Environment calls recorded by [`ScriptedEnv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvCall {
    Reset,
    Step,
    Render,
    Close,
}

/// Shared view of everything a [`ScriptedEnv`] (and its clones) was asked to do.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Rc<RefCell<CallLogInner>>,
}

#[derive(Debug, Default)]
struct CallLogInner {
    calls: Vec<EnvCall>,
    actions: Vec<Action>,
}

impl CallLog {
    pub fn calls(&self) -> Vec<EnvCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn count(&self, call: EnvCall) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|recorded| **recorded == call)
            .count()
    }

    /// Actions passed to `step`, in order.
    pub fn actions(&self) -> Vec<Action> {
        self.inner.borrow().actions.clone()
    }

    fn record(&self, call: EnvCall) {
        self.inner.borrow_mut().calls.push(call);
    }

    fn record_action(&self, action: &Action) {
        self.inner.borrow_mut().actions.push(action.clone());
    }
}

/// Predetermined outcome of one `step` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedStep {
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

/// Environment that replays a fixed script of step results.
///
/// The script cycles: after the last entry the cursor wraps to the first.
/// An empty script yields non-terminal steps with zero reward. Clones share
/// the call log but keep their own cursor.
#[derive(Debug, Clone)]
pub struct ScriptedEnv {
    script: Vec<ScriptedStep>,
    cursor: usize,
    steps: usize,
    fail_step_at: Option<usize>,
    action_space: BoxSpace,
    observation_size: usize,
    points: Vec<(String, Position)>,
    point_fault: Option<String>,
    log: CallLog,
}

impl ScriptedEnv {
    pub fn new(script: Vec<ScriptedStep>) -> Self {
        Self {
            script,
            cursor: 0,
            steps: 0,
            fail_step_at: None,
            action_space: BoxSpace::uniform(2, -1.0, 1.0).expect("unit box"),
            observation_size: DEFAULT_OBSERVATION_SIZE,
            points: Vec::new(),
            point_fault: None,
            log: CallLog::default(),
        }
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Expose the default grasp/handle points; `None` leaves a point out.
    pub fn with_points(self, grasp: Option<Position>, handle: Option<Position>) -> Self {
        let points = [("S_grasp", grasp), ("S_handle", handle)]
            .into_iter()
            .filter_map(|(name, point)| point.map(|point| (name.to_string(), point)))
            .collect();
        self.with_named_points(points)
    }

    pub fn with_named_points(mut self, points: Vec<(String, Position)>) -> Self {
        self.points = points;
        self
    }

    /// Every point read fails with `message`.
    pub fn with_point_fault(mut self, message: &str) -> Self {
        self.point_fault = Some(message.to_string());
        self
    }

    pub fn with_action_space(mut self, space: BoxSpace) -> Self {
        self.action_space = space;
        self
    }

    /// The `n`th step call (1-based) fails after being recorded.
    pub fn fail_step_at(mut self, n: usize) -> Self {
        self.fail_step_at = Some(n);
        self
    }

    fn observation(&self) -> Observation {
        Observation::Vector(vec![0.0; self.observation_size])
    }
}

impl Environment for ScriptedEnv {
    fn reset(&mut self) -> Result<(Observation, InfoMap)> {
        self.log.record(EnvCall::Reset);
        Ok((self.observation(), InfoMap::new()))
    }

    fn step(&mut self, action: &Action) -> Result<StepResult> {
        self.log.record(EnvCall::Step);
        self.log.record_action(action);
        self.steps += 1;
        if self.fail_step_at == Some(self.steps) {
            bail!("scripted step failure at step {}", self.steps);
        }
        let scripted = match self.script.get(self.cursor) {
            Some(step) => {
                self.cursor = (self.cursor + 1) % self.script.len();
                *step
            }
            None => ScriptedStep {
                reward: 0.0,
                terminated: false,
                truncated: false,
            },
        };
        Ok(StepResult {
            observation: self.observation(),
            reward: scripted.reward,
            terminated: scripted.terminated,
            truncated: scripted.truncated,
            info: InfoMap::new(),
        })
    }

    fn render(&mut self) -> Result<()> {
        self.log.record(EnvCall::Render);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.log.record(EnvCall::Close);
        Ok(())
    }

    fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    fn observation_size(&self) -> usize {
        self.observation_size
    }

    fn named_points(&self) -> Option<&dyn NamedPoints> {
        if self.points.is_empty() && self.point_fault.is_none() {
            return None;
        }
        Some(self)
    }
}

impl NamedPoints for ScriptedEnv {
    fn try_get_named_point(&self, name: &str) -> Result<Option<Position>> {
        if let Some(message) = &self.point_fault {
            return Err(anyhow!("{message}"));
        }
        Ok(self
            .points
            .iter()
            .find(|(point, _)| point == name)
            .map(|(_, position)| *position))
    }

    fn point_names(&self) -> Vec<String> {
        self.points.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Built-in registry plus `env` under [`SCRIPTED_KIND`].
///
/// Each construction hands out a fresh clone of `env` sharing its call log.
pub fn registry_with_env(env: ScriptedEnv) -> Registry {
    let mut registry = Registry::with_builtins();
    registry.register_env(SCRIPTED_KIND, move |_: &EnvConfig| {
        Ok(Box::new(env.clone()) as Box<dyn Environment>)
    });
    registry
}

pub fn scripted_env_config() -> EnvConfig {
    EnvConfig {
        kind: SCRIPTED_KIND.to_string(),
        ..EnvConfig::default()
    }
}

/// Small `hill_climb` experiment over a scripted environment.
pub fn scripted_experiment(model_dir: &Path, timesteps: u64) -> ExperimentConfig {
    ExperimentConfig {
        env: scripted_env_config(),
        model: ModelConfig {
            kind: hill_climb::KIND.to_string(),
            net_arch: vec![4],
            seed: Some(7),
            verbose: false,
            ..ModelConfig::default()
        },
        training: TrainingConfig {
            timesteps,
            model_dir: model_dir.to_path_buf(),
        },
        evaluation: EvaluationConfig::default(),
    }
}

/// Agent that always proposes the same action and counts its calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    action: Vec<f64>,
    predictions: u64,
    deterministic_calls: u64,
    run_dir: Option<PathBuf>,
}

impl ScriptedAgent {
    pub fn new(action: Vec<f64>) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    /// Report `dir` from [`Agent::run_dir_hint`].
    pub fn with_run_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(dir.into());
        self
    }

    pub fn predictions(&self) -> u64 {
        self.predictions
    }

    pub fn deterministic_calls(&self) -> u64 {
        self.deterministic_calls
    }
}

impl Agent for ScriptedAgent {
    fn learn(
        &mut self,
        env: &mut dyn Environment,
        total_steps: u64,
        _progress: bool,
    ) -> Result<LearnSummary> {
        let mut episodes = 0;
        env.reset()?;
        for _ in 0..total_steps {
            let result = env.step(&Action(self.action.clone()))?;
            if result.episode_over() {
                episodes += 1;
                env.reset()?;
            }
        }
        Ok(LearnSummary {
            steps: total_steps,
            episodes,
            best_return: None,
        })
    }

    fn predict(&mut self, _observation: &Observation, deterministic: bool) -> Result<Action> {
        self.predictions += 1;
        if deterministic {
            self.deterministic_calls += 1;
        }
        Ok(Action(self.action.clone()))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec(&self.action).context("serialize scripted action")?;
        write_atomic(path, &body)
    }

    fn run_dir_hint(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }

    fn describe(&self) -> String {
        format!("scripted agent emitting {:?}", self.action)
    }
}

/// Hands out clones of a template [`ScriptedAgent`]; `load` restores the
/// saved action.
#[derive(Debug, Clone)]
pub struct ScriptedAgentBuilder {
    template: ScriptedAgent,
}

impl ScriptedAgentBuilder {
    pub fn new(template: ScriptedAgent) -> Self {
        Self { template }
    }
}

impl AgentBuilder for ScriptedAgentBuilder {
    fn build(&self, _config: &ModelConfig, _env: &dyn Environment) -> Result<Box<dyn Agent>> {
        Ok(Box::new(self.template.clone()))
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Agent>> {
        let action: Vec<f64> = read_json(path)?;
        Ok(Box::new(ScriptedAgent::new(action)))
    }
}

/// Set a directory's modification time to `secs` after the Unix epoch.
pub fn set_dir_mtime(dir: &Path, secs: u64) -> Result<()> {
    let file = File::open(dir).with_context(|| format!("open {}", dir.display()))?;
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .with_context(|| format!("set mtime on {}", dir.display()))
}
