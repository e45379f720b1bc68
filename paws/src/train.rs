//! `paws train`: one fixed-length learning session persisted as a run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::env::EnvHandle;
use crate::io::config::ExperimentConfig;
use crate::io::runs::{ARTIFACT_FILE_NAME, RunRecord};
use crate::registry::Registry;

/// Result of a completed training session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainOutcome {
    pub run: RunRecord,
    pub artifact_path: PathBuf,
    /// Environment steps taken by the agent.
    pub steps: u64,
}

/// Build env and agent, learn for `training.timesteps` steps and save the
/// artifact under `training.model_dir`.
///
/// The environment is closed exactly once whether or not training succeeds.
#[instrument(skip_all, fields(env = %config.env.kind, model = %config.model.kind))]
pub fn train(registry: &Registry, config: &ExperimentConfig) -> Result<TrainOutcome> {
    registry.check_kinds(&config.env.kind, &config.model.kind)?;
    let builder = registry.agent_builder(&config.model.kind)?;

    let mut env = EnvHandle::new(
        registry
            .make_env(&config.env)
            .context("construct environment")?,
    );
    let mut agent = builder
        .build(&config.model, &*env)
        .context("construct agent")?;
    info!(timesteps = config.training.timesteps, "training started");

    let summary = agent
        .learn(&mut *env, config.training.timesteps, config.model.verbose)
        .context("learn")?;
    debug!(
        episodes = summary.episodes,
        best_return = ?summary.best_return,
        "learning finished"
    );

    let run = run_for(&config.training.model_dir, agent.run_dir_hint());
    fs::create_dir_all(&run.dir).with_context(|| format!("create {}", run.dir.display()))?;
    let artifact_path = run.dir.join(ARTIFACT_FILE_NAME);
    agent
        .save(&artifact_path)
        .with_context(|| format!("save model to {}", artifact_path.display()))?;
    env.close().context("close environment")?;

    info!(path = %artifact_path.display(), steps = summary.steps, "model saved");
    Ok(TrainOutcome {
        run,
        artifact_path,
        steps: summary.steps,
    })
}

/// Run directory named after the agent's log directory, or `model_dir`
/// itself when the agent keeps none.
fn run_for(model_dir: &Path, hint: Option<&Path>) -> RunRecord {
    match hint.and_then(Path::file_name) {
        Some(name) => RunRecord::new(model_dir.join(name)),
        None => RunRecord::new(model_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::runs::resolve_run;
    use crate::agent::AgentBuilder;
    use crate::core::types::Action;
    use crate::test_support::{
        EnvCall, ScriptedAgent, ScriptedAgentBuilder, ScriptedEnv, ScriptedStep,
        registry_with_env, scripted_experiment,
    };

    fn episodes_of_three() -> ScriptedEnv {
        ScriptedEnv::new(
            (0..3)
                .map(|idx| ScriptedStep {
                    reward: 1.0,
                    terminated: idx == 2,
                    truncated: false,
                })
                .collect(),
        )
    }

    #[test]
    fn run_named_after_agent_hint() {
        assert_eq!(
            run_for(Path::new("models"), Some(Path::new("logs/exp/HILL_CLIMB_4"))),
            RunRecord {
                name: "HILL_CLIMB_4".to_string(),
                dir: PathBuf::from("models/HILL_CLIMB_4"),
            }
        );
        assert_eq!(run_for(Path::new("models"), None).dir, Path::new("models"));
        assert_eq!(
            run_for(Path::new("models"), Some(Path::new("/"))).dir,
            Path::new("models")
        );
    }

    #[test]
    fn saves_into_model_dir_without_hint() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model_dir = temp.path().join("models");
        let env = episodes_of_three();
        let log = env.log();
        let registry = registry_with_env(env);

        let outcome = train(&registry, &scripted_experiment(&model_dir, 7)).expect("train");

        assert_eq!(outcome.steps, 7);
        assert_eq!(outcome.run.dir, model_dir);
        assert_eq!(outcome.artifact_path, model_dir.join("model"));
        assert!(outcome.artifact_path.is_file());
        assert_eq!(log.count(EnvCall::Step), 7);
        assert_eq!(log.count(EnvCall::Close), 1);
        assert_eq!(log.calls().last(), Some(&EnvCall::Close));
    }

    #[test]
    fn hinted_runs_are_resolvable_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model_dir = temp.path().join("models");
        let mut config = scripted_experiment(&model_dir, 6);
        config.model.log_dir = Some(temp.path().join("logs"));
        let registry = registry_with_env(episodes_of_three());

        let first = train(&registry, &config).expect("first");
        let second = train(&registry, &config).expect("second");

        assert_eq!(first.run.name, "HILL_CLIMB_1");
        assert_eq!(second.run.name, "HILL_CLIMB_2");
        assert_eq!(second.artifact_path, model_dir.join("HILL_CLIMB_2/model"));
        let named = resolve_run(&model_dir, Some("HILL_CLIMB_1")).expect("resolve");
        assert_eq!(named, first.run);
        assert_eq!(named.artifact_path().expect("artifact"), first.artifact_path);
    }

    #[test]
    fn agent_hint_outside_model_dir_names_the_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model_dir = temp.path().join("models");
        let env = episodes_of_three();
        let log = env.log();
        let mut registry = registry_with_env(env);
        let agent = ScriptedAgent::new(vec![0.5, -0.5])
            .with_run_dir(temp.path().join("elsewhere/exp/custom_7"));
        registry.register_agent("scripted", ScriptedAgentBuilder::new(agent));
        let mut config = scripted_experiment(&model_dir, 5);
        config.model.kind = "scripted".to_string();

        let outcome = train(&registry, &config).expect("train");

        assert_eq!(outcome.run.name, "custom_7");
        assert_eq!(outcome.artifact_path, model_dir.join("custom_7/model"));
        assert_eq!(log.actions(), vec![Action(vec![0.5, -0.5]); 5]);
        assert_eq!(log.count(EnvCall::Reset), 2);
        let loaded = ScriptedAgentBuilder::new(ScriptedAgent::default())
            .load(&outcome.artifact_path)
            .expect("load");
        assert!(loaded.describe().contains("[0.5, -0.5]"));
        assert!(!temp.path().join("elsewhere").exists());
    }

    #[test]
    fn learning_fault_closes_environment_and_saves_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model_dir = temp.path().join("models");
        let env = episodes_of_three().fail_step_at(4);
        let log = env.log();
        let registry = registry_with_env(env);

        let err = train(&registry, &scripted_experiment(&model_dir, 10)).unwrap_err();

        assert!(format!("{err:#}").contains("scripted step failure"));
        assert_eq!(log.count(EnvCall::Close), 1);
        assert!(!model_dir.exists());
    }

    #[test]
    fn unknown_kind_fails_before_constructing_anything() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model_dir = temp.path().join("models");
        let env = episodes_of_three();
        let log = env.log();
        let registry = registry_with_env(env);
        let mut config = scripted_experiment(&model_dir, 5);
        config.model.kind = "ppo".to_string();

        let err = train(&registry, &config).unwrap_err();

        assert!(err.to_string().contains("unknown model kind 'ppo'"));
        assert!(log.calls().is_empty());
        assert!(!model_dir.exists());
    }
}
