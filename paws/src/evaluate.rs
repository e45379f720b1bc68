//! `paws eval`: replay a trained run with deterministic agent actions.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::interrupt::Interrupt;
use crate::io::config::ExperimentConfig;
use crate::io::runs::{ResolveError, resolve_run};
use crate::looping::{ActionSource, ExecutionLoop, LoopEvent, SessionEnd};
use crate::registry::Registry;

/// Resolve the configured run, load its agent and drive it until interrupted.
pub fn evaluate(
    registry: &Registry,
    config: &ExperimentConfig,
    interrupt: &Interrupt,
) -> Result<SessionEnd> {
    let mut episode_return = 0.0;
    evaluate_with(registry, config, interrupt, |event| match event {
        LoopEvent::Reset { .. } => episode_return = 0.0,
        LoopEvent::Step {
            step,
            reward,
            terminated,
            truncated,
        } => {
            episode_return += reward;
            if *terminated || *truncated {
                info!(step, episode_return, terminated, "episode finished");
            }
        }
    })
}

/// [`evaluate`] with a caller-supplied loop observer.
#[instrument(skip_all, fields(model_dir = %config.training.model_dir.display()))]
pub fn evaluate_with<F: FnMut(&LoopEvent)>(
    registry: &Registry,
    config: &ExperimentConfig,
    interrupt: &Interrupt,
    on_event: F,
) -> Result<SessionEnd> {
    registry.check_kinds(&config.env.kind, &config.model.kind)?;
    let builder = registry.agent_builder(&config.model.kind)?;

    let artifact = match resolve_run(
        &config.training.model_dir,
        config.evaluation.run_name.as_deref(),
    )
    .and_then(|run| {
        info!(run = %run.name, "evaluating run");
        run.artifact_path()
    }) {
        Ok(path) => path,
        Err(err) => return abort_on_resolve(err),
    };

    let mut agent = match builder.load(&artifact) {
        Ok(agent) => agent,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "failed to load model");
            return Ok(SessionEnd::Aborted(format!(
                "failed to load model from {}: {err:#}",
                artifact.display()
            )));
        }
    };
    info!(policy = %agent.describe(), "model loaded");

    let looper = ExecutionLoop::new(registry, &config.env, true);
    let mut source = ActionSource::Agent {
        agent: agent.as_mut(),
        deterministic: true,
    };
    let outcome = looper.run(&mut source, interrupt, on_event)?;
    Ok(SessionEnd::Stopped(outcome))
}

/// Turn a recoverable resolution failure into an aborted session.
fn abort_on_resolve(err: anyhow::Error) -> Result<SessionEnd> {
    match err.downcast::<ResolveError>() {
        Ok(resolve) => {
            warn!(error = %resolve, "run resolution failed");
            Ok(SessionEnd::Aborted(resolve.to_string()))
        }
        Err(err) => Err(err),
    }
}
