//! `paws visualize`: watch the environment under random actions.

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::instrument;

use crate::interrupt::Interrupt;
use crate::io::config::ExperimentConfig;
use crate::looping::{ActionSource, ExecutionLoop, LoopEvent, SessionEnd};
use crate::registry::Registry;

/// Drive the environment with uniformly sampled actions in human render mode
/// until interrupted. Rewards are not consumed.
pub fn visualize(
    registry: &Registry,
    config: &ExperimentConfig,
    interrupt: &Interrupt,
) -> Result<SessionEnd> {
    visualize_with(registry, config, interrupt, |_| {})
}

/// [`visualize`] with a caller-supplied loop observer.
#[instrument(skip_all, fields(env = %config.env.kind))]
pub fn visualize_with<F: FnMut(&LoopEvent)>(
    registry: &Registry,
    config: &ExperimentConfig,
    interrupt: &Interrupt,
    on_event: F,
) -> Result<SessionEnd> {
    let rng = match config.env.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let looper = ExecutionLoop::new(registry, &config.env, true);
    let outcome = looper.run(&mut ActionSource::Random(rng), interrupt, on_event)?;
    Ok(SessionEnd::Stopped(outcome))
}
