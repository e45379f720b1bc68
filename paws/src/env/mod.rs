//! Environment abstraction.
//!
//! The [`Environment`] trait decouples the training and execution loops from
//! the simulation backend. Tests use scripted environments that return
//! predetermined step results without running a simulation.

pub mod door;
pub mod shaper;

use std::ops::{Deref, DerefMut};

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::space::BoxSpace;
use crate::core::types::{Action, InfoMap, Observation, Position, StepResult};

/// Simulated environment driven one step at a time.
pub trait Environment {
    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<(Observation, InfoMap)>;

    /// Apply `action` and advance the simulation by one step.
    fn step(&mut self, action: &Action) -> Result<StepResult>;

    /// Emit the current frame according to the configured render mode.
    fn render(&mut self) -> Result<()>;

    /// Release backend resources. Called at most once per environment.
    fn close(&mut self) -> Result<()>;

    fn action_space(&self) -> &BoxSpace;

    /// Length of the flattened observation vector.
    fn observation_size(&self) -> usize;

    /// Access to named reference points of the simulation state, when the
    /// backend exposes them.
    fn named_points(&self) -> Option<&dyn NamedPoints> {
        None
    }
}

/// Optional capability: read named 3D reference points from simulation state.
pub trait NamedPoints {
    /// `Ok(None)` when the point is not part of this scene. `Err` is reserved
    /// for genuine faults while reading simulation state.
    fn try_get_named_point(&self, name: &str) -> Result<Option<Position>>;

    /// All point names known to the scene, in a stable order.
    fn point_names(&self) -> Vec<String>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn reset(&mut self) -> Result<(Observation, InfoMap)> {
        (**self).reset()
    }

    fn step(&mut self, action: &Action) -> Result<StepResult> {
        (**self).step(action)
    }

    fn render(&mut self) -> Result<()> {
        (**self).render()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn action_space(&self) -> &BoxSpace {
        (**self).action_space()
    }

    fn observation_size(&self) -> usize {
        (**self).observation_size()
    }

    fn named_points(&self) -> Option<&dyn NamedPoints> {
        (**self).named_points()
    }
}

/// Exclusive owner of an environment for one train/evaluate/visualize call.
///
/// The wrapped environment is closed exactly once: explicitly through
/// [`EnvHandle::close`], or on drop when an error unwinds the caller first.
pub struct EnvHandle {
    env: Box<dyn Environment>,
    closed: bool,
}

impl EnvHandle {
    pub fn new(env: Box<dyn Environment>) -> Self {
        Self { env, closed: false }
    }

    /// Close the environment and report any backend error.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        debug!("closing environment");
        self.env.close()
    }
}

impl Deref for EnvHandle {
    type Target = dyn Environment;

    fn deref(&self) -> &Self::Target {
        self.env.as_ref()
    }
}

impl DerefMut for EnvHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env.as_mut()
    }
}

impl Drop for EnvHandle {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!("closing environment on early exit");
        if let Err(err) = self.env.close() {
            warn!(error = %format!("{err:#}"), "failed to close environment");
        }
    }
}
