//! Reward shaping wrapper for the door-reaching task.
//!
//! Replaces the wrapped environment's reward with the negative distance
//! between the grasp point and the door handle, plus a proximity bonus. The
//! observation, termination flags, and info map pass through untouched.

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::reward::{ShapingParams, shaped_reward};
use crate::core::space::BoxSpace;
use crate::core::types::{Action, InfoMap, Observation, StepResult};
use crate::env::{Environment, NamedPoints};

pub const DEFAULT_GRASP_POINT: &str = "S_grasp";
pub const DEFAULT_HANDLE_POINT: &str = "S_handle";

/// Wraps an environment and recomputes each step's reward from scene state.
pub struct RewardShaper<E> {
    inner: E,
    grasp_point: String,
    handle_point: String,
    params: ShapingParams,
    /// Whether `inner` exposes named points at all (probed once).
    has_points: bool,
}

impl<E: Environment> RewardShaper<E> {
    pub fn new(inner: E) -> Self {
        Self::with_points(
            inner,
            DEFAULT_GRASP_POINT,
            DEFAULT_HANDLE_POINT,
            ShapingParams::default(),
        )
    }

    pub fn with_points(
        inner: E,
        grasp_point: impl Into<String>,
        handle_point: impl Into<String>,
        params: ShapingParams,
    ) -> Self {
        let has_points = inner.named_points().is_some();
        if !has_points {
            debug!("environment exposes no named points; rewards pass through unshaped");
        }
        Self {
            inner,
            grasp_point: grasp_point.into(),
            handle_point: handle_point.into(),
            params,
            has_points,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Shaped reward for the current scene, or `None` when either point is
    /// unavailable.
    fn current_shaped_reward(&self) -> Result<Option<f64>> {
        if !self.has_points {
            return Ok(None);
        }
        let Some(points) = self.inner.named_points() else {
            return Ok(None);
        };
        let grasp = points
            .try_get_named_point(&self.grasp_point)
            .with_context(|| format!("read point {}", self.grasp_point))?;
        let handle = points
            .try_get_named_point(&self.handle_point)
            .with_context(|| format!("read point {}", self.handle_point))?;
        match (grasp, handle) {
            (Some(grasp), Some(handle)) => Ok(Some(shaped_reward(&grasp, &handle, &self.params))),
            _ => Ok(None),
        }
    }
}

impl<E: Environment> Environment for RewardShaper<E> {
    fn reset(&mut self) -> Result<(Observation, InfoMap)> {
        self.inner.reset()
    }

    fn step(&mut self, action: &Action) -> Result<StepResult> {
        let mut result = self.inner.step(action)?;
        match self.current_shaped_reward()? {
            Some(reward) => result.reward = reward,
            None => debug!(
                raw_reward = result.reward,
                "reference points unavailable; keeping raw reward"
            ),
        }
        Ok(result)
    }

    fn render(&mut self) -> Result<()> {
        self.inner.render()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn action_space(&self) -> &BoxSpace {
        self.inner.action_space()
    }

    fn observation_size(&self) -> usize {
        self.inner.observation_size()
    }

    fn named_points(&self) -> Option<&dyn NamedPoints> {
        self.inner.named_points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedEnv, ScriptedStep};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn env_with_raw_reward(raw: f64) -> ScriptedEnv {
        ScriptedEnv::new(vec![ScriptedStep {
            reward: raw,
            terminated: true,
            truncated: false,
        }])
    }

    #[test]
    fn close_points_replace_raw_reward_with_bonus() {
        let env = env_with_raw_reward(-42.0)
            .with_points(Some([0.0, 0.0, 0.0]), Some([0.0, 0.0, 0.05]));
        let mut shaper = RewardShaper::new(env);

        let result = shaper.step(&Action(vec![0.0])).expect("step");

        assert!(approx_eq(result.reward, 0.95), "got {}", result.reward);
        assert!(result.terminated);
        assert!(!result.truncated);
    }

    #[test]
    fn distant_points_yield_negative_distance() {
        let env = env_with_raw_reward(3.0)
            .with_points(Some([0.0, 0.0, 0.0]), Some([1.0, 0.0, 0.0]));
        let mut shaper = RewardShaper::new(env);

        let result = shaper.step(&Action(vec![0.0])).expect("step");

        assert!(approx_eq(result.reward, -1.0), "got {}", result.reward);
    }

    #[test]
    fn missing_point_keeps_raw_reward() {
        let env = env_with_raw_reward(0.25).with_points(Some([0.0, 0.0, 0.0]), None);
        let mut shaper = RewardShaper::new(env);

        let result = shaper.step(&Action(vec![0.0])).expect("step");

        assert_eq!(result.reward, 0.25);
    }

    #[test]
    fn environment_without_points_keeps_raw_reward() {
        let mut shaper = RewardShaper::new(env_with_raw_reward(-7.5));

        let result = shaper.step(&Action(vec![0.0])).expect("step");

        assert_eq!(result.reward, -7.5);
    }

    #[test]
    fn state_read_faults_propagate() {
        let env = env_with_raw_reward(1.0).with_point_fault("simulation data corrupted");
        let mut shaper = RewardShaper::new(env);

        let err = shaper.step(&Action(vec![0.0])).unwrap_err();

        assert!(format!("{err:#}").contains("simulation data corrupted"));
    }

    #[test]
    fn custom_point_names_and_params_are_used() {
        let env = env_with_raw_reward(0.0)
            .with_named_points(vec![
                ("palm".to_string(), [0.0, 0.0, 0.0]),
                ("knob".to_string(), [0.0, 0.3, 0.0]),
            ]);
        let params = ShapingParams {
            proximity_threshold: 0.5,
            proximity_bonus: 2.0,
        };
        let mut shaper = RewardShaper::with_points(env, "palm", "knob", params);

        let result = shaper.step(&Action(vec![0.0])).expect("step");

        assert!(approx_eq(result.reward, 1.7), "got {}", result.reward);
    }
}
