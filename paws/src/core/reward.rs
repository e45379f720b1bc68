//! Distance-based reward shaping for the door-reaching task.

use crate::core::types::{Position, distance};

/// Distance below which the proximity bonus is granted (strict comparison).
pub const PROXIMITY_THRESHOLD: f64 = 0.1;
/// Reward increment granted inside the proximity threshold.
pub const PROXIMITY_BONUS: f64 = 1.0;

/// Parameters of the shaped reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapingParams {
    pub proximity_threshold: f64,
    pub proximity_bonus: f64,
}

impl Default for ShapingParams {
    fn default() -> Self {
        Self {
            proximity_threshold: PROXIMITY_THRESHOLD,
            proximity_bonus: PROXIMITY_BONUS,
        }
    }
}

/// Negative grasp-to-handle distance plus the proximity bonus when close enough.
pub fn shaped_reward(grasp: &Position, handle: &Position, params: &ShapingParams) -> f64 {
    let distance = distance(grasp, handle);
    let mut reward = -distance;
    if distance < params.proximity_threshold {
        reward += params.proximity_bonus;
    }
    reward
}
