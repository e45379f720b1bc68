//! Shared value types passed between environments, agents, and loops.
//!
//! Observations and actions are opaque to the orchestration layers: they are
//! produced by one collaborator and handed unchanged to the next.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named 3D reference point in the simulated scene.
pub type Position = [f64; 3];

/// Auxiliary per-step diagnostics reported by an environment.
pub type InfoMap = BTreeMap<String, serde_json::Value>;

/// Observation produced by `reset` and `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    /// Flat vector of scalars.
    Vector(Vec<f64>),
    /// Named sub-vectors (goal-conditioned tasks report several).
    Dict(BTreeMap<String, Vec<f64>>),
}

impl Observation {
    /// Concatenate all components in a stable order (dict entries by key).
    pub fn flatten(&self) -> Vec<f64> {
        match self {
            Observation::Vector(values) => values.clone(),
            Observation::Dict(parts) => parts.values().flatten().copied().collect(),
        }
    }

    /// Names of the sub-vectors; empty for a flat observation.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Observation::Vector(_) => Vec::new(),
            Observation::Dict(parts) => parts.keys().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Observation::Vector(values) => values.len(),
            Observation::Dict(parts) => parts.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Action consumed by `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action(pub Vec<f64>);

impl Action {
    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

/// Outcome of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    /// Episode ended because of a task-defined condition.
    pub terminated: bool,
    /// Episode ended because of an external limit (e.g. step count).
    pub truncated: bool,
    pub info: InfoMap,
}

impl StepResult {
    /// True when the episode ended for either reason.
    pub fn episode_over(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Euclidean distance between two reference points.
pub fn distance(a: &Position, b: &Position) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_observation_flattens_in_key_order() {
        let mut parts = BTreeMap::new();
        parts.insert("handle".to_string(), vec![4.0, 5.0, 6.0]);
        parts.insert("door".to_string(), vec![0.5]);
        let obs = Observation::Dict(parts);

        assert_eq!(obs.flatten(), vec![0.5, 4.0, 5.0, 6.0]);
        assert_eq!(obs.keys(), vec!["door", "handle"]);
        assert_eq!(obs.len(), 4);
    }

    #[test]
    fn vector_observation_has_no_keys() {
        let obs = Observation::Vector(vec![1.0, 2.0]);
        assert!(obs.keys().is_empty());
        assert_eq!(obs.flatten(), vec![1.0, 2.0]);
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]), 5.0);
        assert_eq!(distance(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn episode_over_covers_both_end_reasons() {
        let mut result = StepResult {
            observation: Observation::Vector(Vec::new()),
            reward: 0.0,
            terminated: false,
            truncated: false,
            info: InfoMap::new(),
        };
        assert!(!result.episode_over());
        result.truncated = true;
        assert!(result.episode_over());
        result.truncated = false;
        result.terminated = true;
        assert!(result.episode_over());
    }
}
