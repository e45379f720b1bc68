//! Continuous action spaces.

use anyhow::{Result, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::Action;

/// Axis-aligned box of valid actions, one `[low, high]` interval per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl BoxSpace {
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Result<Self> {
        if low.len() != high.len() {
            bail!(
                "action space bounds differ in length: low={} high={}",
                low.len(),
                high.len()
            );
        }
        if low.is_empty() {
            bail!("action space must have at least one dimension");
        }
        if let Some(idx) = low
            .iter()
            .zip(&high)
            .position(|(lo, hi)| lo.is_nan() || hi.is_nan() || lo > hi)
        {
            bail!(
                "action space bound {} is inverted: low={} high={}",
                idx,
                low[idx],
                high[idx]
            );
        }
        Ok(Self { low, high })
    }

    /// Space with identical bounds on every component.
    pub fn uniform(dim: usize, low: f64, high: f64) -> Result<Self> {
        Self::new(vec![low; dim], vec![high; dim])
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Uniform random action inside the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        let values = self
            .low
            .iter()
            .zip(&self.high)
            .map(|(&lo, &hi)| if lo == hi { lo } else { rng.gen_range(lo..=hi) })
            .collect();
        Action(values)
    }

    /// Clamp every component into its interval. Missing components are filled
    /// with the interval midpoint; surplus components are dropped.
    pub fn clip(&self, action: &Action) -> Action {
        let values = self
            .low
            .iter()
            .zip(&self.high)
            .enumerate()
            .map(|(idx, (&lo, &hi))| match action.0.get(idx) {
                Some(value) => value.clamp(lo, hi),
                None => (lo + hi) / 2.0,
            })
            .collect();
        Action(values)
    }

    pub fn contains(&self, action: &Action) -> bool {
        action.0.len() == self.dim()
            && action
                .0
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(value, (lo, hi))| lo <= value && value <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn samples_stay_inside_bounds() {
        let space = BoxSpace::new(vec![-1.0, 0.0, 2.0], vec![1.0, 0.5, 2.0]).expect("space");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let action = space.sample(&mut rng);
            assert!(space.contains(&action), "{action:?}");
        }
    }

    #[test]
    fn clip_clamps_and_pads() {
        let space = BoxSpace::uniform(3, -1.0, 1.0).expect("space");
        let clipped = space.clip(&Action(vec![5.0, -3.0]));
        assert_eq!(clipped, Action(vec![1.0, -1.0, 0.0]));
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = BoxSpace::new(vec![1.0], vec![0.0]).unwrap_err();
        assert!(err.to_string().contains("inverted"));
    }

    #[test]
    fn rejects_mismatched_bounds() {
        let err = BoxSpace::new(vec![0.0, 0.0], vec![1.0]).unwrap_err();
        assert!(err.to_string().contains("differ in length"));
    }
}
