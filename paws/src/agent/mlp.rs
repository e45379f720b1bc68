//! Small dense policy network with a tanh-squashed output.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::io::config::Activation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Layer {
    inputs: usize,
    outputs: usize,
    /// Row-major `outputs x inputs`.
    weights: Vec<f64>,
    bias: Vec<f64>,
}

impl Layer {
    fn new<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let scale = 1.0 / (inputs.max(1) as f64).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_range(-scale..=scale))
            .collect();
        Self {
            inputs,
            outputs,
            weights,
            bias: vec![0.0; outputs],
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        (0..self.outputs)
            .map(|row| {
                let weights = &self.weights[row * self.inputs..(row + 1) * self.inputs];
                self.bias[row]
                    + weights
                        .iter()
                        .zip(input)
                        .map(|(w, x)| w * x)
                        .sum::<f64>()
            })
            .collect()
    }

    fn is_consistent(&self) -> bool {
        self.weights.len() == self.inputs * self.outputs && self.bias.len() == self.outputs
    }
}

/// Multi-layer perceptron mapping observations to actions in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Layer>,
    activation: Activation,
}

impl Mlp {
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        hidden: &[usize],
        outputs: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let mut widths = Vec::with_capacity(hidden.len() + 2);
        widths.push(inputs);
        widths.extend_from_slice(hidden);
        widths.push(outputs);
        let layers = widths
            .windows(2)
            .map(|pair| Layer::new(pair[0], pair[1], rng))
            .collect();
        Self { layers, activation }
    }

    pub fn inputs(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.inputs)
    }

    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.outputs)
    }

    pub fn hidden(&self) -> Vec<usize> {
        let count = self.layers.len().saturating_sub(1);
        self.layers[..count].iter().map(|layer| layer.outputs).collect()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn param_count(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.weights.len() + layer.bias.len())
            .sum()
    }

    /// Shapes chain correctly from input to output.
    pub fn is_consistent(&self) -> bool {
        !self.layers.is_empty()
            && self.layers.iter().all(Layer::is_consistent)
            && self
                .layers
                .windows(2)
                .all(|pair| pair[0].outputs == pair[1].inputs)
    }

    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let last = self.layers.len().saturating_sub(1);
        let mut values = input.to_vec();
        for (idx, layer) in self.layers.iter().enumerate() {
            values = layer.forward(&values);
            if idx == last {
                values.iter_mut().for_each(|v| *v = v.tanh());
            } else {
                values.iter_mut().for_each(|v| *v = activate(self.activation, *v));
            }
        }
        values
    }

    /// Copy with independent Gaussian noise added to every parameter.
    pub fn perturbed<R: Rng + ?Sized>(&self, std: f64, rng: &mut R) -> Self {
        let mut next = self.clone();
        for layer in &mut next.layers {
            for value in layer.weights.iter_mut().chain(layer.bias.iter_mut()) {
                *value += std * gaussian(rng);
            }
        }
        next
    }
}

fn activate(activation: Activation, value: f64) -> f64 {
    match activation {
        Activation::Relu => value.max(0.0),
        Activation::Tanh => value.tanh(),
    }
}

/// Standard normal sample (Box-Muller).
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn shapes_follow_architecture() {
        let mut rng = StdRng::seed_from_u64(1);
        let mlp = Mlp::new(7, &[16, 8], 4, Activation::Relu, &mut rng);

        assert_eq!(mlp.inputs(), 7);
        assert_eq!(mlp.hidden(), vec![16, 8]);
        assert_eq!(mlp.outputs(), 4);
        assert_eq!(mlp.param_count(), 7 * 16 + 16 + 16 * 8 + 8 + 8 * 4 + 4);
        assert!(mlp.is_consistent());
    }

    #[test]
    fn outputs_are_squashed() {
        let mut rng = StdRng::seed_from_u64(2);
        let mlp = Mlp::new(3, &[4], 2, Activation::Tanh, &mut rng).perturbed(50.0, &mut rng);

        let out = mlp.forward(&[100.0, -100.0, 3.0]);

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn zero_noise_perturbation_is_identity() {
        let mut rng = StdRng::seed_from_u64(3);
        let mlp = Mlp::new(2, &[3], 1, Activation::Relu, &mut rng);
        assert_eq!(mlp.perturbed(0.0, &mut rng), mlp);
    }

    #[test]
    fn gaussian_samples_are_centered() {
        let mut rng = StdRng::seed_from_u64(4);
        let n = 20_000;
        let mean = (0..n).map(|_| gaussian(&mut rng)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean={mean}");
    }
}
