//! A single neuron: weights, bias, Adam state and dropout.
//!
//! # Two forward modes
//!
//! - [`Neuron::learn_output`] is used while training. The raw weighted sum is
//!   activated and then multiplied by the dropout mask, so a dropped neuron
//!   contributes nothing downstream.
//! - [`Neuron::output`] is used for inference. The mask is ignored and weights
//!   and bias are scaled by `1 - dropout_rate`, approximating the expected
//!   training-time output.
//!
//! # Learning
//!
//! [`Neuron::learn`] takes the error signal computed by the layer above (the
//! activation derivative is already folded in) and applies one Adam step to
//! the weights. A neuron dropped for the current sample stores the delta but
//! does not learn.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{Error, Result};
use crate::optim::Adam;

/// Persisted parameters of a neuron, used for checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronState {
    pub weights: Vec<f64>,
    pub m: Vec<f64>,
    pub nu: Vec<f64>,
    pub iteration: u64,
    pub bias: f64,
    pub activation: Activation,
    pub dropout_rate: f64,
}

/// A neuron owning its incoming weights.
#[derive(Debug, Clone)]
pub struct Neuron {
    weights: Vec<f64>,
    bias: f64,
    m: Vec<f64>,
    nu: Vec<f64>,
    iteration: u64,
    activation: Activation,
    dropout_rate: f64,
    dropout_mask: f64,
    delta: f64,
    optimizer: Adam,
}

impl Neuron {
    /// Creates a neuron with `num_input` connections.
    ///
    /// Weights are drawn uniformly from `[-1, 1)`, the bias from `[0, 1)`;
    /// moments start at zero and the dropout mask starts enabled.
    pub fn new<R: Rng>(
        num_input: usize,
        activation: Activation,
        dropout_rate: f64,
        optimizer: Adam,
        rng: &mut R,
    ) -> Self {
        let weights = (0..num_input).map(|_| rng.random_range(-1.0..1.0)).collect();
        let bias = rng.random::<f64>();

        Self {
            weights,
            bias,
            m: vec![0.0; num_input],
            nu: vec![0.0; num_input],
            iteration: 0,
            activation,
            dropout_rate,
            dropout_mask: 1.0,
            delta: 0.0,
            optimizer,
        }
    }

    /// Restores a neuron from persisted parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptCheckpoint`] if the weight and moment vectors
    /// differ in length or the dropout rate is outside `[0, 1)`.
    pub fn from_state(state: NeuronState, optimizer: Adam) -> Result<Self> {
        let n = state.weights.len();
        if state.m.len() != n || state.nu.len() != n {
            return Err(Error::CorruptCheckpoint(format!(
                "neuron has {n} weights but {} first and {} second moments",
                state.m.len(),
                state.nu.len()
            )));
        }
        if !(0.0..1.0).contains(&state.dropout_rate) {
            return Err(Error::CorruptCheckpoint(format!(
                "dropout rate {} outside [0, 1)",
                state.dropout_rate
            )));
        }

        Ok(Self {
            weights: state.weights,
            bias: state.bias,
            m: state.m,
            nu: state.nu,
            iteration: state.iteration,
            activation: state.activation,
            dropout_rate: state.dropout_rate,
            dropout_mask: 1.0,
            delta: 0.0,
            optimizer,
        })
    }

    /// Snapshot of the persistent parameters.
    #[must_use]
    pub fn state(&self) -> NeuronState {
        NeuronState {
            weights: self.weights.clone(),
            m: self.m.clone(),
            nu: self.nu.clone(),
            iteration: self.iteration,
            bias: self.bias,
            activation: self.activation,
            dropout_rate: self.dropout_rate,
        }
    }

    /// Sets the dropout mask from a uniform draw in `[0, 1)`.
    pub fn dropout(&mut self, random_value: f64) {
        self.dropout_mask = if random_value < self.dropout_rate {
            0.0
        } else {
            1.0
        };
    }

    /// Inference output: weights and bias scaled by `1 - dropout_rate`, mask ignored.
    #[must_use]
    pub fn output(&self, inputs: &[f64]) -> f64 {
        let keep = 1.0 - self.dropout_rate;
        let sum = self
            .weights
            .iter()
            .zip(inputs)
            .fold(self.bias * keep, |acc, (w, x)| acc + x * (w * keep));

        self.activation.apply(sum)
    }

    /// Training output: activated weighted sum multiplied by the dropout mask.
    #[must_use]
    pub fn learn_output(&self, inputs: &[f64]) -> f64 {
        let sum = self
            .weights
            .iter()
            .zip(inputs)
            .fold(self.bias, |acc, (w, x)| acc + x * w);

        self.activation.apply(sum) * self.dropout_mask
    }

    /// Stores `delta` and, unless dropped, applies one learning step.
    ///
    /// `inputs` are the activations that fed this neuron on the current sample.
    pub fn learn(&mut self, delta: f64, inputs: &[f64]) {
        self.delta = delta;

        if self.dropout_mask == 0.0 {
            return;
        }

        self.iteration += 1;
        self.optimizer.step(
            &mut self.weights,
            &mut self.m,
            &mut self.nu,
            inputs,
            delta,
            self.iteration,
        );
        self.bias = self.optimizer.bias_step(self.bias, delta);
    }

    /// Forces the dropout mask. Intended for tests and deterministic replays.
    pub fn set_dropout_mask(&mut self, enabled: bool) {
        self.dropout_mask = if enabled { 1.0 } else { 0.0 };
    }

    #[must_use]
    pub fn num_input(&self) -> usize {
        self.weights.len()
    }

    /// Weight of connection `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_input()`.
    #[must_use]
    pub fn weight(&self, i: usize) -> f64 {
        self.weights[i]
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// First moment of weight `i`.
    #[must_use]
    pub fn m(&self, i: usize) -> f64 {
        self.m[i]
    }

    /// Second moment of weight `i`.
    #[must_use]
    pub fn nu(&self, i: usize) -> f64 {
        self.nu[i]
    }

    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    #[must_use]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[must_use]
    pub fn dropout_rate(&self) -> f64 {
        self.dropout_rate
    }

    #[must_use]
    pub fn dropout_mask(&self) -> f64 {
        self.dropout_mask
    }
}

/// Dumps the weights, one `weight[i]: value` per line, then the bias.
impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, w) in self.weights.iter().enumerate() {
            writeln!(f, "weight[{i}]: {w}")?;
        }
        write!(f, "bias: {}", self.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn neuron(num_input: usize, activation: Activation, dropout_rate: f64) -> Neuron {
        let mut rng = StdRng::seed_from_u64(7);
        Neuron::new(num_input, activation, dropout_rate, Adam::default(), &mut rng)
    }

    #[test]
    fn construction_initializes_parameters_in_range() {
        let n = neuron(16, Activation::Identity, 0.0);
        assert_eq!(n.num_input(), 16);
        assert!((0.0..1.0).contains(&n.bias()));
        assert!(n.weights().iter().all(|w| (-1.0..1.0).contains(w)));
        assert!((0..16).all(|i| n.m(i) == 0.0 && n.nu(i) == 0.0));
        assert_eq!(n.iteration(), 0);
        assert_eq!(n.dropout_mask(), 1.0);
    }

    #[test]
    fn dropout_threshold() {
        let mut n = neuron(2, Activation::Identity, 0.5);
        n.dropout(0.49);
        assert_eq!(n.dropout_mask(), 0.0);
        n.dropout(0.5);
        assert_eq!(n.dropout_mask(), 1.0);
    }

    #[test]
    fn output_scales_by_keep_probability() {
        let state = NeuronState {
            weights: vec![2.0, -1.0],
            m: vec![0.0; 2],
            nu: vec![0.0; 2],
            iteration: 0,
            bias: 0.5,
            activation: Activation::Identity,
            dropout_rate: 0.25,
        };
        let mut n = Neuron::from_state(state, Adam::default()).unwrap();
        let x = [1.0, 3.0];

        // (0.5 + 2 - 3) * 0.75
        assert!((n.output(&x) + 0.375).abs() < 1e-12);
        assert!((n.learn_output(&x) + 0.5).abs() < 1e-12);

        n.set_dropout_mask(false);
        assert_eq!(n.learn_output(&x), 0.0);
        assert!((n.output(&x) + 0.375).abs() < 1e-12);
    }

    #[test]
    fn display_lists_weights() {
        let n = neuron(2, Activation::Identity, 0.0);
        let dump = n.to_string();
        assert!(dump.starts_with("weight[0]: "));
        assert!(dump.contains("weight[1]: "));
        assert!(dump.ends_with(&format!("bias: {}", n.bias())));
    }

    #[test]
    fn from_state_rejects_ragged_moments() {
        let state = NeuronState {
            weights: vec![0.1, 0.2],
            m: vec![0.0],
            nu: vec![0.0, 0.0],
            iteration: 3,
            bias: 0.0,
            activation: Activation::Tanh,
            dropout_rate: 0.0,
        };
        assert!(matches!(
            Neuron::from_state(state, Adam::default()),
            Err(Error::CorruptCheckpoint(_))
        ));
    }
}
