//! dae: a denoising autoencoder with neuron-parallel training.
//!
//! A two-layer network (middle/hidden, output) learns to reconstruct clean
//! samples from corrupted copies. Every neuron carries its own Adam state and
//! dropout mask; the training loop processes one sample at a time and splits
//! each layer's neurons across a fixed pool of worker threads.
//!
//! # Modules
//!
//! - [`activation`]: identity, sigmoid, tanh and relu with their derivatives.
//! - [`optim`]: Adam hyperparameters and the per-neuron update step.
//! - [`neuron`]: a single neuron: forward modes, dropout, learning, checkpoint state.
//! - [`autoencoder`]: topology, the phase-by-phase training loop, inference.
//! - [`partition`]: disjoint per-worker neuron ranges.
//! - [`modelio`]: JSON checkpoints of a trained network.
//!
//! # Example
//!
//! ```rust
//! use dae::{Config, DenoisingAutoencoder};
//!
//! let config = Config { max_trial: 20, ..Config::default() };
//! let mut ae = DenoisingAutoencoder::with_config(4, 0.5, config)?;
//!
//! let clean = vec![vec![1.0, 0.0, 1.0, 0.0]];
//! let noisy = vec![vec![0.9, 0.1, 1.0, 0.0]];
//! let report = ae.learn(&clean, &noisy)?;
//! println!("{report}");
//!
//! let reconstructed = ae.out(&noisy[0], false)?;
//! assert_eq!(reconstructed.len(), 4);
//! # Ok::<(), dae::Error>(())
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::cast_precision_loss, clippy::similar_names)]

pub mod activation;
pub mod autoencoder;
pub mod error;
pub mod modelio;
pub mod neuron;
pub mod optim;
pub mod partition;

pub use activation::Activation;
pub use autoencoder::{DenoisingAutoencoder, TrainReport};
pub use error::{Error, Result};
pub use neuron::{Neuron, NeuronState};
pub use optim::Adam;

/// Tuning constants for an autoencoder, fixed at construction.
///
/// The defaults reproduce the classic setup: 300 passes, a 0.1 tolerance,
/// identity activations and no dropout.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of passes over the dataset.
    pub max_trial: usize,
    /// Largest absolute reconstruction error accepted as converged.
    pub max_gap: f64,
    /// Optimizer hyperparameters shared by every neuron.
    pub adam: Adam,
    pub middle_activation: Activation,
    pub output_activation: Activation,
    pub middle_dropout_rate: f64,
    pub output_dropout_rate: f64,
    /// Worker threads; `None` uses the host's available parallelism.
    pub num_threads: Option<usize>,
    /// Seed of the generator used for initialization and dropout draws.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_trial: 300,
            max_gap: 0.1,
            adam: Adam::default(),
            middle_activation: Activation::Identity,
            output_activation: Activation::Identity,
            middle_dropout_rate: 0.0,
            output_dropout_rate: 0.0,
            num_threads: None,
            seed: 0,
        }
    }
}

impl Config {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("middle_dropout_rate", self.middle_dropout_rate),
            ("output_dropout_rate", self.output_dropout_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..1.0).contains(&rate) {
                return Err(Error::InvalidConfig(format!("{name} {rate} outside [0, 1)")));
            }
        }
        if !(self.max_gap.is_finite() && self.max_gap >= 0.0) {
            return Err(Error::InvalidConfig(format!("max_gap {}", self.max_gap)));
        }
        if !(self.adam.alpha.is_finite() && self.adam.alpha > 0.0) {
            return Err(Error::InvalidConfig(format!("alpha {}", self.adam.alpha)));
        }
        let decays = [("beta1", self.adam.beta1), ("beta2", self.adam.beta2)];
        for (name, beta) in decays {
            if !(0.0..1.0).contains(&beta) {
                return Err(Error::InvalidConfig(format!("{name} {beta} outside [0, 1)")));
            }
        }
        if !(self.adam.epsilon.is_finite() && self.adam.epsilon > 0.0) {
            return Err(Error::InvalidConfig(format!("epsilon {}", self.adam.epsilon)));
        }
        if !(self.adam.rambda.is_finite() && self.adam.rambda >= 0.0) {
            return Err(Error::InvalidConfig(format!("rambda {}", self.adam.rambda)));
        }
        if self.num_threads == Some(0) {
            return Err(Error::InvalidConfig("num_threads must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_full_dropout() {
        let config = Config {
            middle_dropout_rate: 1.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_threads() {
        let config = Config {
            num_threads: Some(0),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    fn with_adam(adam: Adam) -> Config {
        Config {
            adam,
            ..Config::default()
        }
    }

    #[test]
    fn rejects_unit_moment_decay() {
        for adam in [
            Adam { beta1: 1.0, ..Adam::default() },
            Adam { beta2: 1.0, ..Adam::default() },
            Adam { beta1: -0.1, ..Adam::default() },
            Adam { beta2: f64::NAN, ..Adam::default() },
        ] {
            assert!(
                matches!(with_adam(adam).validate(), Err(Error::InvalidConfig(_))),
                "{adam:?}"
            );
        }
    }

    #[test]
    fn rejects_non_positive_epsilon() {
        for epsilon in [0.0, -1e-8, f64::INFINITY, f64::NAN] {
            let config = with_adam(Adam { epsilon, ..Adam::default() });
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{epsilon}");
        }
    }

    #[test]
    fn rejects_bad_rambda() {
        for rambda in [-1e-5, f64::INFINITY, f64::NAN] {
            let config = with_adam(Adam { rambda, ..Adam::default() });
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))), "{rambda}");
        }
        assert!(with_adam(Adam { rambda: 0.0, ..Adam::default() }).validate().is_ok());
    }

    #[test]
    fn unit_beta_is_rejected_before_construction() {
        let config = Config {
            max_trial: 2,
            adam: Adam { beta1: 1.0, ..Adam::default() },
            ..Config::default()
        };
        assert!(matches!(
            DenoisingAutoencoder::with_config(2, 0.5, config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
