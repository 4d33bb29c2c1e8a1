//! Adam optimizer for a single neuron's parameters.
//!
//! Weights follow the usual Adam rule with bias-corrected moments. The bias
//! is not Adam-managed: it takes a plain gradient step with an L2 term
//! scaled by `rambda`.

use serde::{Deserialize, Serialize};

/// Adam hyperparameters.
///
/// # Defaults
///
/// - alpha = 0.001
/// - beta1 = 0.9
/// - beta2 = 0.999
/// - epsilon = 1e-8
/// - rambda = 1e-5
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    /// Step size.
    pub alpha: f64,
    /// Decay rate of the first moment.
    pub beta1: f64,
    /// Decay rate of the second moment.
    pub beta2: f64,
    /// Floor added to the denominator.
    pub epsilon: f64,
    /// L2 coefficient on the bias.
    pub rambda: f64,
}

impl Default for Adam {
    fn default() -> Self {
        Self {
            alpha: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            rambda: 1e-5,
        }
    }
}

impl Adam {
    /// Performs one Adam step on `weights` for the error signal `delta`.
    ///
    /// # Arguments
    ///
    /// - `weights`: parameters to update, one per input
    /// - `m`: first moment estimate (same length as `weights`)
    /// - `nu`: second moment estimate (same length as `weights`)
    /// - `inputs`: upstream activations; the gradient of weight `i` is `delta * inputs[i]`
    /// - `t`: timestep after incrementing (1-based)
    pub fn step(
        &self,
        weights: &mut [f64],
        m: &mut [f64],
        nu: &mut [f64],
        inputs: &[f64],
        delta: f64,
        t: u64,
    ) {
        let t = t as f64;
        let m_correction = 1.0 - self.beta1.powf(t);
        let nu_correction = 1.0 - self.beta2.powf(t);

        #[allow(clippy::suspicious_operation_groupings)]
        for ((w, x), (m_val, nu_val)) in weights
            .iter_mut()
            .zip(inputs.iter())
            .zip(m.iter_mut().zip(nu.iter_mut()))
        {
            let grad = delta * x;
            *m_val = self.beta1 * *m_val + (1.0 - self.beta1) * grad;
            *nu_val = self.beta2 * *nu_val + (1.0 - self.beta2) * grad * grad;

            let m_hat = *m_val / m_correction;
            let nu_hat = *nu_val / nu_correction;

            *w -= self.alpha * m_hat / (nu_hat.sqrt() + self.epsilon);
        }
    }

    /// Returns the bias after one step for `delta`.
    #[must_use]
    pub fn bias_step(&self, bias: f64, delta: f64) -> f64 {
        bias - (self.alpha * delta - self.alpha * self.rambda * bias)
    }
}
