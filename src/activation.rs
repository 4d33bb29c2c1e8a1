//! Activation functions.
//!
//! Activations are a closed set selected per layer, so they are modelled as a
//! plain enum dispatched by value rather than a trait object.
//!
//! | selector | activation | `f(x)`            | `f'` in terms of `y = f(x)` |
//! |----------|------------|-------------------|-----------------------------|
//! | `0`      | identity   | `x`               | `1`                         |
//! | `1`      | sigmoid    | `1 / (1 + e^-x)`  | `y (1 - y)`                 |
//! | `2`      | tanh       | `tanh(x)`         | `1 - y²`                    |
//! | `3`      | relu       | `max(0, x)`       | `1 if y > 0 else 0`         |

use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Activation function applied to a neuron's weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Activation {
    /// `f(x) = x` (default).
    #[default]
    Identity = 0,
    /// Logistic sigmoid.
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
    /// Rectified linear unit.
    Relu,
}

impl Activation {
    /// Applies the activation to a pre-activation value.
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
            Self::Relu => x.max(0.0),
        }
    }

    /// Derivative of the activation, evaluated from its *output* `y`.
    ///
    /// Every supported activation has a derivative expressible in terms of
    /// its own output, which is what the training loop has at hand.
    #[must_use]
    pub fn derivative(self, y: f64) -> f64 {
        match self {
            Self::Identity => 1.0,
            Self::Sigmoid => y * (1.0 - y),
            Self::Tanh => 1.0 - y * y,
            Self::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Lowercase name, as used in configuration and checkpoints.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Relu => "relu",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Activation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Identity),
            1 => Ok(Self::Sigmoid),
            2 => Ok(Self::Tanh),
            3 => Ok(Self::Relu),
            other => Err(other),
        }
    }
}

impl FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "sigmoid" => Ok(Self::Sigmoid),
            "tanh" => Ok(Self::Tanh),
            "relu" => Ok(Self::Relu),
            _ => Err(format!("unknown activation function: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Activation; 4] = [
        Activation::Identity,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Relu,
    ];

    #[test]
    fn activation_at_zero_matches_closed_form() {
        assert_eq!(Activation::Identity.apply(0.0), 0.0);
        assert_eq!(Activation::Sigmoid.apply(0.0), 0.5);
        assert_eq!(Activation::Tanh.apply(0.0), 0.0);
        assert_eq!(Activation::Relu.apply(0.0), 0.0);
    }

    #[test]
    fn relu_clamps_negatives() {
        let out: Vec<f64> = [-1.0, 0.0, 1.0, 2.0]
            .iter()
            .map(|&x| Activation::Relu.apply(x))
            .collect();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let h = 1e-6;
        for act in [Activation::Identity, Activation::Sigmoid, Activation::Tanh] {
            for &x in &[-1.5, -0.3, 0.0, 0.7, 2.0] {
                let numeric = (act.apply(x + h) - act.apply(x - h)) / (2.0 * h);
                let analytic = act.derivative(act.apply(x));
                assert!(
                    (numeric - analytic).abs() < 1e-6,
                    "{act}: f'({x}) = {analytic}, numeric {numeric}"
                );
            }
        }
        assert_eq!(Activation::Relu.derivative(Activation::Relu.apply(-2.0)), 0.0);
        assert_eq!(Activation::Relu.derivative(Activation::Relu.apply(3.0)), 1.0);
    }

    #[test]
    fn selector_codes_and_names_agree() {
        for (code, act) in ALL.iter().enumerate() {
            assert_eq!(Activation::try_from(code as u8), Ok(*act));
            assert_eq!(act.name().parse::<Activation>(), Ok(*act));
        }
        assert_eq!(Activation::try_from(4), Err(4));
        assert!("softplus".parse::<Activation>().is_err());
    }
}
