//! Activation function types.

use ndarray::{Array, ArrayView, Dimension};
use serde_derive::{Deserialize, Serialize};

/// [Activation function](https://en.wikipedia.org/wiki/Activation_function)
/// types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activator {
    /// Identity function, passes the linear output through unchanged
    Identity,
    /// Sigmoid function
    Sigmoid,
    /// Hyperbolic tan function
    TanH,
}

impl Activator {
    /// Evaluates `f(x)` for the selected the activation function.
    pub fn f(&self, x: f64) -> f64 {
        match *self {
            Activator::Identity => x,
            Activator::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activator::TanH => x.tanh(),
        }
    }

    /// Evaluates the derivative `f'(x)`.
    ///
    /// Unlike an output-based derivative, this takes the *input* of the
    /// activation function. The sigmoid case recomputes `s = f(x)` rather than
    /// trusting a cached activation, so any `x` may be passed.
    pub fn fprime(&self, x: f64) -> f64 {
        match *self {
            Activator::Identity => 1.0,
            Activator::Sigmoid => {
                let s = self.f(x);
                s * (1.0 - s)
            }
            Activator::TanH => {
                let c = x.cosh();
                1.0 / (c * c)
            }
        }
    }

    /// Applies `f` elementwise, returning an array of the same shape.
    pub fn apply<D: Dimension>(&self, x: ArrayView<f64, D>) -> Array<f64, D> {
        x.mapv(|v| self.f(v))
    }

    /// Applies `fprime` elementwise, returning an array of the same shape.
    pub fn apply_derivative<D: Dimension>(&self, x: ArrayView<f64, D>) -> Array<f64, D> {
        x.mapv(|v| self.fprime(v))
    }
}
