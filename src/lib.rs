//! Training core for fully connected feedforward neural networks.
//!
//! A `Network` computes a regularized cross-entropy cost and its gradient by
//! backpropagation, splitting the batch across parallel workers. A
//! `NetworkObjective` exposes that as a cost/gradient function over one flat
//! parameter vector, which any `Optimizable`-driven search can minimize.
//!
//! # Example
//!
//! Let's train a small network to compute XOR, encoded as two one-hot outputs:
//!
//! ```
//! use ffnet::{Activator, GradientDescent, Layer, Logging, Network, NetworkObjective, StopCondition};
//! use ndarray::array;
//!
//! let hidden = Layer::from_weights(
//!     Activator::Sigmoid,
//!     array![[-0.73, 0.69, 0.53], [-0.49, -0.01, -0.1]],
//! ).unwrap();
//! let output = Layer::from_weights(
//!     Activator::Sigmoid,
//!     array![[0.3, 0.58, -0.81], [-0.94, 0.67, -0.13]],
//! ).unwrap();
//! let network = Network::new(vec![hidden, output]).unwrap();
//!
//! // One example per column
//! let x = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
//! let y = array![[0.0, 1.0, 1.0, 0.0], [1.0, 0.0, 0.0, 1.0]];
//!
//! let mut objective = NetworkObjective::new(network, x.clone(), y.clone()).unwrap();
//! let trajectory = GradientDescent::new()
//!     .learning_rate(3.0)
//!     .logging(Logging::Silent)
//!     .stop_condition(StopCondition::Iterations(2000))
//!     .optimize(&mut objective);
//!
//! let mut network = objective.into_network();
//! network.set_all_weights(trajectory.parameters.view());
//! let predicted = network.forward_propagate(x.view());
//! assert!(predicted.iter().zip(y.iter()).all(|(p, t)| (p - t).abs() < 0.01));
//! ```

pub mod activator;
pub mod error;
pub mod feed_forward;
pub mod layer;
pub mod matrix;
pub mod objective;
pub mod parallel;
pub mod trainer;

pub use crate::activator::Activator;
pub use crate::error::{Error, Result};
pub use crate::feed_forward::Network;
pub use crate::layer::{ErrorSignal, Layer, LayerState};
pub use crate::objective::{BatchSize, NetworkObjective, ObjectiveConfig};
pub use crate::parallel::Parallelism;
pub use crate::trainer::{GradientDescent, Logging, Optimizable, StopCondition, Trajectory};
