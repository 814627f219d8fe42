//! A [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network) trained on a
//! regularized cross-entropy cost.
//!
//! Datasets are matrices with one example per column: `X` is
//! `inputs x m` and `Y` is `outputs x m`.

use crate::activator::Activator;
use crate::error::{Error, Result};
use crate::layer::{ErrorSignal, Layer, LayerState};
use crate::matrix::{self, Shape};
use crate::parallel::{self, Parallelism};

use itertools::iproduct;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use rayon::prelude::*;
use std::ops::Range;
use tracing::debug;

/// Step used by `Network::numerical_gradient`.
const EPSILON: f64 = 1e-4;

/// A Feedforward neural network
#[derive(Clone, Debug)]
pub struct Network {
    layers: Vec<Layer>,
    /// Weight shapes recorded at construction.
    shapes: Vec<Shape>,
    parallelism: Parallelism,
}

impl Network {
    /// Assembles a network from `layers`, in order from input to output.
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::NoLayers);
        }
        for (index, pair) in layers.windows(2).enumerate() {
            if pair[0].output_len() != pair[1].input_len() {
                return Err(Error::LayerMismatch {
                    index: index + 1,
                    expected: pair[1].input_len(),
                    actual: pair[0].output_len(),
                });
            }
        }
        let shapes = layers.iter().map(Layer::shape).collect();
        Ok(Network {
            layers,
            shapes,
            parallelism: Parallelism::Auto,
        })
    }

    /// Creates a new, untrained neural network.
    ///
    /// Arguments:
    ///  * `activator` - the activation function to use for each neuron.
    ///  * `layer_sizes` - the number of neurons in each layer, input layer
    ///                    first.
    pub fn with_sizes(activator: Activator, layer_sizes: &[usize]) -> Result<Self> {
        Self::with_sizes_using(activator, layer_sizes, &mut rand::thread_rng())
    }

    /// Like `with_sizes`, drawing the initial weights from `rng`.
    pub fn with_sizes_using<R>(activator: Activator, layer_sizes: &[usize], rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if layer_sizes.len() < 2 || layer_sizes.contains(&0) {
            return Err(Error::LayerSizes(layer_sizes.to_vec()));
        }
        let layers = layer_sizes
            .windows(2)
            .map(|pair| Layer::with_rng(activator, pair[0], pair[1], &mut *rng))
            .collect();
        Self::new(layers)
    }

    /// Sets how many workers `back_propagate` splits the batch across.
    pub fn parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn set_parallelism(&mut self, parallelism: Parallelism) {
        self.parallelism = parallelism;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the size of the input layer to the network.
    pub fn input_len(&self) -> usize {
        self.layers[0].input_len()
    }

    /// Returns the size of the output layer from the network.
    pub fn output_len(&self) -> usize {
        self.layers[self.layers.len() - 1].output_len()
    }

    /// The `(rows, cols)` of every layer's weights, in parameter order.
    pub fn weight_shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Total number of weights, biases included.
    pub fn weight_count(&self) -> usize {
        self.shapes.iter().map(|&(r, c)| r * c).sum()
    }

    /// Feeds the batch `x` through the network, returning the output layer's
    /// activations, `outputs x m`.
    pub fn forward_propagate(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let first = self.layers[0].forward(x).into_activations();
        self.layers[1..].iter().fold(first, |activations, layer| {
            layer.forward(activations.view()).into_activations()
        })
    }

    /// Feeds the batch `x` through the network, returning every layer's state.
    pub fn forward_states(&self, x: ArrayView2<f64>) -> Vec<LayerState> {
        let mut states: Vec<LayerState> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let state = match states.last() {
                Some(previous) => layer.forward(previous.activations().view()),
                None => layer.forward(x),
            };
            states.push(state);
        }
        states
    }

    /// Computes the mean cross-entropy cost of predicting `y` from `x`, plus
    /// an L2 penalty of `lambda / 2m` on every non-bias weight.
    ///
    /// The cost assumes outputs in `(0, 1)`, so the output layer should be a
    /// sigmoid. Saturated outputs produce an infinite or NaN cost.
    pub fn cost(&self, x: ArrayView2<f64>, y: ArrayView2<f64>, lambda: f64) -> f64 {
        self.cost_with_states(x, y, lambda).0
    }

    fn cost_with_states(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        lambda: f64,
    ) -> (f64, Vec<LayerState>) {
        let m = x.ncols();
        assert!(m > 0, "cannot evaluate an empty batch");
        let states = self.forward_states(x);
        let h = states[states.len() - 1].activations();
        assert_eq!(
            h.dim(),
            y.dim(),
            "targets are {:?} but the network produces {:?}",
            y.dim(),
            h.dim()
        );

        let log_likelihood: f64 = h
            .iter()
            .zip(y.iter())
            .map(|(&p, &t)| t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            .sum();

        let mut regularization = 0.0;
        if lambda != 0.0 {
            for layer in &self.layers {
                regularization += layer
                    .weights()
                    .slice(s![.., 1..])
                    .iter()
                    .map(|w| w * w)
                    .sum::<f64>();
            }
        }

        let m = m as f64;
        let cost = -log_likelihood / m + lambda / (2.0 * m) * regularization;
        (cost, states)
    }

    /// Computes the cost and its gradient with respect to every layer's
    /// weights.
    ///
    /// Examples are backpropagated one at a time. The batch is split into
    /// contiguous ranges, each handled by a worker with its own scratch, and
    /// the partial sums are added once every worker has finished.
    pub fn back_propagate(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        lambda: f64,
    ) -> (f64, Vec<Array2<f64>>) {
        let (cost, states) = self.cost_with_states(x, y, lambda);
        let m = x.ncols();

        let ranges = parallel::partition(m, self.parallelism.resolve());
        debug!(examples = m, workers = ranges.len(), "accumulating gradients");
        let partials: Vec<Vec<Array2<f64>>> = ranges
            .into_par_iter()
            .map(|range| self.accumulate(&states, y, range))
            .collect();

        let mut gradients = self.empty_gradients();
        for partial in partials {
            for (sum, part) in gradients.iter_mut().zip(partial) {
                *sum += &part;
            }
        }

        let scale = lambda / m as f64;
        for (gradient, layer) in gradients.iter_mut().zip(&self.layers) {
            *gradient /= m as f64;
            if lambda != 0.0 {
                gradient
                    .slice_mut(s![.., 1..])
                    .scaled_add(scale, &layer.weights().slice(s![.., 1..]));
            }
        }
        (cost, gradients)
    }

    /// Sums the gradients of the examples in `range` using private scratch.
    fn accumulate(
        &self,
        states: &[LayerState],
        y: ArrayView2<f64>,
        range: Range<usize>,
    ) -> Vec<Array2<f64>> {
        let mut signals: Vec<ErrorSignal> = self.layers.iter().map(ErrorSignal::for_layer).collect();
        let mut gradients = self.empty_gradients();
        for example in range {
            self.back_propagate_single(states, y.column(example), example, &mut signals, &mut gradients);
        }
        gradients
    }

    /// Backpropagates one example, adding its gradient into `gradients`.
    fn back_propagate_single(
        &self,
        states: &[LayerState],
        target: ArrayView1<f64>,
        example: usize,
        signals: &mut [ErrorSignal],
        gradients: &mut [Array2<f64>],
    ) {
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate().rev() {
            let (current, following) = signals.split_at_mut(i + 1);
            let signal = &mut current[i];
            if i == last {
                layer.backward_output(&states[i], example, target, signal);
            } else {
                layer.backward_hidden(&states[i], example, following[0].back_multiplied_error(), signal);
            }
            layer.accumulate_gradient(&states[i], example, signal, &mut gradients[i]);
        }
    }

    fn empty_gradients(&self) -> Vec<Array2<f64>> {
        self.layers.iter().map(Layer::empty_gradient).collect()
    }

    /// Returns every weight in the network as one flat vector, layer by layer
    /// and row-major within each layer.
    pub fn all_weights(&self) -> Array1<f64> {
        matrix::flatten(self.layers.iter().map(Layer::weights))
    }

    /// Overwrites every weight from a vector laid out like `all_weights`.
    ///
    /// # Panics
    /// Panics if `weights` does not hold exactly `weight_count()` entries.
    pub fn set_all_weights(&mut self, weights: ArrayView1<f64>) {
        let unrolled = matrix::unflatten(weights, &self.shapes);
        for (layer, weights) in self.layers.iter_mut().zip(unrolled) {
            layer.set_weights(weights);
        }
    }

    /// Estimates the gradient by central finite differences.
    ///
    /// Every weight costs two full cost evaluations, so this is only meant
    /// for checking `back_propagate`. Constant masks are ignored.
    pub fn numerical_gradient(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        lambda: f64,
    ) -> (f64, Vec<Array2<f64>>) {
        let cost = self.cost(x, y, lambda);
        let mut probe = self.clone();
        let mut gradients = self.empty_gradients();
        for (l, gradient) in gradients.iter_mut().enumerate() {
            let (rows, cols) = self.shapes[l];
            for (r, c) in iproduct!(0..rows, 0..cols) {
                let original = self.layers[l].weights()[[r, c]];

                probe.layers[l].weights_mut()[[r, c]] = original - EPSILON;
                let left = probe.cost(x, y, lambda);
                probe.layers[l].weights_mut()[[r, c]] = original + EPSILON;
                let right = probe.cost(x, y, lambda);
                probe.layers[l].weights_mut()[[r, c]] = original;

                gradient[[r, c]] = (right - left) / (2.0 * EPSILON);
            }
        }
        (cost, gradients)
    }
}
