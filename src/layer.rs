use crate::activator::Activator;
use crate::error::{Error, Result};
use crate::matrix::{self, Shape};

use itertools::multizip;
use ndarray::linalg::general_mat_vec_mul;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Zip};
use rand::Rng;

/// A fully connected layer of a neural network.
///
/// The weights form an `outputs x (inputs + 1)` matrix. Column 0 holds each
/// neuron's bias weight, and inputs are augmented with a leading row of ones
/// before being multiplied in.
#[derive(Clone, Debug)]
pub struct Layer {
    /// The activation function to be used for every neuron in the layer.
    activator: Activator,
    /// The network weights, with each neuron's weights stored as a row.
    weights: Array2<f64>,
    /// Gradient multipliers; a zero freezes the matching weight.
    constant_mask: Array2<f64>,
}

impl Layer {
    /// Initializes a new, untrained layer with weights drawn uniformly from
    /// `[-1, 1]`.
    ///
    /// Arguments:
    ///
    ///  * `activator` - the activation function to be used for this layer's
    ///                  output.
    ///  * `inputs` - the number of inputs to this layer, excluding the bias.
    ///  * `outputs` - the number of outputs from this layer.
    pub fn new(activator: Activator, inputs: usize, outputs: usize) -> Self {
        Self::with_rng(activator, inputs, outputs, &mut rand::thread_rng())
    }

    /// Like `new`, drawing the initial weights from `rng`.
    pub fn with_rng<R>(activator: Activator, inputs: usize, outputs: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let weights = matrix::random_uniform(rng, outputs, inputs + 1, -1.0, 1.0);
        Layer {
            activator,
            constant_mask: Array2::ones(weights.dim()),
            weights,
        }
    }

    /// Builds a layer around existing `weights`, bias column first. Every
    /// weight starts out trainable.
    pub fn from_weights(activator: Activator, weights: Array2<f64>) -> Result<Self> {
        let (rows, cols) = weights.dim();
        if rows == 0 || cols == 0 {
            return Err(Error::EmptyLayer { rows, cols });
        }
        Ok(Layer {
            activator,
            constant_mask: Array2::ones(weights.dim()),
            weights,
        })
    }

    /// Replaces the constant mask. Entries are expected to be 0 or 1; other
    /// values scale the gradient and are not rejected.
    pub fn with_constant_mask(mut self, mask: Array2<f64>) -> Result<Self> {
        if mask.dim() != self.weights.dim() {
            return Err(Error::MaskShape {
                expected: self.weights.dim(),
                actual: mask.dim(),
            });
        }
        self.constant_mask = mask;
        Ok(self)
    }

    /// Returns the number of inputs to this layer, excluding the bias.
    pub fn input_len(&self) -> usize {
        self.weights.ncols() - 1
    }

    /// Returns the number of outputs from this layer.
    pub fn output_len(&self) -> usize {
        self.weights.nrows()
    }

    pub fn shape(&self) -> Shape {
        self.weights.dim()
    }

    pub fn activator(&self) -> Activator {
        self.activator
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn constant_mask(&self) -> &Array2<f64> {
        &self.constant_mask
    }

    pub(crate) fn weights_mut(&mut self) -> &mut Array2<f64> {
        &mut self.weights
    }

    /// Replaces the weights with a matrix of the same shape.
    ///
    /// # Panics
    /// Panics if the shape differs from the current weights.
    pub fn set_weights(&mut self, weights: Array2<f64>) {
        assert_eq!(weights.dim(), self.weights.dim(), "layer weight shape changed");
        self.weights = weights;
    }

    /// Feeds a batch of `inputs` (one example per column) forward through the
    /// layer.
    pub fn forward(&self, inputs: ArrayView2<f64>) -> LayerState {
        assert_eq!(
            inputs.nrows(),
            self.input_len(),
            "layer takes {} inputs, got {}",
            self.input_len(),
            inputs.nrows()
        );
        let inputs = matrix::augment_with_bias(inputs);
        let linear_outputs = self.weights.dot(&inputs);
        let activations = self.activator.apply(linear_outputs.view());
        LayerState {
            inputs,
            linear_outputs,
            activations,
        }
    }

    /// Computes the error signal of an output layer for the example in column
    /// `example`, given its expected `target` values.
    pub fn backward_output(
        &self,
        state: &LayerState,
        example: usize,
        target: ArrayView1<f64>,
        signal: &mut ErrorSignal,
    ) {
        assert_eq!(target.len(), self.output_len());
        signal.output_error.assign(&state.activations.column(example));
        signal.output_error -= &target;
        self.back_multiply(signal);
    }

    /// Computes the error signal of a hidden layer from the following layer's
    /// back-multiplied error, whose bias entry at index 0 is skipped here.
    pub fn backward_hidden(
        &self,
        state: &LayerState,
        example: usize,
        next_error: ArrayView1<f64>,
        signal: &mut ErrorSignal,
    ) {
        assert_eq!(next_error.len(), self.output_len() + 1);
        for (e, &n, &z) in multizip((
            signal.output_error.iter_mut(),
            next_error.slice(s![1..]).iter(),
            state.linear_outputs.column(example).iter(),
        )) {
            *e = n * self.activator.fprime(z);
        }
        self.back_multiply(signal);
    }

    fn back_multiply(&self, signal: &mut ErrorSignal) {
        general_mat_vec_mul(
            1.0,
            &self.weights.t(),
            &signal.output_error,
            0.0,
            &mut signal.back_multiplied_error,
        );
    }

    /// Adds this example's masked weight gradient, the outer product of the
    /// output error with the augmented input column, into `gradient`.
    pub fn accumulate_gradient(
        &self,
        state: &LayerState,
        example: usize,
        signal: &ErrorSignal,
        gradient: &mut Array2<f64>,
    ) {
        let input = state.inputs.column(example);
        let error = &signal.output_error;
        Zip::indexed(gradient)
            .and(&self.constant_mask)
            .for_each(|(r, c), g, &mask| *g += error[r] * input[c] * mask);
    }

    /// Returns a zeroed gradient matrix shaped like the weights.
    pub fn empty_gradient(&self) -> Array2<f64> {
        Array2::zeros(self.weights.dim())
    }
}

/// The values a layer produced for one forward pass over a batch.
///
/// A fresh state is returned by every `Layer::forward` call; nothing is
/// retained inside the layer.
#[derive(Clone, Debug)]
pub struct LayerState {
    /// Bias-augmented inputs, `(inputs + 1) x batch`, row 0 all ones.
    inputs: Array2<f64>,
    linear_outputs: Array2<f64>,
    activations: Array2<f64>,
}

impl LayerState {
    pub fn inputs(&self) -> &Array2<f64> {
        &self.inputs
    }

    pub fn linear_outputs(&self) -> &Array2<f64> {
        &self.linear_outputs
    }

    pub fn activations(&self) -> &Array2<f64> {
        &self.activations
    }

    pub fn batch_len(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn into_activations(self) -> Array2<f64> {
        self.activations
    }
}

/// Per-example backward scratch for one layer. Each worker owns its own set.
#[derive(Clone, Debug)]
pub struct ErrorSignal {
    output_error: Array1<f64>,
    /// `weights^T * output_error`, including the bias entry at index 0.
    back_multiplied_error: Array1<f64>,
}

impl ErrorSignal {
    pub fn for_layer(layer: &Layer) -> Self {
        ErrorSignal {
            output_error: Array1::zeros(layer.output_len()),
            back_multiplied_error: Array1::zeros(layer.input_len() + 1),
        }
    }

    pub fn output_error(&self) -> ArrayView1<f64> {
        self.output_error.view()
    }

    pub fn back_multiplied_error(&self) -> ArrayView1<f64> {
        self.back_multiplied_error.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_layer() -> Layer {
        Layer::from_weights(
            Activator::Identity,
            array![[0.5, 1.0, -1.0], [-0.5, 2.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn sizes_exclude_bias() {
        let layer = Layer::new(Activator::Sigmoid, 4, 3);
        assert_eq!(layer.input_len(), 4);
        assert_eq!(layer.output_len(), 3);
        assert_eq!(layer.shape(), (3, 5));
        assert!(layer.constant_mask().iter().all(|&m| m == 1.0));
    }

    #[test]
    fn rejects_empty_weights() {
        let err = Layer::from_weights(Activator::Sigmoid, Array2::zeros((2, 0))).unwrap_err();
        assert_eq!(err, Error::EmptyLayer { rows: 2, cols: 0 });
    }

    #[test]
    fn rejects_mismatched_mask() {
        let err = sample_layer()
            .with_constant_mask(Array2::ones((3, 2)))
            .unwrap_err();
        assert_eq!(
            err,
            Error::MaskShape {
                expected: (2, 3),
                actual: (3, 2)
            }
        );
    }

    #[test]
    fn forward_adds_bias() {
        let layer = sample_layer();
        let state = layer.forward(array![[1.0, 0.0], [2.0, 3.0]].view());
        assert_eq!(state.inputs(), &array![[1.0, 1.0], [1.0, 0.0], [2.0, 3.0]]);
        assert_eq!(state.linear_outputs(), &array![[-0.5, -2.5], [1.5, -0.5]]);
        assert_eq!(state.activations(), state.linear_outputs());
        assert_eq!(state.batch_len(), 2);
    }

    #[test]
    #[should_panic(expected = "layer takes 2 inputs")]
    fn forward_checks_input_rows() {
        sample_layer().forward(Array2::zeros((3, 1)).view());
    }

    #[test]
    fn output_error_and_back_multiplication() {
        let layer = sample_layer();
        let state = layer.forward(array![[1.0], [2.0]].view());
        let mut signal = ErrorSignal::for_layer(&layer);
        layer.backward_output(&state, 0, array![0.0, 1.0].view(), &mut signal);
        // activations are [-0.5, 1.5]
        assert_eq!(signal.output_error(), array![-0.5, 0.5]);
        assert_eq!(signal.back_multiplied_error(), array![-0.5, 0.5, 0.5]);
    }

    #[test]
    fn hidden_error_skips_bias_entry() {
        let layer = Layer::from_weights(Activator::Sigmoid, array![[0.0, 0.0], [0.0, 0.0]]).unwrap();
        let state = layer.forward(array![[3.0]].view());
        let mut signal = ErrorSignal::for_layer(&layer);
        layer.backward_hidden(&state, 0, array![100.0, 2.0, -4.0].view(), &mut signal);
        // zero pre-activations give a sigmoid derivative of 0.25
        assert_eq!(signal.output_error(), array![0.5, -1.0]);
    }

    #[test]
    fn gradient_is_masked_outer_product() {
        let layer = sample_layer()
            .with_constant_mask(array![[0.0, 1.0, 1.0], [1.0, 1.0, 0.0]])
            .unwrap();
        let state = layer.forward(array![[1.0], [2.0]].view());
        let mut signal = ErrorSignal::for_layer(&layer);
        layer.backward_output(&state, 0, array![0.0, 1.0].view(), &mut signal);
        let mut gradient = layer.empty_gradient();
        layer.accumulate_gradient(&state, 0, &signal, &mut gradient);
        layer.accumulate_gradient(&state, 0, &signal, &mut gradient);
        assert_eq!(gradient, array![[0.0, -1.0, -2.0], [1.0, 1.0, 0.0]]);
    }
}
