//! Binds a `Network` to a dataset so an optimizer can train it.

use crate::error::{Error, Result};
use crate::feed_forward::Network;
use crate::matrix;
use crate::parallel::Parallelism;
use crate::trainer::Optimizable;

use ndarray::{s, Array1, Array2, ArrayView1};
use serde_derive::{Deserialize, Serialize};
use std::ops::Range;
use tracing::trace;

/// How many examples each cost evaluation looks at.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSize {
    /// Every example, every time
    #[default]
    Full,
    /// Successive slices of this many examples, wrapping around the dataset
    Examples(usize),
}

impl From<usize> for BatchSize {
    fn from(size: usize) -> Self {
        BatchSize::Examples(size)
    }
}

/// Training settings for a `NetworkObjective`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    /// L2 regularization strength. Expected to be non-negative.
    pub lambda: f64,
    pub batch_size: BatchSize,
    pub parallelism: Parallelism,
}

/// A network paired with its training data, evaluated one mini-batch at a
/// time.
///
/// Every call to `cost_function` loads the given parameters into the network,
/// evaluates the next batch and moves the cursor forward, returning to the
/// first example once it reaches the end of the data.
#[derive(Clone, Debug)]
pub struct NetworkObjective {
    network: Network,
    x: Array2<f64>,
    y: Array2<f64>,
    batch_size: usize,
    lambda: f64,
    current_index: usize,
}

impl NetworkObjective {
    /// Trains on the whole dataset at once, without regularization.
    pub fn new(network: Network, x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        Self::with_config(network, x, y, &ObjectiveConfig::default())
    }

    /// Arguments:
    ///
    ///  * `network` - the network to train. Its parallelism is replaced by
    ///                the configured one.
    ///  * `x` - inputs, one example per column.
    ///  * `y` - expected outputs, one example per column.
    pub fn with_config(
        network: Network,
        x: Array2<f64>,
        y: Array2<f64>,
        config: &ObjectiveConfig,
    ) -> Result<Self> {
        if x.ncols() != y.ncols() {
            return Err(Error::ExampleCount {
                inputs: x.ncols(),
                targets: y.ncols(),
            });
        }
        if x.ncols() == 0 {
            return Err(Error::EmptyDataset);
        }
        if x.nrows() != network.input_len() {
            return Err(Error::DatasetRows {
                matrix: "inputs",
                expected: network.input_len(),
                actual: x.nrows(),
            });
        }
        if y.nrows() != network.output_len() {
            return Err(Error::DatasetRows {
                matrix: "targets",
                expected: network.output_len(),
                actual: y.nrows(),
            });
        }
        let batch_size = match config.batch_size {
            BatchSize::Full => x.ncols(),
            BatchSize::Examples(0) => return Err(Error::ZeroBatchSize),
            BatchSize::Examples(n) => n,
        };

        Ok(NetworkObjective {
            network: network.parallelism(config.parallelism),
            x,
            y,
            batch_size,
            lambda: config.lambda,
            current_index: 0,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Index of the first example in the next batch.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The example range the next call to `cost_function` will use.
    pub fn next_batch_range(&self) -> Range<usize> {
        let end = (self.current_index + self.batch_size).min(self.x.ncols());
        self.current_index..end
    }

    fn advance(&mut self) -> Range<usize> {
        let range = self.next_batch_range();
        self.current_index += self.batch_size;
        if self.current_index >= self.x.ncols() {
            self.current_index = 0;
        }
        range
    }
}

impl Optimizable for NetworkObjective {
    fn initial_parameters(&self) -> Array1<f64> {
        self.network.all_weights()
    }

    fn cost_function(&mut self, parameters: ArrayView1<f64>) -> (f64, Array1<f64>) {
        self.network.set_all_weights(parameters);
        let range = self.advance();
        trace!(start = range.start, end = range.end, "selected batch");

        let x = self.x.slice(s![.., range.clone()]);
        let y = self.y.slice(s![.., range]);
        let (cost, gradients) = self.network.back_propagate(x, y, self.lambda);
        (cost, matrix::flatten(&gradients))
    }
}
