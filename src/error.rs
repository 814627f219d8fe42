use crate::matrix::Shape;

use thiserror::Error;

/// Errors raised while assembling a network or a training objective.
///
/// These cover structural mistakes that can be caught once, up front. Shape
/// violations inside a training step are programmer errors and panic instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("a network needs at least one layer")]
    NoLayers,

    #[error("layer weights must have at least one row and a bias column, got {rows}x{cols}")]
    EmptyLayer { rows: usize, cols: usize },

    #[error("invalid layer sizes {0:?}: need at least two sizes, all non-zero")]
    LayerSizes(Vec<usize>),

    #[error("layer {index} takes {expected} inputs but the previous layer produces {actual}")]
    LayerMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("constant mask is {actual:?} but the weights are {expected:?}")]
    MaskShape { expected: Shape, actual: Shape },

    #[error("inputs hold {inputs} examples but targets hold {targets}")]
    ExampleCount { inputs: usize, targets: usize },

    #[error("{matrix} has {actual} rows but the network expects {expected}")]
    DatasetRows {
        matrix: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("the dataset contains no examples")]
    EmptyDataset,

    #[error("batch size must be at least one")]
    ZeroBatchSize,
}

pub type Result<T> = std::result::Result<T, Error>;
