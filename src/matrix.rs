//! Helpers on top of `ndarray` used by the layers and the optimizer boundary.
//!
//! Parameter vectors are laid out layer by layer, each matrix row-major.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

/// Matrix dimensions as `(rows, cols)`.
pub type Shape = (usize, usize);

/// Returns a `rows x cols` matrix filled uniformly from `[low, high]`.
pub fn random_uniform<R>(rng: &mut R, rows: usize, cols: usize, low: f64, high: f64) -> Array2<f64>
where
    R: Rng + ?Sized,
{
    let distribution = Uniform::new_inclusive(low, high);
    Array2::from_shape_simple_fn((rows, cols), || distribution.sample(&mut *rng))
}

/// Prepends a row of ones to `inputs`, so bias weights act as ordinary
/// weights in column 0.
pub fn augment_with_bias(inputs: ArrayView2<f64>) -> Array2<f64> {
    let (rows, cols) = inputs.dim();
    let mut augmented = Array2::ones((rows + 1, cols));
    augmented.slice_mut(s![1.., ..]).assign(&inputs);
    augmented
}

/// Unrolls `matrices` into one column of parameters.
pub fn flatten<'a, I>(matrices: I) -> Array1<f64>
where
    I: IntoIterator<Item = &'a Array2<f64>>,
{
    matrices
        .into_iter()
        .flat_map(|m| m.iter().copied())
        .collect()
}

/// Rebuilds matrices of the given `shapes` from a flattened parameter vector.
///
/// # Panics
/// Panics if `flat` does not hold exactly as many entries as `shapes` require.
pub fn unflatten(flat: ArrayView1<f64>, shapes: &[Shape]) -> Vec<Array2<f64>> {
    let expected: usize = shapes.iter().map(|&(r, c)| r * c).sum();
    assert_eq!(
        flat.len(),
        expected,
        "parameter vector has {} entries but the shapes need {}",
        flat.len(),
        expected
    );

    let mut offset = 0;
    shapes
        .iter()
        .map(|&(rows, cols)| {
            let chunk = flat.slice(s![offset..offset + rows * cols]);
            offset += rows * cols;
            Array2::from_shape_fn((rows, cols), |(r, c)| chunk[r * cols + c])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn bias_row_is_prepended() {
        let x = array![[2.0, 3.0], [4.0, 5.0]];
        assert_eq!(
            augment_with_bias(x.view()),
            array![[1.0, 1.0], [2.0, 3.0], [4.0, 5.0]]
        );
    }

    #[test]
    fn flatten_is_row_major_in_order() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let b = array![[5.0, 6.0, 7.0]];
        assert_eq!(flatten(&[a, b]), array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn flatten_reads_transposed_views_logically() {
        let a = array![[1.0, 2.0], [3.0, 4.0]].reversed_axes();
        assert_eq!(flatten(&[a]), array![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn unflatten_restores_shapes() {
        let flat = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let mats = unflatten(flat.view(), &[(2, 3), (1, 2)]);
        assert_eq!(mats[0], array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(mats[1], array![[7.0, 8.0]]);
    }

    #[test]
    #[should_panic(expected = "parameter vector has 3 entries")]
    fn unflatten_rejects_wrong_length() {
        let flat = array![1.0, 2.0, 3.0];
        unflatten(flat.view(), &[(2, 2)]);
    }

    #[test]
    fn random_uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let m = random_uniform(&mut rng, 6, 9, -1.0, 1.0);
        assert_eq!(m.dim(), (6, 9));
        assert!(m.iter().all(|&w| (-1.0..=1.0).contains(&w)));
        assert!(m.iter().any(|&w| w != m[[0, 0]]));
    }
}
