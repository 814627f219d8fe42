//! Splitting a batch of examples across workers.

use serde_derive::{Deserialize, Serialize};
use std::ops::Range;

/// How many workers accumulate gradients during backpropagation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// One worker per thread in the current rayon pool
    #[default]
    Auto,
    /// A fixed number of workers. Zero is treated as one.
    Workers(usize),
}

impl Parallelism {
    /// Resolves the worker count at call time.
    pub fn resolve(&self) -> usize {
        match *self {
            Parallelism::Auto => rayon::current_num_threads().max(1),
            Parallelism::Workers(n) => n.max(1),
        }
    }
}

/// Splits `0..len` into contiguous, disjoint ranges, one per worker.
///
/// Every worker gets `len / workers` examples and the last one also takes the
/// remainder. The worker count is capped at `len` so no range is empty unless
/// `len` is zero.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.clamp(1, len.max(1));
    let chunk = len / workers;
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == workers { len } else { start + chunk };
            start..end
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        assert_eq!(partition(8, 4), vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn remainder_goes_to_last_worker() {
        assert_eq!(partition(10, 3), vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn more_workers_than_examples() {
        assert_eq!(partition(2, 8), vec![0..1, 1..2]);
        assert_eq!(partition(0, 4), vec![0..0]);
    }

    #[test]
    fn ranges_cover_everything_once() {
        for len in 0..40 {
            for workers in 1..9 {
                let ranges = partition(len, workers);
                let covered: Vec<usize> = ranges.into_iter().flatten().collect();
                assert_eq!(covered, (0..len).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn resolve_never_returns_zero() {
        assert_eq!(Parallelism::Workers(0).resolve(), 1);
        assert_eq!(Parallelism::Workers(6).resolve(), 6);
        assert!(Parallelism::Auto.resolve() >= 1);
    }

    #[test]
    fn config_names() {
        let p: Parallelism = serde_json::from_str(r#"{"workers": 3}"#).unwrap();
        assert_eq!(p, Parallelism::Workers(3));
        let p: Parallelism = serde_json::from_str(r#""auto""#).unwrap();
        assert_eq!(p, Parallelism::Auto);
    }
}
