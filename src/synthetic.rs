//! Seeded linear dataset with a few injected extremes

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::dataset::{Column, Dataset};
use crate::utils::AnalysisError;
use crate::Result;

pub const SYNTHETIC_ROWS: usize = 200;
const SLOPE: f64 = 2.2;
const INTERCEPT: f64 = 1.0;
const NOISE_STD: f64 = 1.2;
/// `(row, shift)` pairs added on top of the noisy line
pub const INJECTED_EXTREMES: [(usize, f64); 3] = [(10, 15.0), (120, -13.0), (160, 18.0)];

/// `n` evenly spaced points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// `x` on `[0, 10]` and `y = 2.2x + 1 + N(0, 1.2)` with three extremes
pub fn synthetic_dataset(seed: u64) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, NOISE_STD)
        .map_err(|e| AnalysisError::invalid(format!("bad noise distribution: {}", e)))?;

    let x = linspace(0.0, 10.0, SYNTHETIC_ROWS);
    let mut y: Vec<f64> = x
        .iter()
        .map(|v| SLOPE * v + INTERCEPT + noise.sample(&mut rng))
        .collect();
    for (row, shift) in INJECTED_EXTREMES {
        y[row] += shift;
    }

    Dataset::from_columns(
        "outliers_homework",
        vec![("x", Column::numeric(x)), ("y", Column::numeric(y))],
    )
}
