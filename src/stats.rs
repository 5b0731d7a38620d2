use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

/// Collect the present values of a column, skipping missing entries
pub fn present_values(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().filter(|v| !v.is_nan()).collect()
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile of already sorted values, linear interpolation between order statistics
///
/// `q` is clamped to `[0, 1]`. Returns `None` for empty input.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Quantile over the present values of a column
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(&present_values(values)), q)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(values), 0.5)
}

/// Standard deviation with `ddof` degrees of freedom removed from the divisor
///
/// `None` when fewer than `ddof + 1` values are available.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let mean = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (values.len() - ddof) as f64).sqrt())
}

/// Population standard deviation (divide by N)
pub fn population_std(values: &[f64]) -> Option<f64> {
    std_dev(values, 0)
}

/// Sample standard deviation (divide by N - 1)
pub fn sample_std(values: &[f64]) -> Option<f64> {
    std_dev(values, 1)
}

/// Statistics computed from a numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub field: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation, absent for a single value
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl Statistics {
    /// Compute statistics for a numeric field in a dataset
    pub fn compute(dataset: &Dataset, field: &str) -> Option<Self> {
        let values = dataset.column(field)?.as_numeric()?;
        Self::from_values(field, values)
    }

    /// Statistics for every numeric column with at least one present value
    pub fn describe(dataset: &Dataset) -> Vec<Self> {
        dataset
            .numeric_column_names()
            .iter()
            .filter_map(|name| Self::compute(dataset, name))
            .collect()
    }

    /// Compute statistics over a column's present values
    pub fn from_values(field: &str, values: &[Option<f64>]) -> Option<Self> {
        let present = present_values(values);
        if present.is_empty() {
            return None;
        }

        let count = present.len();
        let sum: f64 = present.iter().sum();
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Statistics {
            field: field.to_string(),
            count,
            missing: values.len() - count,
            mean: sum / count as f64,
            median: median(&present)?,
            std: sample_std(&present),
            min,
            max,
            sum,
        })
    }
}

/// Mean / median / standard deviation triple used in sensitivity reports
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation (N - 1)
    pub std: Option<f64>,
}

impl Summary {
    /// Summarize the present values of a column
    pub fn of(values: &[Option<f64>]) -> Self {
        let present = present_values(values);
        Summary {
            mean: mean(&present),
            median: median(&present),
            std: sample_std(&present),
        }
    }
}
