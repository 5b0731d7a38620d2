//! Z-score detection against the column's own mean and population deviation

use super::OutlierMask;
use crate::stats::{mean, population_std, present_values};

/// Mean and population standard deviation of the present values
///
/// `None` when the column has no present values or zero/non-finite spread,
/// in which case no z-score is meaningful.
pub fn zscore_params(values: &[Option<f64>]) -> Option<(f64, f64)> {
    let present = present_values(values);
    // identical values: the computed spread may be rounding noise, not zero
    if present.windows(2).all(|w| w[0] == w[1]) {
        return None;
    }
    let mu = mean(&present)?;
    let sigma = population_std(&present)?;
    if sigma == 0.0 || !sigma.is_finite() {
        return None;
    }
    Some((mu, sigma))
}

/// Z-score of every position; missing stays missing
pub fn zscores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    match zscore_params(values) {
        Some((mu, sigma)) => values.iter().map(|v| v.map(|x| (x - mu) / sigma)).collect(),
        None => vec![None; values.len()],
    }
}

/// Flag values whose absolute z-score is strictly above `threshold`
///
/// Zero-variance, empty and all-missing columns yield an all-false mask.
pub fn detect_outliers_zscore(values: &[Option<f64>], threshold: f64) -> OutlierMask {
    zscores(values)
        .into_iter()
        .map(|z| z.map_or(false, |z| z.abs() > threshold))
        .collect()
}
