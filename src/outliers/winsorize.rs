//! Quantile clipping (winsorization)

use crate::stats::{present_values, quantile_sorted};

/// Quantile clip bounds `(lo, hi)` over the present values
///
/// Uses the same linear interpolation as the IQR quartiles. `lower <= upper`
/// is a caller precondition and is not checked.
pub fn winsorize_bounds(values: &[Option<f64>], lower: f64, upper: f64) -> Option<(f64, f64)> {
    let mut present = present_values(values);
    present.sort_by(f64::total_cmp);
    Some((
        quantile_sorted(&present, lower)?,
        quantile_sorted(&present, upper)?,
    ))
}

/// Clip every present value to the `[lower, upper]` quantile range
///
/// Missing values pass through; a column with no present values is
/// returned unchanged.
pub fn winsorize_series(values: &[Option<f64>], lower: f64, upper: f64) -> Vec<Option<f64>> {
    match winsorize_bounds(values, lower, upper) {
        Some((lo, hi)) => clip_series(values, lo, hi),
        None => values.to_vec(),
    }
}

/// Clip present values to fixed bounds `[lo, hi]`; missing passes through
pub fn clip_series(values: &[Option<f64>], lo: f64, hi: f64) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| {
            v.map(|x| {
                if x < lo {
                    lo
                } else if x > hi {
                    hi
                } else {
                    x
                }
            })
        })
        .collect()
}
