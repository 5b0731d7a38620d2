//! Interquartile-range (Tukey fence) detection
//!
//! Values below `Q1 - k*IQR` or above `Q3 + k*IQR` are outliers. Quartiles
//! use linear interpolation over the present values only.

use super::OutlierMask;
use crate::stats::{present_values, quantile_sorted};

/// Quartiles and fences computed from one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Compute fences, `None` if the column has no present values
    pub fn compute(values: &[Option<f64>], k: f64) -> Option<Self> {
        let mut present = present_values(values);
        present.sort_by(f64::total_cmp);

        let q1 = quantile_sorted(&present, 0.25)?;
        let q3 = quantile_sorted(&present, 0.75)?;
        let iqr = q3 - q1;

        Some(IqrBounds {
            q1,
            q3,
            iqr,
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
        })
    }

    /// Strictly outside the fences
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Flag values outside `[Q1 - k*IQR, Q3 + k*IQR]`
///
/// Missing positions are never flagged; an empty or all-missing column
/// yields an all-false mask.
pub fn detect_outliers_iqr(values: &[Option<f64>], k: f64) -> OutlierMask {
    let Some(bounds) = IqrBounds::compute(values, k) else {
        return OutlierMask::none(values.len());
    };

    values
        .iter()
        .map(|v| v.map_or(false, |x| bounds.is_outlier(x)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn col(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_iqr_bounds_reference_values() {
        let bounds = IqrBounds::compute(&col(&[10.0, 12.0, 11.0, 13.0, 9.0, 100.0]), 1.5).unwrap();
        assert!((bounds.q1 - 10.25).abs() < 1e-10);
        assert!((bounds.q3 - 12.75).abs() < 1e-10);
        assert!((bounds.iqr - 2.5).abs() < 1e-10);
        assert!((bounds.lower - 6.5).abs() < 1e-10);
        assert!((bounds.upper - 16.5).abs() < 1e-10);
    }

    #[test]
    fn test_iqr_flags_only_extreme_value() {
        let mask = detect_outliers_iqr(&col(&[10.0, 12.0, 11.0, 13.0, 9.0, 100.0]), 1.5);
        assert_eq!(mask.as_slice(), &[false, false, false, false, false, true]);
    }

    #[test]
    fn test_iqr_bounds_are_strict() {
        // Q1 = 2, Q3 = 4, IQR = 2, fences at k = 1: [0, 6]
        let values = col(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let bounds = IqrBounds::compute(&values, 1.0).unwrap();
        assert_eq!((bounds.lower, bounds.upper), (0.0, 6.0));
        assert!(!bounds.is_outlier(0.0));
        assert!(!bounds.is_outlier(6.0));
        assert!(bounds.is_outlier(6.0 + 1e-9));
        assert!(bounds.is_outlier(-1e-9));
    }

    #[test]
    fn test_iqr_missing_never_flagged() {
        let values = vec![Some(1.0), None, Some(2.0), Some(1.5), None, Some(50.0)];
        let mask = detect_outliers_iqr(&values, 1.5);
        assert_eq!(mask.len(), values.len());
        assert!(!mask.as_slice()[1]);
        assert!(!mask.as_slice()[4]);
        assert!(mask.as_slice()[5]);
    }

    #[test]
    fn test_iqr_degenerate_inputs() {
        assert!(detect_outliers_iqr(&[], 1.5).is_empty());
        assert_eq!(detect_outliers_iqr(&[None, None], 1.5).count(), 0);
        assert_eq!(detect_outliers_iqr(&[None, None], 1.5).len(), 2);
    }

    #[test]
    fn test_iqr_zero_iqr_flags_any_deviation() {
        let mask = detect_outliers_iqr(&col(&[5.0, 5.0, 5.0, 5.0, 6.0]), 1.5);
        assert_eq!(mask.indices(), vec![4]);
    }

    proptest! {
        #[test]
        fn flags_exactly_values_outside_fences(
            values in prop::collection::vec(-1e6f64..1e6, 1..60),
            k in 0.0f64..5.0,
        ) {
            let column = col(&values);
            let bounds = IqrBounds::compute(&column, k).unwrap();
            let mask = detect_outliers_iqr(&column, k);
            for (v, flagged) in values.iter().zip(mask.as_slice()) {
                prop_assert_eq!(*flagged, *v < bounds.lower || *v > bounds.upper);
            }
        }

        #[test]
        fn larger_k_never_flags_more(
            values in prop::collection::vec(-1e3f64..1e3, 1..60),
            k in 0.0f64..3.0,
            delta in 0.0f64..3.0,
        ) {
            let column = col(&values);
            let narrow = detect_outliers_iqr(&column, k).count();
            let wide = detect_outliers_iqr(&column, k + delta).count();
            prop_assert!(wide <= narrow);
        }

        #[test]
        fn missing_positions_stay_unflagged(
            values in prop::collection::vec(prop::option::of(-1e3f64..1e3), 0..60),
        ) {
            let mask = detect_outliers_iqr(&values, 1.5);
            prop_assert_eq!(mask.len(), values.len());
            for (v, flagged) in values.iter().zip(mask.as_slice()) {
                if v.is_none() {
                    prop_assert!(!*flagged);
                }
            }
        }
    }
}
