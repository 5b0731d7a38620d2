use ndarray::Array2;
use tracing::debug;

use crate::dataset::{Column, Dataset};
use crate::stats::{mean, sample_std};
use crate::utils::AnalysisError;

/// Rows per rolling window
pub const ROLLING_WINDOW: usize = 5;

pub const DAILY_RETURN: &str = "daily_return";
pub const ROLLING_AVG_CLOSE: &str = "rolling_avg_5d_close";
pub const ROLLING_VOL: &str = "rolling_vol_5d";

/// Validate feature matrix dimensions and values
///
/// # Arguments
/// * `features` - Feature matrix to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if invalid
pub fn validate_features(features: &Array2<f64>) -> Result<(), AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix cannot be empty".to_string(),
        ));
    }

    if features.ncols() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix must have at least one column".to_string(),
        ));
    }

    // Check for NaN or Inf values
    for value in features.iter() {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::ValidationError(
                "feature matrix contains NaN or Inf values".to_string(),
            ));
        }
    }

    Ok(())
}

/// Percent change from the previous row
///
/// Missing at row 0, when either value is missing, or when the previous
/// value is zero.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    out.extend(values.first().map(|_| None));
    out.extend(values.windows(2).map(|w| match (w[0], w[1]) {
        (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
        _ => None,
    }));
    out
}

/// Apply `f` to every full window ending at each row
///
/// Rows before the first full window, and windows holding a missing value,
/// produce missing.
fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = vec![None; values.len().min(window - 1)];
    out.extend(values.windows(window).map(|w| {
        let present: Option<Vec<f64>> = w.iter().copied().collect();
        present.and_then(|p| f(&p))
    }));
    out
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Rolling sample standard deviation (N-1)
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

/// Append return and rolling features derived from a price column
///
/// Adds `daily_return`, `rolling_avg_5d_close` and `rolling_vol_5d`; existing
/// columns of the same name are replaced.
pub fn add_return_features(dataset: &Dataset, close: &str) -> crate::Result<Dataset> {
    let prices = dataset.numeric(close)?;

    let returns = pct_change(prices);
    let avg = rolling_mean(prices, ROLLING_WINDOW);
    let vol = rolling_std(&returns, ROLLING_WINDOW);
    debug!(column = close, rows = prices.len(), "adding return features");

    dataset
        .clone()
        .with_column(DAILY_RETURN, Column::from_options(returns))?
        .with_column(ROLLING_AVG_CLOSE, Column::from_options(avg))?
        .with_column(ROLLING_VOL, Column::from_options(vol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_validate_features_valid() {
        let features = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        assert!(validate_features(&features).is_ok());
    }

    #[test]
    fn test_validate_features_empty_rows() {
        let features = Array2::<f64>::zeros((0, 2));
        assert!(validate_features(&features).is_err());
    }

    #[test]
    fn test_validate_features_empty_cols() {
        let features = Array2::<f64>::zeros((2, 0));
        assert!(validate_features(&features).is_err());
    }

    #[test]
    fn test_validate_features_with_nan() {
        let features = arr2(&[[1.0, f64::NAN], [3.0, 4.0]]);
        let result = validate_features(&features);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("NaN"));
    }

    #[test]
    fn test_validate_features_with_inf() {
        let features = arr2(&[[1.0, f64::INFINITY], [3.0, 4.0]]);
        let result = validate_features(&features);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Inf"));
    }

    #[test]
    fn test_pct_change_missing_and_zero() {
        let values = [Some(100.0), Some(110.0), None, Some(50.0), Some(0.0), Some(10.0)];
        let out = pct_change(&values);
        assert_eq!(out.len(), values.len());
        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - 0.1).abs() < 1e-10);
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);
        assert!((out[4].unwrap() + 1.0).abs() < 1e-10);
        assert_eq!(out[5], None);
        assert!(pct_change(&[]).is_empty());
    }

    #[test]
    fn test_rolling_needs_full_window() {
        let values: Vec<Option<f64>> = (1..=7).map(|i| Some(i as f64)).collect();
        let avg = rolling_mean(&values, 5);
        assert_eq!(&avg[..4], &[None, None, None, None]);
        assert_eq!(avg[4], Some(3.0));
        assert_eq!(avg[6], Some(5.0));

        let short = rolling_mean(&values[..3], 5);
        assert_eq!(short, vec![None, None, None]);
    }

    #[test]
    fn test_rolling_window_with_missing() {
        let values = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)];
        assert_eq!(rolling_mean(&values, 3), vec![None, None, None, None, None, Some(5.0)]);
        let vol = rolling_std(&[Some(1.0), Some(3.0)], 2);
        assert!((vol[1].unwrap() - 2f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_add_return_features() {
        let close: Vec<f64> = (0..8).map(|i| 100.0 + i as f64).collect();
        let ds = Dataset::from_columns("prices", vec![("close", Column::numeric(close))]).unwrap();

        let out = add_return_features(&ds, "close").unwrap();
        assert_eq!(out.column_names(), vec!["close", DAILY_RETURN, ROLLING_AVG_CLOSE, ROLLING_VOL]);
        assert_eq!(out.numeric(ROLLING_AVG_CLOSE).unwrap()[4], Some(102.0));
        // first full window of returns spans rows 1..=5
        let vol = out.numeric(ROLLING_VOL).unwrap();
        assert_eq!(vol[4], None);
        assert!(vol[5].is_some());
        assert_eq!(ds.n_columns(), 1);
    }

    #[test]
    fn test_add_return_features_missing_column() {
        let ds = Dataset::from_columns("prices", vec![("open", Column::numeric([1.0]))]).unwrap();
        assert!(matches!(
            add_return_features(&ds, "close"),
            Err(AnalysisError::ColumnNotFound(_))
        ));
    }
}
