use linfa::traits::{Fit, Predict};
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::feature::{pct_change, validate_features, DAILY_RETURN, ROLLING_AVG_CLOSE, ROLLING_VOL};
use crate::dataset::Dataset;
use crate::utils::AnalysisError;

/// Candidate baseline features, used in this order when present
pub const BASELINE_FEATURES: [&str; 8] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    DAILY_RETURN,
    ROLLING_AVG_CLOSE,
    ROLLING_VOL,
];

/// Share of rows held out for evaluation, as `1 / TEST_SPLIT_DIVISOR`
pub const TEST_SPLIT_DIVISOR: usize = 5;

/// Goodness-of-fit metrics for a set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    /// Compare `predictions` against `targets`
    ///
    /// R² is 1 for a constant target predicted exactly and 0 for a constant
    /// target predicted with error.
    pub fn compute(targets: &Array1<f64>, predictions: &Array1<f64>) -> Self {
        let n = targets.len().max(1) as f64;
        let residuals = targets - predictions;

        let mean_y = targets.sum() / n;
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let ss_tot: f64 = targets.iter().map(|v| (v - mean_y).powi(2)).sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            r2,
            rmse: (ss_res / n).sqrt(),
            mae: residuals.iter().map(|r| r.abs()).sum::<f64>() / n,
        }
    }
}

/// Univariate ordinary-least-squares fit and its in-sample error metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r2: f64,
    pub mae: f64,
    pub rmse: f64,
    /// Number of rows used for the fit
    pub n: usize,
}

/// Keep the rows where both `x` and `y` are present
pub fn paired_values(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip()
}

fn ensure_finite_targets(targets: &Array1<f64>) -> Result<(), AnalysisError> {
    if targets.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ValidationError(
            "target contains NaN or Inf values".to_string(),
        ));
    }
    Ok(())
}

/// Fit `y = slope * x + intercept`
///
/// # Arguments
/// * `x` - Predictor values
/// * `y` - Target values, same length as `x`
///
/// # Returns
/// * `Ok(LinearFit)` - Coefficients plus R², MAE and RMSE on the fitted rows
/// * `Err(AnalysisError)` - Empty or mismatched input, non-finite values,
///   fewer than two rows or a constant predictor
pub fn fit_linear(x: &[f64], y: &[f64]) -> Result<LinearFit, AnalysisError> {
    if x.is_empty() || y.is_empty() {
        return Err(AnalysisError::ValidationError("empty input data".to_string()));
    }

    if x.len() != y.len() {
        return Err(AnalysisError::ValidationError(format!(
            "x length ({}) must match y length ({})",
            x.len(),
            y.len()
        )));
    }

    let n = x.len();
    if n < 2 {
        return Err(AnalysisError::ModelError(
            "at least 2 rows are required for a linear fit".to_string(),
        ));
    }

    if x.iter().all(|&v| v == x[0]) {
        return Err(AnalysisError::ModelError(
            "predictor is constant, slope is undefined".to_string(),
        ));
    }

    let features = Array2::from_shape_vec((n, 1), x.to_vec())
        .map_err(|e| AnalysisError::ModelError(format!("failed to create feature matrix: {}", e)))?;
    validate_features(&features)?;

    let targets = Array1::from(y.to_vec());
    ensure_finite_targets(&targets)?;

    let dataset = linfa::Dataset::new(features.clone(), targets.clone());
    let model = LinearRegression::default()
        .fit(&dataset)
        .map_err(|e| AnalysisError::ModelError(format!("linear regression failed: {}", e)))?;

    let predictions: Array1<f64> = model.predict(&features);
    let metrics = RegressionMetrics::compute(&targets, &predictions);

    Ok(LinearFit {
        slope: model.params()[0],
        intercept: model.intercept(),
        r2: metrics.r2,
        mae: metrics.mae,
        rmse: metrics.rmse,
        n,
    })
}

/// Rows for training and held-out evaluation under a chronological split
///
/// The last `ceil(n / TEST_SPLIT_DIVISOR)` rows are held out; nothing is shuffled.
pub fn chronological_split(n: usize) -> (usize, usize) {
    let n_test = n.div_ceil(TEST_SPLIT_DIVISOR);
    (n - n_test, n_test)
}

/// Value `steps` rows ahead, missing past the end
pub fn shift_ahead(values: &[Option<f64>], steps: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| values.get(i + steps).copied().flatten())
        .collect()
}

/// Feature rows aligned with the next-day return
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineDesign {
    pub features: Vec<String>,
    /// One entry per complete row, in dataset order
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

/// Build the baseline design matrix
///
/// The target at row `t` is the daily return at `t + 1`. The daily return
/// comes from the `daily_return` column, or is derived from `close` when that
/// column is absent. Rows with any missing feature or target are dropped.
pub fn baseline_design(dataset: &Dataset) -> crate::Result<BaselineDesign> {
    let returns = if dataset.has_column(DAILY_RETURN) {
        dataset.numeric(DAILY_RETURN)?.to_vec()
    } else {
        pct_change(dataset.numeric("close")?)
    };
    let target = shift_ahead(&returns, 1);

    let mut features = Vec::new();
    let mut columns: Vec<&[Option<f64>]> = Vec::new();
    for name in BASELINE_FEATURES {
        if name == DAILY_RETURN {
            features.push(name.to_string());
            columns.push(&returns);
        } else if dataset.is_numeric(name) {
            features.push(name.to_string());
            columns.push(dataset.numeric(name)?);
        }
    }

    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for (i, y) in target.iter().enumerate() {
        let row: Option<Vec<f64>> = columns.iter().map(|c| c[i]).collect();
        if let (Some(row), Some(y)) = (row, y) {
            rows.push(row);
            targets.push(*y);
        }
    }

    Ok(BaselineDesign {
        features,
        rows,
        targets,
    })
}

/// Multivariate linear baseline for the next-day return with held-out metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineModel {
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub n_train: usize,
    pub n_test: usize,
    /// Metrics on the held-out rows
    pub metrics: RegressionMetrics,
}

fn to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<Array2<f64>, AnalysisError> {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), n_features), flat)
        .map_err(|e| AnalysisError::ModelError(format!("failed to create feature matrix: {}", e)))
}

/// Fit the next-day return baseline and score it on the held-out rows
pub fn train_baseline(dataset: &Dataset) -> crate::Result<BaselineModel> {
    let design = baseline_design(dataset)?;
    let (n_train, n_test) = chronological_split(design.rows.len());
    if n_train < 2 {
        return Err(AnalysisError::ModelError(format!(
            "{} complete rows leave too few for training",
            design.rows.len()
        )));
    }

    let p = design.features.len();
    let train_x = to_matrix(&design.rows[..n_train], p)?;
    let test_x = to_matrix(&design.rows[n_train..], p)?;
    validate_features(&train_x)?;
    validate_features(&test_x)?;

    let train_y = Array1::from(design.targets[..n_train].to_vec());
    let test_y = Array1::from(design.targets[n_train..].to_vec());
    ensure_finite_targets(&train_y)?;
    ensure_finite_targets(&test_y)?;

    let model = LinearRegression::default()
        .fit(&linfa::Dataset::new(train_x, train_y))
        .map_err(|e| AnalysisError::ModelError(format!("linear regression failed: {}", e)))?;

    let predictions: Array1<f64> = model.predict(&test_x);
    let metrics = RegressionMetrics::compute(&test_y, &predictions);
    info!(
        features = p,
        n_train,
        n_test,
        r2 = metrics.r2,
        rmse = metrics.rmse,
        "baseline model trained"
    );

    Ok(BaselineModel {
        features: design.features,
        coefficients: model.params().to_vec(),
        intercept: model.intercept(),
        n_train,
        n_test,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    #[test]
    fn test_fit_linear_exact_line() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0]; // y = 2x + 1

        let fit = fit_linear(&x, &y).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-8);
        assert!((fit.intercept - 1.0).abs() < 1e-8);
        assert!((fit.r2 - 1.0).abs() < 1e-8);
        assert!(fit.mae < 1e-8);
        assert!(fit.rmse < 1e-8);
        assert_eq!(fit.n, 4);
    }

    #[test]
    fn test_fit_linear_noisy_metrics() {
        // residuals around y = x: +1, -1, +1, -1
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 0.0, 3.0, 2.0];

        let fit = fit_linear(&x, &y).unwrap();
        assert!((fit.slope - 0.6).abs() < 1e-8);
        assert!((fit.intercept - 0.6).abs() < 1e-8);
        assert!(fit.r2 > 0.0 && fit.r2 < 1.0);
        assert!(fit.mae > 0.0);
    }

    #[test]
    fn test_fit_linear_dimension_mismatch() {
        assert!(matches!(
            fit_linear(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::ValidationError(_))
        ));
    }

    #[test]
    fn test_fit_linear_degenerate_inputs() {
        assert!(fit_linear(&[], &[]).is_err());
        assert!(matches!(fit_linear(&[1.0], &[1.0]), Err(AnalysisError::ModelError(_))));
        assert!(matches!(
            fit_linear(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::ModelError(_))
        ));
        assert!(fit_linear(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
        assert!(fit_linear(&[1.0, 2.0], &[1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_paired_values_drops_incomplete_rows() {
        let x = [Some(1.0), None, Some(3.0), Some(4.0)];
        let y = [Some(2.0), Some(5.0), None, Some(8.0)];
        let (px, py) = paired_values(&x, &y);
        assert_eq!(px, vec![1.0, 4.0]);
        assert_eq!(py, vec![2.0, 8.0]);
    }

    fn next_return_frame(n: usize) -> Dataset {
        // next return = 0.5 * close + 0.1
        let close: Vec<f64> = (0..n).map(|t| ((t * 7) % 11) as f64 + 1.0).collect();
        let mut returns = vec![0.3];
        returns.extend(close[..n - 1].iter().map(|c| 0.5 * c + 0.1));
        Dataset::from_columns(
            "prices",
            vec![
                ("date", Column::text((0..n).map(|t| format!("d{}", t)))),
                ("close", Column::numeric(close)),
                (DAILY_RETURN, Column::numeric(returns)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_chronological_split_boundary() {
        assert_eq!(chronological_split(10), (8, 2));
        assert_eq!(chronological_split(11), (8, 3));
        assert_eq!(chronological_split(19), (15, 4));
        assert_eq!(chronological_split(1), (0, 1));
        assert_eq!(chronological_split(0), (0, 0));
    }

    #[test]
    fn test_shift_ahead() {
        let values = [Some(1.0), None, Some(3.0), Some(4.0)];
        assert_eq!(shift_ahead(&values, 1), vec![None, Some(3.0), Some(4.0), None]);
        assert_eq!(shift_ahead(&values, 0), values.to_vec());
    }

    #[test]
    fn test_baseline_design_aligns_next_return() {
        let design = baseline_design(&next_return_frame(6)).unwrap();
        assert_eq!(design.features, vec!["close".to_string(), DAILY_RETURN.to_string()]);
        // last row has no next-day return
        assert_eq!(design.rows.len(), 5);
        assert_eq!(design.rows[0], vec![1.0, 0.3]);
        assert_eq!(design.targets[0], 0.5 * 1.0 + 0.1);
        for (row, target) in design.rows.iter().zip(&design.targets) {
            assert!((target - (0.5 * row[0] + 0.1)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_baseline_design_derives_returns_from_close() {
        let frame = Dataset::from_columns(
            "prices",
            vec![("close", Column::from_options(vec![Some(10.0), Some(11.0), None, Some(12.0), Some(15.0)]))],
        )
        .unwrap();
        let design = baseline_design(&frame).unwrap();
        assert_eq!(design.features, vec!["close".to_string(), DAILY_RETURN.to_string()]);
        // no row has close, its return and the next return all present
        assert_eq!(design.rows.len(), 0);

        let frame = Dataset::from_columns(
            "prices",
            vec![("close", Column::numeric([10.0, 11.0, 12.1, 12.1]))],
        )
        .unwrap();
        let design = baseline_design(&frame).unwrap();
        assert_eq!(design.rows.len(), 2);
        assert!((design.rows[0][1] - 0.1).abs() < 1e-12);
        assert!((design.targets[0] - 0.1).abs() < 1e-12);
        assert!(design.targets[1].abs() < 1e-12);
    }

    #[test]
    fn test_baseline_design_requires_price_or_return() {
        let frame = Dataset::from_columns("x", vec![("volume", Column::numeric([1.0, 2.0]))]).unwrap();
        assert!(matches!(
            baseline_design(&frame),
            Err(AnalysisError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_train_baseline_recovers_linear_relation() {
        let model = train_baseline(&next_return_frame(20)).unwrap();
        assert_eq!(model.n_train, 15);
        assert_eq!(model.n_test, 4);
        assert_eq!(model.coefficients.len(), 2);
        assert!((model.coefficients[0] - 0.5).abs() < 1e-6);
        assert!(model.coefficients[1].abs() < 1e-6);
        assert!((model.intercept - 0.1).abs() < 1e-6);
        assert!(model.metrics.r2 > 0.9999);
        assert!(model.metrics.rmse < 1e-6);
        assert!(model.metrics.mae < 1e-6);
    }

    #[test]
    fn test_train_baseline_too_few_rows() {
        assert!(matches!(
            train_baseline(&next_return_frame(3)),
            Err(AnalysisError::ModelError(_))
        ));
    }

    #[test]
    fn test_regression_metrics_constant_target() {
        let targets = Array1::from(vec![2.0, 2.0]);
        assert_eq!(RegressionMetrics::compute(&targets, &targets).r2, 1.0);
        let off = RegressionMetrics::compute(&targets, &Array1::from(vec![1.0, 3.0]));
        assert_eq!(off.r2, 0.0);
        assert_eq!(off.mae, 1.0);
        assert_eq!(off.rmse, 1.0);
    }
}
