use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::model::BaselineModel;
use crate::Result;

/// Default file name for the baseline evaluation report
pub const EVALUATION_REPORT_FILE: &str = "model_evaluation.md";

/// Render the held-out metrics and coefficients of `model` as Markdown
pub fn evaluation_report(model: &BaselineModel) -> String {
    let m = &model.metrics;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "# Model Evaluation Report\n");
    let _ = writeln!(
        out,
        "Linear baseline for the next-day daily return, trained on the first {} rows \
         and scored on the last {} rows.\n",
        model.n_train, model.n_test
    );

    let _ = writeln!(out, "## Performance Metrics\n");
    let _ = writeln!(out, "| metric | value |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| R² | {:.4} |", m.r2);
    let _ = writeln!(out, "| RMSE | {:.6} |", m.rmse);
    let _ = writeln!(out, "| MAE | {:.6} |", m.mae);

    let _ = writeln!(out, "\n## Coefficients\n");
    let _ = writeln!(out, "| feature | coefficient |");
    let _ = writeln!(out, "|---|---|");
    for (name, coef) in model.features.iter().zip(&model.coefficients) {
        let _ = writeln!(out, "| {} | {:.6} |", name, coef);
    }
    let _ = writeln!(out, "| (intercept) | {:.6} |", model.intercept);

    let _ = writeln!(out, "\n## Interpretation\n");
    let _ = writeln!(
        out,
        "- The model explains about {:.2}% of the variance of the held-out returns.",
        m.r2 * 100.0
    );
    let _ = writeln!(
        out,
        "- A typical prediction misses by about {:.2}% (RMSE), {:.2}% on average in absolute terms (MAE).",
        m.rmse * 100.0,
        m.mae * 100.0
    );
    out
}

/// Write the evaluation report for `model` to `path`, creating parent directories
pub fn write_evaluation_report(model: &BaselineModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, evaluation_report(model))?;
    debug!(path = %path.display(), "evaluation report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight_core::model::RegressionMetrics;

    fn model() -> BaselineModel {
        BaselineModel {
            features: vec!["close".to_string(), "daily_return".to_string()],
            coefficients: vec![0.25, -0.5],
            intercept: 0.01,
            n_train: 8,
            n_test: 2,
            metrics: RegressionMetrics {
                r2: 0.12346,
                rmse: 0.0123456,
                mae: 0.009,
            },
        }
    }

    #[test]
    fn test_evaluation_report_contents() {
        let text = evaluation_report(&model());
        assert!(text.starts_with("# Model Evaluation Report"));
        assert!(text.contains("first 8 rows"));
        assert!(text.contains("last 2 rows"));
        assert!(text.contains("| R² | 0.1235 |"));
        assert!(text.contains("| RMSE | 0.012346 |"));
        assert!(text.contains("| MAE | 0.009000 |"));
        assert!(text.contains("| daily_return | -0.500000 |"));
        assert!(text.contains("| (intercept) | 0.010000 |"));
        assert!(text.contains("about 12.35% of the variance"));
    }

    #[test]
    fn test_write_evaluation_report_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join(EVALUATION_REPORT_FILE);
        write_evaluation_report(&model(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), evaluation_report(&model()));
    }
}
