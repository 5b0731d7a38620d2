//! How much do summary statistics and a simple regression move when
//! outliers are dropped or clipped?

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::insight_core::{fit_linear, paired_values, LinearFit};
use crate::outliers::{
    flag_outliers_dataset, remove_outliers_dataset, winsorize_dataset, Flagged, OutlierMethod,
    RemovalRule, DEFAULT_IQR_K, DEFAULT_LOWER_QUANTILE, DEFAULT_UPPER_QUANTILE,
    DEFAULT_Z_THRESHOLD,
};
use crate::stats::Summary;
use crate::utils::format_float;
use crate::Result;

pub const SUMMARY_FILE: &str = "sensitivity_summary.csv";
pub const REGRESSION_FILE: &str = "regression_comparison.csv";

/// Parameters of one sensitivity run
#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityOptions {
    pub k: f64,
    pub threshold: f64,
    pub lower: f64,
    pub upper: f64,
    /// Regression predictor; the comparison is skipped when absent
    pub predictor: String,
}

impl Default for SensitivityOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_IQR_K,
            threshold: DEFAULT_Z_THRESHOLD,
            lower: DEFAULT_LOWER_QUANTILE,
            upper: DEFAULT_UPPER_QUANTILE,
            predictor: "x".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionComparison {
    pub predictor: String,
    pub all: Option<LinearFit>,
    pub filtered_iqr: Option<LinearFit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityReport {
    pub target: String,
    pub rows: usize,
    /// Rows left after dropping IQR-flagged rows
    pub filtered_rows: usize,
    /// Share of all rows flagged, in percent
    pub pct_flagged_iqr: f64,
    pub pct_flagged_z: f64,
    pub all: Summary,
    pub filtered_iqr: Summary,
    pub winsorized: Summary,
    pub regression: Option<RegressionComparison>,
}

/// Percent of rows with any flag set in `flagged.flag_columns`
fn flagged_pct(flagged: &Flagged) -> Result<f64> {
    let rows = flagged.dataset.n_rows();
    if rows == 0 {
        return Ok(0.0);
    }
    let mut hits = vec![false; rows];
    for name in flagged.flag_columns.names() {
        let flags = flagged.dataset.require(name)?.as_boolean().unwrap_or_default();
        for (hit, flag) in hits.iter_mut().zip(flags) {
            *hit |= *flag == Some(true);
        }
    }
    Ok(hits.iter().filter(|&&h| h).count() as f64 / rows as f64 * 100.0)
}

/// Compare the target column across the three handling strategies
///
/// Rows are flagged and dropped with the same dataset operations the outlier
/// stage uses, so a row with a missing target is never dropped.
pub fn sensitivity_report(
    dataset: &Dataset,
    target: &str,
    options: &SensitivityOptions,
) -> Result<SensitivityReport> {
    let values = dataset.numeric(target)?;
    let columns = [target];

    let iqr = flag_outliers_dataset(dataset, Some(&columns), OutlierMethod::iqr(options.k), None)?;
    let z = flag_outliers_dataset(
        dataset,
        Some(&columns),
        OutlierMethod::zscore(options.threshold),
        None,
    )?;
    let filtered = remove_outliers_dataset(&iqr.dataset, Some(&iqr.flag_columns), RemovalRule::Any)?;
    let winsorized = winsorize_dataset(dataset, Some(&columns), options.lower, options.upper)?;

    let regression = match (
        dataset.numeric(&options.predictor),
        filtered.numeric(&options.predictor),
    ) {
        (Ok(x_all), Ok(x_filtered)) => Some(compare_regressions(
            &options.predictor,
            (x_all, values),
            (x_filtered, filtered.numeric(target)?),
        )),
        _ => {
            info!(
                predictor = %options.predictor,
                "no numeric predictor column, skipping regression comparison"
            );
            None
        }
    };

    let report = SensitivityReport {
        target: target.to_string(),
        rows: dataset.n_rows(),
        filtered_rows: filtered.n_rows(),
        pct_flagged_iqr: flagged_pct(&iqr)?,
        pct_flagged_z: flagged_pct(&z)?,
        all: Summary::of(values),
        filtered_iqr: Summary::of(filtered.numeric(target)?),
        winsorized: Summary::of(winsorized.numeric(target)?),
        regression,
    };
    info!(
        column = target,
        pct_iqr = report.pct_flagged_iqr,
        pct_z = report.pct_flagged_z,
        "sensitivity comparison done"
    );
    Ok(report)
}

type Pair<'a> = (&'a [Option<f64>], &'a [Option<f64>]);

fn compare_regressions(name: &str, all: Pair<'_>, filtered: Pair<'_>) -> RegressionComparison {
    let fit = |label: &str, (x, y): Pair<'_>| -> Option<LinearFit> {
        let (px, py) = paired_values(x, y);
        match fit_linear(&px, &py) {
            Ok(fit) => Some(fit),
            Err(e) => {
                warn!(fit = label, error = %e, "regression skipped");
                None
            }
        }
    };

    RegressionComparison {
        predictor: name.to_string(),
        all: fit("all", all),
        filtered_iqr: fit("filtered_iqr", filtered),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_default()
}

impl SensitivityReport {
    /// `mean`/`median`/`std` rows against `all`/`filtered_iqr`/`winsorized`
    pub fn write_summary_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["", "all", "filtered_iqr", "winsorized"])?;

        let columns = [&self.all, &self.filtered_iqr, &self.winsorized];
        let rows: [(&str, fn(&Summary) -> Option<f64>); 3] = [
            ("mean", |s| s.mean),
            ("median", |s| s.median),
            ("std", |s| s.std),
        ];
        for (label, get) in rows {
            let mut record = vec![label.to_string()];
            record.extend(columns.iter().map(|s| cell(get(s))));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// One row per available fit; `false` when there is nothing to write
    pub fn write_regression_csv<W: Write>(&self, writer: W) -> Result<bool> {
        let Some(regression) = &self.regression else {
            return Ok(false);
        };
        let fits: Vec<(&str, &LinearFit)> = [
            ("all", regression.all.as_ref()),
            ("filtered_iqr", regression.filtered_iqr.as_ref()),
        ]
        .into_iter()
        .filter_map(|(label, fit)| Some((label, fit?)))
        .collect();
        if fits.is_empty() {
            return Ok(false);
        }

        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["", "slope", "intercept", "r2", "mae"])?;
        for (label, fit) in fits {
            writer.write_record([
                label.to_string(),
                format_float(fit.slope),
                format_float(fit.intercept),
                format_float(fit.r2),
                format_float(fit.mae),
            ])?;
        }
        writer.flush()?;
        Ok(true)
    }

    /// Write both artifacts under `dir`, returning the paths written
    pub fn write_artifacts(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        let summary_path = dir.join(SUMMARY_FILE);
        self.write_summary_csv(fs::File::create(&summary_path)?)?;
        written.push(summary_path);

        let mut buffer = Vec::new();
        if self.write_regression_csv(&mut buffer)? {
            let regression_path = dir.join(REGRESSION_FILE);
            fs::write(&regression_path, buffer)?;
            written.push(regression_path);
        }

        Ok(written)
    }
}
