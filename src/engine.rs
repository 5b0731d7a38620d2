use tracing::info;

use crate::config::OutlierConfig;
use crate::dataset::Dataset;
use crate::outliers::{
    flag_outliers_dataset, remove_outliers_dataset, winsorize_dataset, FlagColumnSet, Flagged,
    OutlierMethod,
};
use crate::sensitivity::{sensitivity_report, SensitivityReport};
use crate::utils::AnalysisError;
use crate::Result;

/// Everything the outlier stage produces for one target column
#[derive(Debug, Clone)]
pub struct OutlierArtifacts {
    pub target: String,
    /// Input plus IQR and z-score flag columns
    pub flagged: Dataset,
    /// Rows kept after removing IQR-flagged rows
    pub removed: Dataset,
    /// Flagged dataset with the target winsorized
    pub winsorized: Dataset,
    pub iqr_flags: FlagColumnSet,
    pub z_flags: FlagColumnSet,
}

/// Applies the configured outlier handling to datasets
#[derive(Debug, Clone, Default)]
pub struct OutlierEngine {
    config: OutlierConfig,
}

impl OutlierEngine {
    /// Create an engine with the given parameters
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    pub fn iqr_method(&self) -> OutlierMethod {
        OutlierMethod::iqr(self.config.k)
    }

    pub fn zscore_method(&self) -> OutlierMethod {
        OutlierMethod::zscore(self.config.threshold)
    }

    /// Suffix for `method`, namespaced when a custom suffix is configured so
    /// the two methods never write the same column
    fn suffix_for(&self, method: &OutlierMethod) -> String {
        match &self.config.flag_suffix {
            Some(custom) => match method {
                OutlierMethod::Iqr(_) => format!("{}_iqr", custom),
                OutlierMethod::ZScore(_) => format!("{}_z", custom),
            },
            None => method.default_suffix().to_string(),
        }
    }

    /// Pick the column to analyze
    ///
    /// The requested column if present, else `y` if numeric, else the first
    /// numeric column.
    pub fn resolve_target(dataset: &Dataset, requested: Option<&str>) -> Result<String> {
        if let Some(name) = requested.filter(|n| dataset.has_column(n)) {
            return Ok(name.to_string());
        }

        let target = if dataset.is_numeric("y") {
            "y".to_string()
        } else {
            dataset.numeric_column_names().into_iter().next().ok_or_else(|| {
                AnalysisError::ValidationError(
                    "no numeric columns found for outlier processing".to_string(),
                )
            })?
        };

        info!(column = %target, requested = ?requested, "target column auto-selected");
        Ok(target)
    }

    /// Flag `columns` with a single method
    pub fn flag_with(
        &self,
        dataset: &Dataset,
        columns: Option<&[&str]>,
        method: OutlierMethod,
    ) -> Result<Flagged> {
        let suffix = self.suffix_for(&method);
        flag_outliers_dataset(dataset, columns, method, Some(&suffix))
    }

    /// Flag `columns` with IQR, then z-score
    pub fn flag(&self, dataset: &Dataset, columns: Option<&[&str]>) -> Result<Flagged> {
        let iqr = self.flag_with(dataset, columns, self.iqr_method())?;
        let z = self.flag_with(&iqr.dataset, columns, self.zscore_method())?;
        Ok(Flagged {
            dataset: z.dataset,
            flag_columns: iqr.flag_columns.merge(&z.flag_columns),
        })
    }

    /// Drop rows flagged in `flags` (auto-detected when `None`) under the
    /// configured removal rule
    pub fn remove(&self, dataset: &Dataset, flags: Option<&FlagColumnSet>) -> Result<Dataset> {
        remove_outliers_dataset(dataset, flags, self.config.how)
    }

    pub fn winsorize(&self, dataset: &Dataset, columns: Option<&[&str]>) -> Result<Dataset> {
        winsorize_dataset(dataset, columns, self.config.lower, self.config.upper)
    }

    /// Run the full outlier stage on one target column
    pub fn process(&self, dataset: &Dataset, target: &str) -> Result<OutlierArtifacts> {
        dataset.numeric(target)?;
        let columns = [target];

        let iqr = self.flag_with(dataset, Some(&columns), self.iqr_method())?;
        let z = self.flag_with(&iqr.dataset, Some(&columns), self.zscore_method())?;
        let flagged = z.dataset;

        let removed = self.remove(&flagged, Some(&iqr.flag_columns))?;
        let winsorized = self.winsorize(&flagged, Some(&columns))?;

        info!(
            column = target,
            rows = flagged.n_rows(),
            removed = flagged.n_rows() - removed.n_rows(),
            "outlier stage done"
        );
        Ok(OutlierArtifacts {
            target: target.to_string(),
            flagged,
            removed,
            winsorized,
            iqr_flags: iqr.flag_columns,
            z_flags: z.flag_columns,
        })
    }

    /// Compare summaries and regressions across handling strategies
    pub fn sensitivity(
        &self,
        dataset: &Dataset,
        target: &str,
        predictor: &str,
    ) -> Result<SensitivityReport> {
        let options = self.config.sensitivity_options(predictor);
        sensitivity_report(dataset, target, &options)
    }
}
