//! Pipeline configuration: defaults, optional JSON file, `DATA_DIR` override

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::insight_core::EVALUATION_REPORT_FILE;
use crate::outliers::{
    RemovalRule, DEFAULT_IQR_K, DEFAULT_LOWER_QUANTILE, DEFAULT_UPPER_QUANTILE,
    DEFAULT_Z_THRESHOLD,
};
use crate::sensitivity::SensitivityOptions;
use crate::Result;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_SEED: u64 = 69;

/// Outlier handling parameters shared by every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub k: f64,
    pub threshold: f64,
    pub lower: f64,
    pub upper: f64,
    pub how: RemovalRule,
    /// Overrides the per-method flag suffix when set
    pub flag_suffix: Option<String>,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_IQR_K,
            threshold: DEFAULT_Z_THRESHOLD,
            lower: DEFAULT_LOWER_QUANTILE,
            upper: DEFAULT_UPPER_QUANTILE,
            how: RemovalRule::Any,
            flag_suffix: None,
        }
    }
}

impl OutlierConfig {
    /// Sensitivity parameters for a regression on `predictor`
    pub fn sensitivity_options(&self, predictor: &str) -> SensitivityOptions {
        SensitivityOptions {
            k: self.k,
            threshold: self.threshold,
            lower: self.lower,
            upper: self.upper,
            predictor: predictor.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    /// Raw dataset; defaults to `raw/outliers_homework.csv` under `data_dir`
    pub data: Option<PathBuf>,
    pub target: Option<String>,
    pub predictor: String,
    pub seed: u64,
    pub outliers: OutlierConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            data: None,
            target: None,
            predictor: "x".to_string(),
            seed: DEFAULT_SEED,
            outliers: OutlierConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, overlaid by the JSON file if given, then by `DATA_DIR`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                Self::from_json_str(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_data_dir(env::var(DATA_DIR_ENV).ok());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace `data_dir` with a non-empty override
    pub fn apply_data_dir(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.data
            .clone()
            .unwrap_or_else(|| self.data_dir.join("raw").join("outliers_homework.csv"))
    }

    pub fn interim_dir(&self) -> PathBuf {
        self.data_dir.join("interim")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn cleaned_path(&self) -> PathBuf {
        self.processed_dir().join("cleaned.csv")
    }

    pub fn flagged_path(&self) -> PathBuf {
        self.interim_dir().join("with_outlier_flags.csv")
    }

    pub fn removed_path(&self) -> PathBuf {
        self.processed_dir().join("removed_outliers.csv")
    }

    pub fn winsorized_path(&self) -> PathBuf {
        self.processed_dir().join("winsorized.csv")
    }

    pub fn features_path(&self) -> PathBuf {
        self.processed_dir().join("features.csv")
    }

    pub fn evaluation_path(&self) -> PathBuf {
        self.processed_dir().join(EVALUATION_REPORT_FILE)
    }
}
