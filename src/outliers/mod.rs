//! Outlier detection and handling
//!
//! Detection primitives work on a single numeric column and return an
//! [`OutlierMask`]. Dataset-level operations apply them column by column and
//! always return a new [`Dataset`](crate::Dataset):
//!
//! - [`flag_outliers_dataset`] appends one boolean flag column per processed column
//! - [`remove_outliers_dataset`] drops flagged rows
//! - [`winsorize_dataset`] clips columns to quantile bounds

mod frame;
mod iqr;
mod winsorize;
mod zscore;

pub use frame::*;
pub use iqr::*;
pub use winsorize::*;
pub use zscore::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::AnalysisError;
use crate::Result;

/// Default IQR multiplier
pub const DEFAULT_IQR_K: f64 = 1.5;
/// Default absolute z-score cutoff
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;
/// Default winsorization quantiles
pub const DEFAULT_LOWER_QUANTILE: f64 = 0.05;
pub const DEFAULT_UPPER_QUANTILE: f64 = 0.95;

/// Parameters of the interquartile-range detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrConfig {
    /// Fence multiplier; negative values are accepted but make little sense
    pub k: f64,
}

impl Default for IqrConfig {
    fn default() -> Self {
        Self { k: DEFAULT_IQR_K }
    }
}

/// Parameters of the z-score detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreConfig {
    pub threshold: f64,
}

impl Default for ZScoreConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

/// Detection method together with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum OutlierMethod {
    Iqr(IqrConfig),
    ZScore(ZScoreConfig),
}

impl OutlierMethod {
    pub fn iqr(k: f64) -> Self {
        OutlierMethod::Iqr(IqrConfig { k })
    }

    pub fn zscore(threshold: f64) -> Self {
        OutlierMethod::ZScore(ZScoreConfig { threshold })
    }

    /// Build a method from its name and a key-value parameter map
    ///
    /// Keys not understood by the method are rejected, absent keys take
    /// their defaults.
    pub fn from_params(name: &str, params: &BTreeMap<String, f64>) -> Result<Self> {
        let mut method: OutlierMethod = name.parse()?;
        let method_name = method.name();
        for (key, &value) in params {
            match (&mut method, key.as_str()) {
                (OutlierMethod::Iqr(cfg), "k") => cfg.k = value,
                (OutlierMethod::ZScore(cfg), "threshold") => cfg.threshold = value,
                _ => {
                    return Err(AnalysisError::invalid(format!(
                        "unsupported parameter '{}' for method {}",
                        key, method_name
                    )))
                }
            }
        }
        Ok(method)
    }

    /// Method name as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr(_) => "iqr",
            OutlierMethod::ZScore(_) => "zscore",
        }
    }

    /// Suffix of the flag columns produced by this method
    pub fn default_suffix(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr(_) => "outlier_iqr",
            OutlierMethod::ZScore(_) => "outlier_z",
        }
    }

    /// Run the detector on one column
    pub fn detect(&self, values: &[Option<f64>]) -> OutlierMask {
        match self {
            OutlierMethod::Iqr(cfg) => detect_outliers_iqr(values, cfg.k),
            OutlierMethod::ZScore(cfg) => detect_outliers_zscore(values, cfg.threshold),
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = AnalysisError;

    /// Parse a method name with default parameters
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "iqr" => Ok(OutlierMethod::Iqr(IqrConfig::default())),
            "zscore" => Ok(OutlierMethod::ZScore(ZScoreConfig::default())),
            other => Err(AnalysisError::invalid(format!(
                "unsupported method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr(cfg) => write!(f, "iqr(k={})", cfg.k),
            OutlierMethod::ZScore(cfg) => write!(f, "zscore(threshold={})", cfg.threshold),
        }
    }
}

/// How flag columns combine when deciding whether to drop a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalRule {
    /// Drop a row if any selected flag is set
    #[default]
    Any,
    /// Drop a row only if every selected flag is set
    All,
}

impl RemovalRule {
    /// Whether a row with these flags should be dropped
    pub fn drops<I: IntoIterator<Item = bool>>(&self, flags: I) -> bool {
        let mut flags = flags.into_iter();
        match self {
            RemovalRule::Any => flags.any(|f| f),
            RemovalRule::All => flags.all(|f| f),
        }
    }
}

impl FromStr for RemovalRule {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "any" => Ok(RemovalRule::Any),
            "all" => Ok(RemovalRule::All),
            other => Err(AnalysisError::invalid(format!(
                "unsupported removal rule: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RemovalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalRule::Any => f.write_str("any"),
            RemovalRule::All => f.write_str("all"),
        }
    }
}

/// Per-position outlier flags aligned with a source column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutlierMask(Vec<bool>);

impl OutlierMask {
    /// Mask with no position flagged
    pub fn none(len: usize) -> Self {
        OutlierMask(vec![false; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<bool> {
        self.0
    }

    /// Number of flagged positions
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&f| f).count()
    }

    /// Fraction of positions flagged, 0 for an empty mask
    pub fn rate(&self) -> f64 {
        if self.0.is_empty() {
            0.0
        } else {
            self.count() as f64 / self.0.len() as f64
        }
    }

    /// Indices of flagged positions
    #[cfg(test)]
    pub(crate) fn indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| if f { Some(i) } else { None })
            .collect()
    }
}

impl From<Vec<bool>> for OutlierMask {
    fn from(flags: Vec<bool>) -> Self {
        OutlierMask(flags)
    }
}

impl FromIterator<bool> for OutlierMask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        OutlierMask(iter.into_iter().collect())
    }
}
