//! Fast Outlier Engine - outlier detection and handling for tabular data
//!
//! This library flags outliers per column (IQR fences or z-scores), removes
//! or winsorizes them, and reports how much summary statistics and a simple
//! regression move under each strategy. A linear baseline for the next-day
//! return is available for price datasets.

pub mod arrow_handler;
pub mod cleaning;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod insight_core;
pub mod outliers;
pub mod sensitivity;
pub mod stats;
pub mod storage;
pub mod synthetic;
pub mod utils;

pub use config::{OutlierConfig, PipelineConfig};
pub use dataset::{Column, Dataset};
pub use engine::{OutlierArtifacts, OutlierEngine};
pub use outliers::{FlagColumnSet, Flagged, OutlierMask, OutlierMethod, RemovalRule};
pub use sensitivity::{SensitivityOptions, SensitivityReport};
pub use stats::{Statistics, Summary};
pub use utils::AnalysisError;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, AnalysisError>;
