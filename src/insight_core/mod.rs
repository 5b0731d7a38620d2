/// Regression and feature-engineering helpers
pub mod evaluation;
pub mod feature;
pub mod model;

pub use evaluation::{evaluation_report, write_evaluation_report, EVALUATION_REPORT_FILE};
pub use feature::{add_return_features, validate_features};
pub use model::{
    fit_linear, paired_values, train_baseline, BaselineModel, LinearFit, RegressionMetrics,
};
