/// Utility modules for error handling and cell conversions
pub mod error;
pub mod type_convert;

// Re-export commonly used types
pub use error::AnalysisError;
pub use type_convert::{format_bool, format_float, is_missing, normalize_float, parse_bool, parse_number};
