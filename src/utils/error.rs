/// Error type for dataset and outlier operations
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Unrecognized configuration value (method, removal rule, file format, ...)
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),
    /// Column name absent from the dataset
    #[error("NotFound: column '{0}'")]
    ColumnNotFound(String),
    /// Validation errors (e.g., ragged columns, empty input)
    #[error("ValidationError: {0}")]
    ValidationError(String),
    /// Arrow-related errors (parsing, schema mismatch)
    #[error("ArrowError: {0}")]
    ArrowError(String),
    /// Model fitting errors
    #[error("ModelError: {0}")]
    ModelError(String),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("CsvError: {0}")]
    Csv(#[from] csv::Error),
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidArgument(msg.into())
    }

    pub(crate) fn not_found(column: impl Into<String>) -> Self {
        AnalysisError::ColumnNotFound(column.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::ValidationError("test error".to_string());
        assert_eq!(err.to_string(), "ValidationError: test error");

        let err = AnalysisError::invalid("unsupported method: median");
        assert_eq!(err.to_string(), "InvalidArgument: unsupported method: median");

        let err = AnalysisError::not_found("price");
        assert_eq!(err.to_string(), "NotFound: column 'price'");

        let err = AnalysisError::ModelError("model test".to_string());
        assert_eq!(err.to_string(), "ModelError: model test");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: AnalysisError = io.into();
        assert!(matches!(err, AnalysisError::Io(_)));
        assert!(err.to_string().starts_with("IoError:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<AnalysisError>();
        assert_sync::<AnalysisError>();
    }
}
