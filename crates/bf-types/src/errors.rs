use thiserror::Error;

/// Main error type for BoostFit
#[derive(Error, Debug)]
pub enum BfError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    #[error("Not implemented yet: unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Metric error: {0}")]
    Metric(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Dataset loading and conversion errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Label column not found: {label}")]
    LabelNotFound { label: String },

    #[error("Column {column} is not numeric: {data_type}")]
    NonNumericColumn { column: String, data_type: String },

    #[error("Feature schema mismatch: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Column length mismatch: {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Arrow error: {message}")]
    Arrow { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Data parsing error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Invalid split: {message}")]
    InvalidSplit { message: String },
}

/// Search space and optimizer errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Cannot sample parameter {parameter}: {message}")]
    Sampling { parameter: String, message: String },

    #[error("Optimizer rejected observation for {parameter}: {message}")]
    Report { parameter: String, message: String },

    #[error("Invalid parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Missing parameter: {parameter}")]
    MissingParameter { parameter: String },

    #[error("No completed trials")]
    NoTrials,
}

/// Boosting library errors
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("No model trained yet")]
    NotTrained,

    #[error("Unsupported objective: {objective}")]
    UnsupportedObjective { objective: String },

    #[error("Unsupported eval metric: {metric}")]
    UnsupportedEvalMetric { metric: String },

    #[error("Invalid booster parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Booster failure: {message}")]
    Booster { message: String },
}

/// Result type alias for BoostFit operations
pub type BfResult<T> = Result<T, BfError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::BfError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::BfError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::BfError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::LengthMismatch {
            column: "f0".to_string(),
            expected: 100,
            actual: 80,
        };

        assert!(error.to_string().contains("f0"));
        assert!(error.to_string().contains("100"));
        assert!(error.to_string().contains("80"));
    }

    #[test]
    fn test_error_conversion() {
        let search_error = SearchError::MissingParameter {
            parameter: "eta".to_string(),
        };
        let bf_error: BfError = search_error.into();

        match bf_error {
            BfError::Search(_) => (),
            _ => panic!("Expected Search error"),
        }
    }

    #[test]
    fn test_unknown_metric_message() {
        let err = BfError::UnknownMetric("f2".to_string());
        assert!(err.to_string().contains("Not implemented yet"));
        assert!(err.to_string().contains("f2"));
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        assert!(matches!(validation_err, BfError::Validation(_)));
        let internal_err = internal_error!("Something went wrong");
        assert!(matches!(internal_err, BfError::Internal(_)));
        let config_err = config_error!("Missing required field: {}", "label");
        assert!(config_err.to_string().contains("label"));
    }
}
