//! Error types for claims data processing.
//!
//! Errors serialize to a `{code, message}` struct so callers (the CLI's JSON
//! output, training reports) can surface them without string matching.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for loading, feature building and statistics.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column the current step depends on is missing.
    #[error("Missing required column '{column}': {hint}")]
    MissingColumn { column: String, hint: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Imputation failed.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// A label was not seen while fitting the encoder.
    #[error("Label '{value}' in column '{column}' was not seen during fitting")]
    UnseenLabel { column: String, value: String },

    /// An integer code has no corresponding class.
    #[error("Code {code} in column '{column}' has no corresponding label")]
    UnknownCode { column: String, code: u32 },

    /// Not enough data to run a computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Train/test split could not be produced.
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::MissingColumn { .. } => "MISSING_COLUMN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::UnseenLabel { .. } => "UNSEEN_LABEL",
            Self::UnknownCode { .. } => "UNKNOWN_CODE",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
            Self::InvalidSplit(_) => "INVALID_SPLIT",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error stems from user input rather than a processing fault.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::FileNotFound(_)
            | Self::ColumnNotFound(_)
            | Self::MissingColumn { .. }
            | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ProcessingError::FileNotFound("x.txt".to_string()).error_code(),
            "FILE_NOT_FOUND"
        );
        assert_eq!(
            ProcessingError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_is_input_error() {
        assert!(ProcessingError::FileNotFound("a".to_string()).is_input_error());
        assert!(
            ProcessingError::ColumnNotFound("a".to_string())
                .with_context("While splitting")
                .is_input_error()
        );
        assert!(!ProcessingError::InsufficientData("a".to_string()).is_input_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::UnseenLabel {
            column: "Province".to_string(),
            value: "Atlantis".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNSEEN_LABEL"));
        assert!(json.contains("Atlantis"));
    }

    #[test]
    fn test_with_context() {
        let error = ProcessingError::ColumnNotFound("TotalClaims".to_string())
            .with_context("During severity split");
        assert!(error.to_string().contains("During severity split"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}
