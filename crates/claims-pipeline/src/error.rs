//! Error types for the end-to-end pipeline.

use claims_learning::LearningError;
use claims_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Errors raised while running the pipeline or one of its commands.
///
/// Errors from the processing and learning crates are wrapped as-is and keep
/// their own error codes.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The raw data file does not exist.
    #[error("Data file not found: {0}")]
    DataNotFound(String),

    /// Invalid pipeline configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Loading, feature building, statistics or dashboard failure.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Training, evaluation or model persistence failure.
    #[error(transparent)]
    Learning(#[from] LearningError),

    /// The run was cancelled through its token.
    #[error("Pipeline cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DataNotFound(_) => "DATA_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Processing(e) => e.error_code(),
            Self::Learning(e) => e.error_code(),
            Self::Cancelled => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True if the run stopped because cancellation was requested, including
    /// cancellation observed inside the trainer.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Learning(e) => e.is_cancelled(),
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<PipelineError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
