//! Error types for the claims-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return [`Result<T>`].
//!
//! # Example
//!
//! ```no_run
//! use claims_learning::{LearningError, TrainerConfig};
//!
//! fn configure() -> Result<TrainerConfig, LearningError> {
//!     let config = TrainerConfig::builder()
//!         .n_estimators(50)
//!         .build()?;
//!     Ok(config)
//! }
//! ```

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for claims-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid trainer configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or inference.
    ///
    /// Common causes:
    /// - a feature column is not numeric (run label encoding first)
    /// - a feature column still contains nulls (run imputation first)
    /// - features and target have different lengths
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A model failed to fit.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// No trained model is registered under the requested key.
    #[error("Model not found: {key}")]
    ModelNotFound {
        /// The trainer key or file path that was not found.
        key: String,
    },

    /// Prediction failed, or the input does not match the model's features.
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// Training was cancelled through a [`CancellationToken`](crate::CancellationToken).
    #[error("Training cancelled")]
    Cancelled,

    /// I/O error during model save/load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization of a persisted model failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LearningError>,
    },
}

impl LearningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LearningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::InferenceError(_) => "INFERENCE_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True when the error is a cancellation, possibly wrapped in context.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

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
        self.map_err(|e| LearningError::Polars(e).with_context(context))
    }
}
