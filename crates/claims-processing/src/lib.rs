//! Insurance claims data processing.
//!
//! Loading, feature engineering, imputation and label encoding of the
//! pipe-delimited policy/claims dataset, plus the hypothesis tests and
//! dashboard figures built on top of it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use claims_processing::{DataBuilder, ProcessingConfig, load_data_with};
//!
//! let config = ProcessingConfig::default();
//! let df = load_data_with("data/raw/MachineLearningRating.txt", &config)?;
//!
//! let mut builder = DataBuilder::with_config(df, config);
//! builder.preprocess()?;
//!
//! let (x, y) = builder.severity_data()?;
//! let split = builder.split_data(&x, &y)?;
//! println!("train rows: {}", split.x_train.height());
//! ```
//!
//! # Modules
//!
//! - [`loader`]: delimited file loading with full-file schema inference
//! - [`features`]: engineered columns, imputation, encoding, splitting
//! - [`stats`]: chi-squared, Welch t-test, ANOVA and descriptive helpers
//! - [`dashboard`]: figure data written as JSON

pub mod config;
pub mod dashboard;
pub mod error;
pub mod features;
pub mod loader;
pub mod stats;
pub mod utils;

pub use config::{ConfigValidationError, ProcessingConfig};
pub use dashboard::{DashboardGenerator, Figure};
pub use error::{ProcessingError, Result, ResultExt};
pub use features::{
    ColumnPreprocessor, DataBuilder, EncoderMap, FeatureColumns, ImputationSummary, LabelEncoder,
    SplitSizes, TrainTestSplit,
};
pub use loader::{load_data, load_data_with};
pub use stats::{Decision, TestOutcome, TestResult};

static_assertions::assert_impl_all!(DataBuilder: Send, Sync);
static_assertions::assert_impl_all!(ProcessingError: Send, Sync);
