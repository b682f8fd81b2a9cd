//! claims-pipeline: end-to-end insurance claims analytics.
//!
//! Ties `claims-processing` and `claims-learning` together: load the raw
//! policy file, build features, train the severity and probability models,
//! save the preferred model of each family and write a training report.
//! The same configuration drives the dashboard, hypothesis test and
//! inspection commands of the `claims-pipeline` binary.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use claims_pipeline::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::from_file("pipeline.json")?.with_env_overrides();
//! let report = Pipeline::builder().config(config).build()?.run()?;
//!
//! println!("--- Final Results ---");
//! println!("{}", report.results_table()?);
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod report;

pub use claims_learning::CancellationToken;
pub use config::{DATA_PATH_ENV, PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, Result, ResultExt};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
pub use report::{Artifacts, ColumnInfo, DatasetSummary, StageRows, TrainingReport};

static_assertions::assert_impl_all!(PipelineError: Send, Sync);
static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
