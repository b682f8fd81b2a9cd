//! claims-learning: severity and probability models for insurance claims.
//!
//! This crate trains the two model families of the claims pipeline on the
//! encoded feature tables produced by `claims-processing`:
//!
//! - **Claim severity** (regression on claims-only rows): linear regression,
//!   random forest, gradient-boosted trees; scored with RMSE and R²
//! - **Claim probability** (classification on all rows): logistic regression
//!   and random forest on class-balanced data, gradient-boosted trees with
//!   claim rows weighted by `scale_pos_weight`; scored with accuracy and F1
//!
//! Fitted models persist as JSON with their feature names.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use claims_learning::{ModelTrainer, TrainerConfig, TrainedModel};
//!
//! let mut trainer = ModelTrainer::new(TrainerConfig::default());
//! trainer.train_severity_models(&x_train, &x_test, &y_train, &y_test)?;
//! println!("{}", trainer.results()?);
//!
//! trainer.save_model("Severity_GBT", "models/severity_model.json")?;
//! let model = TrainedModel::load("models/severity_model.json")?;
//! ```

pub mod balance;
pub mod cancellation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod model;
pub mod models;
pub mod trainer;
pub mod types;

pub use cancellation::CancellationToken;
pub use config::{ProblemType, TrainerConfig, TrainerConfigBuilder};
pub use dataset::Dataset;
pub use error::{LearningError, Result, ResultExt};
pub use model::TrainedModel;
pub use trainer::{
    ModelTrainer, PROBABILITY_GBT, PROBABILITY_LR, PROBABILITY_RF, SEVERITY_GBT, SEVERITY_LR,
    SEVERITY_RF,
};
pub use types::{Metrics, ModelResult, results_frame};

static_assertions::assert_impl_all!(ModelTrainer: Send, Sync);
static_assertions::assert_impl_all!(LearningError: Send, Sync);
