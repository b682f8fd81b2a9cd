//! Training and evaluation of the severity and probability model families.
//!
//! # Models
//!
//! | Key | Result name | Family |
//! |-----|-------------|--------|
//! | `Severity_LR` | `LinearRegression` | least squares |
//! | `Severity_RF` | `RandomForest_Reg` | random forest |
//! | `Severity_GBT` | `GradientBoosting_Reg` | gradient-boosted trees |
//! | `Probability_LR` | `LogisticRegression` | logistic regression, balanced |
//! | `Probability_RF` | `RandomForest_Clf` | random forest, balanced |
//! | `Probability_GBT` | `GradientBoosting_Clf` | gradient-boosted trees, weighted |
//!
//! The boosted models are skipped when `enable_boosting` is off.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use polars::prelude::*;
use tracing::{error, info};

use crate::balance::{ClassCounts, oversample_minority};
use crate::cancellation::CancellationToken;
use crate::config::{ProblemType, TrainerConfig};
use crate::dataset::Dataset;
use crate::error::{LearningError, Result, ResultExt};
use crate::metrics;
use crate::model::TrainedModel;
use crate::models::{
    BoostingObjective, FittedModel, ForestClassifier, ForestRegressor, GradientBoostedTrees,
    LinearModel, LogisticModel,
};
use crate::types::{Metrics, ModelResult, results_frame};

pub const SEVERITY_LR: &str = "Severity_LR";
pub const SEVERITY_RF: &str = "Severity_RF";
pub const SEVERITY_GBT: &str = "Severity_GBT";
pub const PROBABILITY_LR: &str = "Probability_LR";
pub const PROBABILITY_RF: &str = "Probability_RF";
pub const PROBABILITY_GBT: &str = "Probability_GBT";

/// Trains, evaluates and keeps the fitted models.
///
/// Models are stored under their key; evaluations are kept in training order.
/// Retraining a family replaces its models and result rows.
#[derive(Debug, Default)]
pub struct ModelTrainer {
    config: TrainerConfig,
    cancel: CancellationToken,
    models: HashMap<String, TrainedModel>,
    results: Vec<ModelResult>,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Use `token` to stop training between models.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit the severity (regression) models on claims-only rows.
    pub fn train_severity_models(
        &mut self,
        x_train: &DataFrame,
        x_test: &DataFrame,
        y_train: &Series,
        y_test: &Series,
    ) -> Result<()> {
        info!("Training Severity Models (Regression)...");
        let train = Dataset::from_frame(x_train, y_train).context("Severity training set")?;
        let test = Dataset::from_frame(x_test, y_test).context("Severity test set")?;
        check_same_features(&train, &test)?;

        self.cancel.check()?;
        let start = Instant::now();
        let model = FittedModel::LinearRegression(LinearModel::fit(&train)?);
        self.record(SEVERITY_LR, "LinearRegression", model, &train, &test, start)?;

        self.cancel.check()?;
        let start = Instant::now();
        let model = FittedModel::RandomForestRegressor(ForestRegressor::fit(&train, &self.config)?);
        self.record(SEVERITY_RF, "RandomForest_Reg", model, &train, &test, start)?;

        if self.config.enable_boosting {
            self.cancel.check()?;
            let start = Instant::now();
            let model = FittedModel::GradientBoostingRegressor(GradientBoostedTrees::fit(
                &train,
                BoostingObjective::SquaredError,
                &self.config,
                &self.cancel,
            )?);
            self.record(SEVERITY_GBT, "GradientBoosting_Reg", model, &train, &test, start)?;
        }
        Ok(())
    }

    /// Fit the claim probability (classification) models on all rows.
    pub fn train_probability_models(
        &mut self,
        x_train: &DataFrame,
        x_test: &DataFrame,
        y_train: &Series,
        y_test: &Series,
    ) -> Result<()> {
        info!("Training Probability Models (Classification)...");
        let train = Dataset::from_frame(x_train, y_train).context("Probability training set")?;
        let test = Dataset::from_frame(x_test, y_test).context("Probability test set")?;
        check_same_features(&train, &test)?;

        let counts = ClassCounts::from_labels(&train.class_labels()?);
        let scale_pos_weight = counts.scale_pos_weight();
        info!(
            "Class balance: {} claims, {} non-claims (scale_pos_weight {:.2})",
            counts.positive, counts.negative, scale_pos_weight
        );

        let balanced = if self.config.balance_classes {
            oversample_minority(&train, self.config.random_seed)?
        } else {
            train.clone()
        };

        self.cancel.check()?;
        let start = Instant::now();
        let model = FittedModel::LogisticRegression(LogisticModel::fit(&balanced)?);
        self.record(PROBABILITY_LR, "LogisticRegression", model, &balanced, &test, start)?;

        self.cancel.check()?;
        let start = Instant::now();
        let model =
            FittedModel::RandomForestClassifier(ForestClassifier::fit(&balanced, &self.config)?);
        self.record(PROBABILITY_RF, "RandomForest_Clf", model, &balanced, &test, start)?;

        if self.config.enable_boosting {
            self.cancel.check()?;
            let start = Instant::now();
            let model = FittedModel::GradientBoostingClassifier(GradientBoostedTrees::fit(
                &train,
                BoostingObjective::Logistic { scale_pos_weight },
                &self.config,
                &self.cancel,
            )?);
            self.record(PROBABILITY_GBT, "GradientBoosting_Clf", model, &train, &test, start)?;
        }
        Ok(())
    }

    /// Evaluate on the test set, log the scores and store the model.
    fn record(
        &mut self,
        key: &str,
        name: &str,
        model: FittedModel,
        train: &Dataset,
        test: &Dataset,
        start: Instant,
    ) -> Result<()> {
        let training_time_seconds = start.elapsed().as_secs_f64();
        let problem_type = model.problem_type();

        let metrics = match problem_type {
            ProblemType::Regression => {
                let preds = model.predict(test.features())?;
                let rmse = metrics::rmse(test.target(), &preds);
                let r2 = metrics::r2(test.target(), &preds);
                info!("[{}] RMSE: {:.2}, R2: {:.4}", name, rmse, r2);
                Metrics::regression(rmse, r2)
            }
            ProblemType::Classification => {
                let preds = model.predict_classes(test.features())?;
                let labels = test.class_labels()?;
                let acc = metrics::accuracy(&labels, &preds);
                let f1 = metrics::f1_score(&labels, &preds);
                info!("[{}] Accuracy: {:.4}, F1-Score: {:.4}", name, acc, f1);
                Metrics::classification(acc, f1)
            }
        };

        self.results.retain(|r| r.name != name);
        self.results.push(ModelResult {
            name: name.to_string(),
            key: key.to_string(),
            problem_type,
            metrics,
            train_rows: train.n_samples(),
            test_rows: test.n_samples(),
            training_time_seconds,
        });
        self.models.insert(
            key.to_string(),
            TrainedModel {
                key: key.to_string(),
                name: name.to_string(),
                problem_type,
                feature_names: train.feature_names().to_vec(),
                metrics,
                model,
            },
        );
        Ok(())
    }

    pub fn has_model(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    pub fn model(&self, key: &str) -> Option<&TrainedModel> {
        self.models.get(key)
    }

    /// Evaluations in training order.
    pub fn model_results(&self) -> &[ModelResult] {
        &self.results
    }

    /// Results as a table with one row per model.
    ///
    /// See [`results_frame`] for the column layout.
    pub fn results(&self) -> Result<DataFrame> {
        results_frame(&self.results)
    }

    /// Save the model stored under `key` as JSON.
    ///
    /// # Errors
    ///
    /// [`LearningError::ModelNotFound`] when no model was trained under `key`.
    pub fn save_model(&self, key: &str, path: impl AsRef<Path>) -> Result<()> {
        match self.models.get(key) {
            Some(model) => model.save(path),
            None => {
                error!("Model {} not found.", key);
                Err(LearningError::ModelNotFound {
                    key: key.to_string(),
                })
            }
        }
    }
}

fn check_same_features(train: &Dataset, test: &Dataset) -> Result<()> {
    if train.feature_names() != test.feature_names() {
        return Err(LearningError::InvalidData(
            "train and test sets have different feature columns".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TrainerConfig {
        TrainerConfig::builder().n_estimators(5).build().unwrap()
    }

    fn severity_frames() -> (DataFrame, DataFrame, Series, Series) {
        let premium: Vec<f64> = (0..24).map(|i| 100.0 + i as f64 * 10.0).collect();
        let age: Vec<f64> = (0..24).map(|i| (i % 7) as f64).collect();
        let claims: Vec<f64> = premium.iter().zip(&age).map(|(p, a)| 3.0 * p + 50.0 * a).collect();

        let x = DataFrame::new(vec![
            Column::new("TotalPremium".into(), premium),
            Column::new("VehicleAge".into(), age),
        ])
        .unwrap();
        let y = Series::new("TotalClaims".into(), claims);

        let train_idx = IdxCa::from_vec("idx".into(), (0..18).collect());
        let test_idx = IdxCa::from_vec("idx".into(), (18..24).collect());
        (
            x.take(&train_idx).unwrap(),
            x.take(&test_idx).unwrap(),
            y.take(&train_idx).unwrap(),
            y.take(&test_idx).unwrap(),
        )
    }

    #[test]
    fn test_train_severity_models() {
        let (x_train, x_test, y_train, y_test) = severity_frames();
        let mut trainer = ModelTrainer::new(small_config());
        trainer
            .train_severity_models(&x_train, &x_test, &y_train, &y_test)
            .unwrap();

        for key in [SEVERITY_LR, SEVERITY_RF, SEVERITY_GBT] {
            assert!(trainer.has_model(key), "missing {}", key);
        }
        let names: Vec<&str> = trainer.model_results().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["LinearRegression", "RandomForest_Reg", "GradientBoosting_Reg"]);

        // Target is an exact linear function of the features
        let lr = &trainer.model_results()[0].metrics;
        assert!(lr.r2.unwrap() > 0.999);

        let table = trainer.results().unwrap();
        assert_eq!(table.shape(), (3, 3));
        assert!(table.column("Accuracy").is_err());
    }

    #[test]
    fn test_boosting_disabled() {
        let (x_train, x_test, y_train, y_test) = severity_frames();
        let config = TrainerConfig::builder()
            .n_estimators(5)
            .enable_boosting(false)
            .build()
            .unwrap();
        let mut trainer = ModelTrainer::new(config);
        trainer
            .train_severity_models(&x_train, &x_test, &y_train, &y_test)
            .unwrap();

        assert!(!trainer.has_model(SEVERITY_GBT));
        assert_eq!(trainer.model_results().len(), 2);
    }

    #[test]
    fn test_cancelled_trainer_stops() {
        let (x_train, x_test, y_train, y_test) = severity_frames();
        let token = CancellationToken::new();
        token.cancel();

        let mut trainer = ModelTrainer::new(small_config()).with_cancellation(token);
        let err = trainer
            .train_severity_models(&x_train, &x_test, &y_train, &y_test)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(trainer.model_results().is_empty());
    }

    #[test]
    fn test_save_unknown_model() {
        let trainer = ModelTrainer::default();
        let dir = tempfile::tempdir().unwrap();
        let err = trainer
            .save_model("Severity_XGB", dir.path().join("m.json"))
            .unwrap_err();
        assert!(matches!(err, LearningError::ModelNotFound { .. }));
    }

    #[test]
    fn test_mismatched_features_rejected() {
        let (x_train, _, y_train, y_test) = severity_frames();
        let x_test = x_train.drop("VehicleAge").unwrap().head(Some(6));
        let mut trainer = ModelTrainer::new(small_config());
        let err = trainer
            .train_severity_models(&x_train, &x_test, &y_train, &y_test)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }
}
