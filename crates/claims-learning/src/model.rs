//! Persisted models for inference.
//!
//! A [`TrainedModel`] bundles a fitted estimator with the feature names it was
//! trained on, so a later `predict` can select and order the right columns.
//!
//! # Example
//!
//! ```rust,ignore
//! trainer.save_model("Severity_GBT", "models/severity_model.json")?;
//!
//! let model = TrainedModel::load("models/severity_model.json")?;
//! let predictions = model.predict(&x_new)?;
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProblemType;
use crate::dataset::feature_matrix;
use crate::error::{LearningError, Result};
use crate::models::FittedModel;
use crate::types::Metrics;

/// A fitted model plus the metadata needed to score new data.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Trainer key, e.g. `Probability_GBT`.
    pub key: String,

    /// Result name, e.g. `GradientBoosting_Clf`.
    pub name: String,

    pub problem_type: ProblemType,

    /// Feature columns in training order.
    pub feature_names: Vec<String>,

    /// Test-set metrics recorded at training time.
    pub metrics: Metrics,

    pub model: FittedModel,
}

impl TrainedModel {
    /// Load a model written by [`save()`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`LearningError::ModelNotFound`] if the file does not exist
    /// - [`LearningError::Json`] if the file is not a saved model
    #[must_use = "returns the loaded model; use it or handle the error"]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LearningError::ModelNotFound {
                key: path.display().to_string(),
            });
        }

        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the model as JSON. Parent directories must exist.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Score the rows of `df`.
    ///
    /// `df` must contain every training feature; columns are selected by name,
    /// so order and extra columns do not matter.
    ///
    /// # Errors
    ///
    /// [`LearningError::InferenceError`] if a feature column is missing.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let missing: Vec<&str> = self
            .feature_names
            .iter()
            .filter(|name| df.column(name.as_str()).is_err())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(LearningError::InferenceError(format!(
                "input is missing feature columns: {}",
                missing.join(", ")
            )));
        }

        let selected = df.select(self.feature_names.iter().map(String::as_str))?;
        let (_, features) = feature_matrix(&selected)?;
        self.model.predict(&features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::models::LinearModel;

    fn fitted() -> TrainedModel {
        let x = df! {
            "TotalPremium" => &[1.0f64, 2.0, 3.0, 4.0, 5.0],
            "SumInsured" => &[10.0f64, 30.0, 20.0, 50.0, 40.0],
        }
        .unwrap();
        let y = Series::new("TotalClaims".into(), &[3.0f64, 5.0, 7.0, 9.0, 11.0]);
        let data = Dataset::from_frame(&x, &y).unwrap();

        TrainedModel {
            key: "Severity_LR".to_string(),
            name: "LinearRegression".to_string(),
            problem_type: ProblemType::Regression,
            feature_names: data.feature_names().to_vec(),
            metrics: Metrics::regression(0.0, 1.0),
            model: FittedModel::LinearRegression(LinearModel::fit(&data).unwrap()),
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = TrainedModel::load("/nonexistent/path/model.json");
        assert!(matches!(result, Err(LearningError::ModelNotFound { .. })));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("severity_model.json");

        let model = fitted();
        model.save(&path).unwrap();
        let loaded = TrainedModel::load(&path).unwrap();

        assert_eq!(loaded.key, "Severity_LR");
        assert_eq!(loaded.feature_names, vec!["TotalPremium", "SumInsured"]);
        assert_eq!(loaded.model.algorithm(), "linear_regression");
    }

    #[test]
    fn test_predict_selects_columns_by_name() {
        let model = fitted();
        // Reordered columns plus an unused one
        let df = df! {
            "SumInsured" => &[0.0f64],
            "Province" => &[3u32],
            "TotalPremium" => &[6.0f64],
        }
        .unwrap();

        let preds = model.predict(&df).unwrap();
        assert!((preds[0] - 13.0).abs() < 1e-6);
    }

    #[test]
    fn test_predict_missing_feature() {
        let model = fitted();
        let df = df! { "TotalPremium" => &[1.0f64] }.unwrap();
        let err = model.predict(&df).unwrap_err();
        assert_eq!(err.error_code(), "INFERENCE_ERROR");
        assert!(err.to_string().contains("SumInsured"));
    }
}
