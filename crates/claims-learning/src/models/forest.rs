//! Random forest regressor and classifier.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::config::TrainerConfig;
use crate::dataset::{Dataset, to_dense_matrix};
use crate::error::{LearningError, Result};

#[derive(Serialize, Deserialize)]
pub struct ForestRegressor {
    inner: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl ForestRegressor {
    pub fn fit(data: &Dataset, config: &TrainerConfig) -> Result<Self> {
        let x = data.to_dense_matrix();
        let y = data.target().to_vec();

        let mut params = RandomForestRegressorParameters::default()
            .with_n_trees(config.n_estimators as _)
            .with_seed(config.random_seed);
        if let Some(depth) = config.forest_max_depth {
            params = params.with_max_depth(depth);
        }

        let inner = RandomForestRegressor::fit(&x, &y, params).map_err(|e| {
            LearningError::TrainingFailed(format!("Failed to train random forest: {}", e))
        })?;
        Ok(Self { inner })
    }

    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        self.inner
            .predict(&to_dense_matrix(features))
            .map_err(|e| LearningError::InferenceError(format!("Prediction failed: {}", e)))
    }
}

#[derive(Serialize, Deserialize)]
pub struct ForestClassifier {
    inner: RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>,
}

impl ForestClassifier {
    pub fn fit(data: &Dataset, config: &TrainerConfig) -> Result<Self> {
        let x = data.to_dense_matrix();
        let y = data.class_labels()?;

        let mut params = RandomForestClassifierParameters::default()
            .with_n_trees(config.n_estimators as _)
            .with_seed(config.random_seed);
        if let Some(depth) = config.forest_max_depth {
            params = params.with_max_depth(depth);
        }

        let inner = RandomForestClassifier::fit(&x, &y, params).map_err(|e| {
            LearningError::TrainingFailed(format!("Failed to train random forest: {}", e))
        })?;
        Ok(Self { inner })
    }

    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<i32>> {
        self.inner
            .predict(&to_dense_matrix(features))
            .map_err(|e| LearningError::InferenceError(format!("Prediction failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrainerConfig {
        TrainerConfig::builder().n_estimators(10).build().unwrap()
    }

    fn step_data() -> Dataset {
        let n = 40;
        let features = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let target = (0..n).map(|i| if i < n / 2 { 0.0 } else { 1.0 }).collect();
        Dataset::from_parts(vec!["x".into(), "c".into()], features, target).unwrap()
    }

    #[test]
    fn test_forest_regressor_tracks_step() {
        let data = step_data();
        let model = ForestRegressor::fit(&data, &config()).unwrap();

        let probe = Array2::from_shape_vec((2, 2), vec![2.0, 1.0, 37.0, 1.0]).unwrap();
        let preds = model.predict(&probe).unwrap();
        assert!(preds[0] < 0.5);
        assert!(preds[1] > 0.5);
    }

    #[test]
    fn test_forest_classifier_tracks_step() {
        let data = step_data();
        let model = ForestClassifier::fit(&data, &config()).unwrap();

        let probe = Array2::from_shape_vec((2, 2), vec![1.0, 1.0, 38.0, 1.0]).unwrap();
        assert_eq!(model.predict(&probe).unwrap(), vec![0, 1]);
    }
}
