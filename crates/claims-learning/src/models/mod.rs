//! Model families trained for claim severity and claim probability.

pub mod boosting;
pub mod forest;
pub mod linear;

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::ProblemType;
use crate::error::{LearningError, Result};

pub use boosting::{BoostingObjective, GradientBoostedTrees};
pub use forest::{ForestClassifier, ForestRegressor};
pub use linear::{LinearModel, LogisticModel, Standardizer};

/// A fitted estimator of any supported family.
#[derive(Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "model", rename_all = "snake_case")]
pub enum FittedModel {
    LinearRegression(LinearModel),
    RandomForestRegressor(ForestRegressor),
    GradientBoostingRegressor(GradientBoostedTrees),
    LogisticRegression(LogisticModel),
    RandomForestClassifier(ForestClassifier),
    GradientBoostingClassifier(GradientBoostedTrees),
}

impl FittedModel {
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::LinearRegression(_) => "linear_regression",
            Self::RandomForestRegressor(_) => "random_forest_regressor",
            Self::GradientBoostingRegressor(_) => "gradient_boosting_regressor",
            Self::LogisticRegression(_) => "logistic_regression",
            Self::RandomForestClassifier(_) => "random_forest_classifier",
            Self::GradientBoostingClassifier(_) => "gradient_boosting_classifier",
        }
    }

    pub fn problem_type(&self) -> ProblemType {
        match self {
            Self::LinearRegression(_)
            | Self::RandomForestRegressor(_)
            | Self::GradientBoostingRegressor(_) => ProblemType::Regression,
            Self::LogisticRegression(_)
            | Self::RandomForestClassifier(_)
            | Self::GradientBoostingClassifier(_) => ProblemType::Classification,
        }
    }

    /// Predictions as `f64`; classifiers yield 0.0 or 1.0.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        match self {
            Self::LinearRegression(m) => m.predict(features),
            Self::RandomForestRegressor(m) => m.predict(features),
            Self::GradientBoostingRegressor(m) | Self::GradientBoostingClassifier(m) => {
                m.predict(features)
            }
            Self::LogisticRegression(m) => Ok(as_f64(m.predict(features)?)),
            Self::RandomForestClassifier(m) => Ok(as_f64(m.predict(features)?)),
        }
    }

    /// Predicted class labels. Errors for regression models.
    pub fn predict_classes(&self, features: &Array2<f64>) -> Result<Vec<i32>> {
        match self {
            Self::LogisticRegression(m) => m.predict(features),
            Self::RandomForestClassifier(m) => m.predict(features),
            Self::GradientBoostingClassifier(m) => {
                Ok(m.predict(features)?.into_iter().map(|v| v as i32).collect())
            }
            _ => Err(LearningError::InferenceError(format!(
                "{} does not predict classes",
                self.algorithm()
            ))),
        }
    }
}

// smartcore estimators carry no useful Debug output
impl fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedModel")
            .field("algorithm", &self.algorithm())
            .finish()
    }
}

fn as_f64(labels: Vec<i32>) -> Vec<f64> {
    labels.into_iter().map(f64::from).collect()
}
