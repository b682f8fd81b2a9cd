//! Gradient-boosted regression trees.
//!
//! Each round fits a depth-limited regression tree to the negative gradient of
//! the loss and adds it to the ensemble, shrunk by the learning rate.
//!
//! - squared loss for severity: the gradient is the plain residual
//! - logistic loss for claim probability: the gradient is `y - p`, with
//!   claim rows weighted by `scale_pos_weight`

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::config::TrainerConfig;
use crate::dataset::{Dataset, to_dense_matrix};
use crate::error::{LearningError, Result};

const PROBABILITY_CLAMP: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "loss", rename_all = "snake_case")]
pub enum BoostingObjective {
    SquaredError,
    Logistic { scale_pos_weight: f64 },
}

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    objective: BoostingObjective,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl GradientBoostedTrees {
    /// Fit `config.n_estimators` rounds. Checks `cancel` before every round.
    pub fn fit(
        data: &Dataset,
        objective: BoostingObjective,
        config: &TrainerConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let x = data.to_dense_matrix();
        let y = data.target();
        let weights = sample_weights(y, objective);
        let base_score = base_score(y, &weights, objective);

        let params =
            DecisionTreeRegressorParameters::default().with_max_depth(config.boosting_max_depth);

        let mut raw = vec![base_score; y.len()];
        let mut trees = Vec::with_capacity(config.n_estimators);
        for round in 0..config.n_estimators {
            cancel.check()?;

            let gradient: Vec<f64> = y
                .iter()
                .zip(&raw)
                .zip(&weights)
                .map(|((&target, &score), &w)| match objective {
                    BoostingObjective::SquaredError => target - score,
                    BoostingObjective::Logistic { .. } => w * (target - sigmoid(score)),
                })
                .collect();

            let tree = Tree::fit(&x, &gradient, params.clone()).map_err(|e| {
                LearningError::TrainingFailed(format!(
                    "Failed to fit boosting round {}: {}",
                    round, e
                ))
            })?;
            let step = tree.predict(&x).map_err(|e| {
                LearningError::TrainingFailed(format!("Boosting round {} failed: {}", round, e))
            })?;
            for (score, delta) in raw.iter_mut().zip(step) {
                *score += config.learning_rate * delta;
            }
            trees.push(tree);
        }
        debug!("Fitted {} boosting rounds", trees.len());

        Ok(Self {
            objective,
            base_score,
            learning_rate: config.learning_rate,
            trees,
        })
    }

    pub fn objective(&self) -> BoostingObjective {
        self.objective
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    /// Raw additive scores: the prediction for squared loss, log-odds for logistic loss.
    pub fn decision_function(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        let x = to_dense_matrix(features);
        let mut raw = vec![self.base_score; features.nrows()];
        for tree in &self.trees {
            let step = tree
                .predict(&x)
                .map_err(|e| LearningError::InferenceError(format!("Prediction failed: {}", e)))?;
            for (score, delta) in raw.iter_mut().zip(step) {
                *score += self.learning_rate * delta;
            }
        }
        Ok(raw)
    }

    /// Regression values, or 0/1 class predictions at probability 0.5.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        let raw = self.decision_function(features)?;
        Ok(match self.objective {
            BoostingObjective::SquaredError => raw,
            BoostingObjective::Logistic { .. } => raw
                .into_iter()
                .map(|s| if sigmoid(s) >= 0.5 { 1.0 } else { 0.0 })
                .collect(),
        })
    }

    /// Claim probabilities. Errors for a squared-loss model.
    pub fn predict_proba(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        match self.objective {
            BoostingObjective::SquaredError => Err(LearningError::InferenceError(
                "probabilities are only defined for the logistic objective".to_string(),
            )),
            BoostingObjective::Logistic { .. } => Ok(self
                .decision_function(features)?
                .into_iter()
                .map(sigmoid)
                .collect()),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn sample_weights(y: &[f64], objective: BoostingObjective) -> Vec<f64> {
    match objective {
        BoostingObjective::SquaredError => vec![1.0; y.len()],
        BoostingObjective::Logistic { scale_pos_weight } => y
            .iter()
            .map(|&t| if t == 1.0 { scale_pos_weight } else { 1.0 })
            .collect(),
    }
}

/// Mean target for squared loss; weighted log-odds of the claim rate for logistic loss.
fn base_score(y: &[f64], weights: &[f64], objective: BoostingObjective) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    match objective {
        BoostingObjective::SquaredError => y.iter().sum::<f64>() / y.len() as f64,
        BoostingObjective::Logistic { .. } => {
            let total: f64 = weights.iter().sum();
            let positive: f64 = y.iter().zip(weights).map(|(t, w)| t * w).sum();
            let p = (positive / total).clamp(PROBABILITY_CLAMP, 1.0 - PROBABILITY_CLAMP);
            (p / (1.0 - p)).ln()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics;

    fn config(rounds: usize) -> TrainerConfig {
        TrainerConfig::builder()
            .n_estimators(rounds)
            .learning_rate(0.3)
            .boosting_max_depth(3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_regression_reduces_error() {
        let n = 30;
        let features = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let target: Vec<f64> = (0..n).map(|i| (i as f64 / 3.0).floor() * 10.0).collect();
        let data = Dataset::from_parts(vec!["x".into()], features, target.clone()).unwrap();

        let token = CancellationToken::new();
        let weak =
            GradientBoostedTrees::fit(&data, BoostingObjective::SquaredError, &config(1), &token)
                .unwrap();
        let strong =
            GradientBoostedTrees::fit(&data, BoostingObjective::SquaredError, &config(30), &token)
                .unwrap();
        assert_eq!(strong.n_rounds(), 30);

        let weak_rmse = metrics::rmse(&target, &weak.predict(data.features()).unwrap());
        let strong_rmse = metrics::rmse(&target, &strong.predict(data.features()).unwrap());
        assert!(strong_rmse < weak_rmse);
    }

    #[test]
    fn test_logistic_base_score_uses_weights() {
        let y = [1.0, 0.0, 0.0, 0.0];
        let objective = BoostingObjective::Logistic {
            scale_pos_weight: 3.0,
        };
        let weights = sample_weights(&y, objective);
        // Weighted claim rate is 0.5
        assert!(base_score(&y, &weights, objective).abs() < 1e-12);
    }

    #[test]
    fn test_classification_separates_classes() {
        let n = 40;
        let features = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let target: Vec<f64> = (0..n).map(|i| if i >= 30 { 1.0 } else { 0.0 }).collect();
        let data = Dataset::from_parts(vec!["x".into()], features, target.clone()).unwrap();

        let model = GradientBoostedTrees::fit(
            &data,
            BoostingObjective::Logistic {
                scale_pos_weight: 3.0,
            },
            &config(20),
            &CancellationToken::new(),
        )
        .unwrap();

        let preds = model.predict(data.features()).unwrap();
        assert_eq!(preds, target);

        let proba = model.predict_proba(data.features()).unwrap();
        assert!(proba[0] < 0.5 && proba[n - 1] > 0.5);
    }

    #[test]
    fn test_cancelled_before_first_round() {
        let features = Array2::from_shape_fn((4, 1), |(i, _)| i as f64);
        let data =
            Dataset::from_parts(vec!["x".into()], features, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let result =
            GradientBoostedTrees::fit(&data, BoostingObjective::SquaredError, &config(5), &token);
        assert!(matches!(result, Err(LearningError::Cancelled)));
    }
}
