//! Linear baselines: ordinary least squares and logistic regression.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};

use crate::dataset::{Dataset, to_dense_matrix};
use crate::error::{LearningError, Result};

/// Least-squares regression, solved by SVD so collinear features do not fail the fit.
#[derive(Serialize, Deserialize)]
pub struct LinearModel {
    inner: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

impl LinearModel {
    pub fn fit(data: &Dataset) -> Result<Self> {
        let x = data.to_dense_matrix();
        let y = data.target().to_vec();

        let params =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let inner = LinearRegression::fit(&x, &y, params).map_err(|e| {
            LearningError::TrainingFailed(format!("Failed to train linear regression: {}", e))
        })?;

        Ok(Self { inner })
    }

    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        self.inner
            .predict(&to_dense_matrix(features))
            .map_err(|e| LearningError::InferenceError(format!("Prediction failed: {}", e)))
    }
}

/// Per-feature z-scaling fitted on the training rows.
///
/// Columns with zero spread keep a unit scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    pub fn fit(features: &Array2<f64>) -> Self {
        let n = features.nrows().max(1) as f64;
        let mut means = Vec::with_capacity(features.ncols());
        let mut scales = Vec::with_capacity(features.ncols());

        for column in features.axis_iter(Axis(1)) {
            let mean = column.sum() / n;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            means.push(mean);
            scales.push(if sd > 0.0 && sd.is_finite() { sd } else { 1.0 });
        }

        Self { means, scales }
    }

    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.means.len() {
            return Err(LearningError::InferenceError(format!(
                "expected {} features, got {}",
                self.means.len(),
                features.ncols()
            )));
        }
        Ok(Array2::from_shape_fn(features.dim(), |(i, j)| {
            (features[[i, j]] - self.means[j]) / self.scales[j]
        }))
    }
}

/// Binary logistic regression on standardized features.
#[derive(Serialize, Deserialize)]
pub struct LogisticModel {
    scaler: Standardizer,
    inner: LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>>,
}

impl LogisticModel {
    pub fn fit(data: &Dataset) -> Result<Self> {
        let labels = data.class_labels()?;
        let scaler = Standardizer::fit(data.features());
        let x = to_dense_matrix(&scaler.transform(data.features())?);

        let params = LogisticRegressionParameters::default();
        let inner = LogisticRegression::fit(&x, &labels, params).map_err(|e| {
            LearningError::TrainingFailed(format!("Failed to train logistic regression: {}", e))
        })?;

        Ok(Self { scaler, inner })
    }

    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<i32>> {
        let x = to_dense_matrix(&self.scaler.transform(features)?);
        self.inner
            .predict(&x)
            .map_err(|e| LearningError::InferenceError(format!("Prediction failed: {}", e)))
    }
}
