//! Conversion of polars feature tables into dense matrices.

use ndarray::Array2;
use polars::prelude::*;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{LearningError, Result, ResultExt};

/// Numeric features and target of one training or evaluation set.
#[derive(Debug, Clone)]
pub struct Dataset {
    feature_names: Vec<String>,
    features: Array2<f64>,
    target: Vec<f64>,
}

impl Dataset {
    /// Build a dataset from a feature frame and a target series.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidData`] when a feature or the target is not
    /// numeric, contains nulls or non-finite values, or when the lengths differ.
    pub fn from_frame(x: &DataFrame, y: &Series) -> Result<Self> {
        if x.height() != y.len() {
            return Err(LearningError::InvalidData(format!(
                "features have {} rows but target has {}",
                x.height(),
                y.len()
            )));
        }

        let (feature_names, features) = feature_matrix(x)?;
        let target = numeric_column(y)?;

        Ok(Self {
            feature_names,
            features,
            target,
        })
    }

    /// Assemble a dataset from parts already in matrix form.
    pub fn from_parts(
        feature_names: Vec<String>,
        features: Array2<f64>,
        target: Vec<f64>,
    ) -> Result<Self> {
        if features.ncols() != feature_names.len() || features.nrows() != target.len() {
            return Err(LearningError::InvalidData(format!(
                "matrix is {}x{} for {} names and {} targets",
                features.nrows(),
                features.ncols(),
                feature_names.len(),
                target.len()
            )));
        }
        Ok(Self {
            feature_names,
            features,
            target,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Target as binary class labels.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidData`] if any target value is not 0 or 1.
    pub fn class_labels(&self) -> Result<Vec<i32>> {
        self.target
            .iter()
            .map(|&v| {
                if v == 0.0 || v == 1.0 {
                    Ok(v as i32)
                } else {
                    Err(LearningError::InvalidData(format!(
                        "classification target must be 0 or 1, found {}",
                        v
                    )))
                }
            })
            .collect()
    }

    /// New dataset holding the given rows, in order. Rows may repeat.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let features = self.features.select(ndarray::Axis(0), rows);
        let target = rows.iter().map(|&i| self.target[i]).collect();
        Self {
            feature_names: self.feature_names.clone(),
            features,
            target,
        }
    }

    pub fn to_dense_matrix(&self) -> DenseMatrix<f64> {
        to_dense_matrix(&self.features)
    }
}

/// Row-major copy of an ndarray matrix in smartcore's representation.
pub fn to_dense_matrix(features: &Array2<f64>) -> DenseMatrix<f64> {
    let (rows, cols) = features.dim();
    let data: Vec<f64> = features.iter().copied().collect();
    DenseMatrix::new(rows, cols, data, false)
}

/// Column names and a dense `f64` matrix of every column in `x`.
pub fn feature_matrix(x: &DataFrame) -> Result<(Vec<String>, Array2<f64>)> {
    if x.width() == 0 {
        return Err(LearningError::InvalidData(
            "feature frame has no columns".to_string(),
        ));
    }

    let mut names = Vec::with_capacity(x.width());
    let mut columns = Vec::with_capacity(x.width());
    for column in x.get_columns() {
        let name = column.name().to_string();
        let values = numeric_column(column.as_materialized_series())
            .context(format!("Feature column '{}'", name))?;
        names.push(name);
        columns.push(values);
    }

    let features = Array2::from_shape_fn((x.height(), columns.len()), |(i, j)| columns[j][i]);
    Ok((names, features))
}

fn numeric_column(series: &Series) -> Result<Vec<f64>> {
    let dtype = series.dtype();
    let numeric = matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    );
    if !numeric {
        return Err(LearningError::InvalidData(format!(
            "column '{}' has non-numeric dtype {}; encode it first",
            series.name(),
            dtype
        )));
    }
    if series.null_count() > 0 {
        return Err(LearningError::InvalidData(format!(
            "column '{}' contains {} null values; impute it first",
            series.name(),
            series.null_count()
        )));
    }

    let cast = series.cast(&DataType::Float64)?;
    let values: Vec<f64> = cast.f64()?.into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(LearningError::InvalidData(format!(
            "column '{}' contains non-finite values",
            series.name()
        )));
    }
    Ok(values)
}
