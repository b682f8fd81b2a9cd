//! Column-wise preprocessing for a fixed feature set.
//!
//! Numeric features are median-imputed and passed through; categorical
//! features are filled with a constant and one-hot encoded as
//! `"{column}_{value}"` indicator columns. Categories not seen during
//! fitting produce all-zero indicators.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::utils::{finite_values, median, numeric_values, string_values};

/// Fill value for missing categories before one-hot encoding.
pub const MISSING_CATEGORY: &str = "missing";

/// The target and feature columns of a modelling table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumns {
    pub target: String,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl Default for FeatureColumns {
    fn default() -> Self {
        Self {
            target: "TotalClaims".to_string(),
            numeric: ["TotalPremium", "SumInsured", "CalculatedPremiumPerTerm"]
                .map(String::from)
                .to_vec(),
            categorical: ["Gender", "VehicleType", "MaritalStatus", "Province"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Fitted median/one-hot transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    columns: FeatureColumns,
    medians: BTreeMap<String, f64>,
    categories: BTreeMap<String, Vec<String>>,
}

impl ColumnPreprocessor {
    /// Learn medians and category lists from `df`.
    pub fn fit(df: &DataFrame, columns: FeatureColumns) -> Result<Self> {
        let mut medians = BTreeMap::new();
        for name in &columns.numeric {
            let series = require(df, name)?;
            let fill = median(&finite_values(series)?).unwrap_or(0.0);
            medians.insert(name.clone(), fill);
        }

        let mut categories = BTreeMap::new();
        for name in &columns.categorical {
            let series = require(df, name)?;
            let mut values: Vec<String> = string_values(series)?
                .into_iter()
                .map(|v| v.unwrap_or_else(|| MISSING_CATEGORY.to_string()))
                .collect();
            values.sort();
            values.dedup();
            categories.insert(name.clone(), values);
        }

        Ok(Self {
            columns,
            medians,
            categories,
        })
    }

    /// Output column names in the order `transform` produces them.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.columns.numeric.clone();
        for name in &self.columns.categorical {
            if let Some(values) = self.categories.get(name) {
                names.extend(values.iter().map(|v| format!("{}_{}", name, v)));
            }
        }
        names
    }

    /// Apply the fitted transformation.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut output: Vec<Column> = Vec::with_capacity(self.feature_names().len());

        for name in &self.columns.numeric {
            let fill = self.medians.get(name).copied().unwrap_or(0.0);
            let values: Vec<f64> = numeric_values(require(df, name)?)?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()).unwrap_or(fill))
                .collect();
            output.push(Series::new(name.as_str().into(), values).into_column());
        }

        for name in &self.columns.categorical {
            let values: Vec<String> = string_values(require(df, name)?)?
                .into_iter()
                .map(|v| v.unwrap_or_else(|| MISSING_CATEGORY.to_string()))
                .collect();
            for category in self.categories.get(name).into_iter().flatten() {
                let indicator: Vec<f64> = values
                    .iter()
                    .map(|v| if v == category { 1.0 } else { 0.0 })
                    .collect();
                let col_name = format!("{}_{}", name, category);
                output.push(Series::new(col_name.into(), indicator).into_column());
            }
        }

        Ok(DataFrame::new(output)?)
    }

    /// Fit then transform.
    pub fn fit_transform(df: &DataFrame, columns: FeatureColumns) -> Result<(Self, DataFrame)> {
        let preprocessor = Self::fit(df, columns)?;
        let transformed = preprocessor.transform(df)?;
        Ok((preprocessor, transformed))
    }
}

fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))
}
