//! Missing value imputation.
//!
//! Numeric columns are filled with their median, text columns with their most
//! frequent value. Columns with no observed value at all fall back to `0` and
//! the configured unknown label respectively.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};
use crate::utils::{
    DtypeCategory, fill_numeric_nulls, fill_string_nulls, finite_values, get_dtype_category,
    is_float_dtype, median, nullify_non_finite, string_mode,
};

/// How a column's nulls were filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    Median,
    Zero,
    Mode,
    Constant,
}

/// The value a column was filled with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

/// Imputation record for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImputation {
    pub column: String,
    pub strategy: ImputationStrategy,
    pub fill_value: FillValue,
    pub filled: usize,
}

/// Fitted fill values for every imputed column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationSummary {
    pub columns: Vec<ColumnImputation>,
}

impl ImputationSummary {
    /// Look up the record for a column.
    pub fn get(&self, column: &str) -> Option<&ColumnImputation> {
        self.columns.iter().find(|c| c.column == column)
    }

    /// Total number of values filled across all columns.
    pub fn total_filled(&self) -> usize {
        self.columns.iter().map(|c| c.filled).sum()
    }
}

/// Fills nulls column by column.
pub struct MissingValueImputer;

impl MissingValueImputer {
    /// Impute every numeric, text and boolean column in place.
    ///
    /// Booleans are cast to text and imputed like categories. Columns of other
    /// types (dates, nested) are left untouched.
    pub fn apply(
        df: &mut DataFrame,
        unknown_label: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<ImputationSummary> {
        let mut summary = ImputationSummary::default();
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();

        for name in names {
            let series = df.column(&name)?.as_materialized_series().clone();
            let record = match get_dtype_category(series.dtype()) {
                DtypeCategory::Numeric => Self::impute_numeric(df, &name, &series)?,
                DtypeCategory::Categorical => {
                    Self::impute_categorical(df, &name, &series, unknown_label)?
                }
                DtypeCategory::Boolean => {
                    let as_text = series.cast(&DataType::String)?;
                    df.replace(&name, as_text.clone())?;
                    Self::impute_categorical(df, &name, &as_text, unknown_label)?
                }
                DtypeCategory::Other => {
                    if series.null_count() > 0 {
                        warn!(
                            "Column '{}' ({}) has {} nulls and no imputation strategy",
                            name,
                            series.dtype(),
                            series.null_count()
                        );
                    }
                    None
                }
            };

            if let Some(record) = record {
                if record.filled > 0 {
                    processing_steps.push(format!(
                        "Filled {} nulls in '{}' with {:?} ({:?})",
                        record.filled, record.column, record.fill_value, record.strategy
                    ));
                }
                summary.columns.push(record);
            }
        }

        debug!(
            "Imputation complete: {} values filled across {} columns",
            summary.total_filled(),
            summary.columns.len()
        );
        Ok(summary)
    }

    fn impute_numeric(
        df: &mut DataFrame,
        name: &str,
        series: &Series,
    ) -> Result<Option<ColumnImputation>> {
        let series = if is_float_dtype(series.dtype()) {
            let cleaned = nullify_non_finite(series)?;
            if cleaned.null_count() != series.null_count() {
                debug!(
                    "Replaced {} NaN or infinite values in '{}'",
                    cleaned.null_count() - series.null_count(),
                    name
                );
            }
            cleaned
        } else {
            series.clone()
        };

        let null_count = series.null_count();
        let observed = finite_values(&series)?;
        let (strategy, fill) = match median(&observed) {
            Some(m) => (ImputationStrategy::Median, m),
            None => (ImputationStrategy::Zero, 0.0),
        };

        if null_count > 0 {
            let filled = fill_numeric_nulls(&series, fill)?;
            if filled.null_count() > 0 {
                return Err(ProcessingError::ImputationFailed {
                    column: name.to_string(),
                    reason: "nulls remain after median fill".to_string(),
                });
            }
            df.replace(name, filled)?;
        }

        Ok(Some(ColumnImputation {
            column: name.to_string(),
            strategy,
            fill_value: FillValue::Number(fill),
            filled: null_count,
        }))
    }

    fn impute_categorical(
        df: &mut DataFrame,
        name: &str,
        series: &Series,
        unknown_label: &str,
    ) -> Result<Option<ColumnImputation>> {
        let null_count = series.null_count();
        let (strategy, fill) = match string_mode(series) {
            Some(mode) => (ImputationStrategy::Mode, mode),
            None => (ImputationStrategy::Constant, unknown_label.to_string()),
        };

        if null_count > 0 {
            let filled = fill_string_nulls(series, &fill)?;
            df.replace(name, filled)?;
        }

        Ok(Some(ColumnImputation {
            column: name.to_string(),
            strategy,
            fill_value: FillValue::Text(fill),
            filled: null_count,
        }))
    }
}
