//! Label encoding of categorical columns.
//!
//! Classes are the sorted distinct values of a column, and a value's code is its
//! position in that list. Encoders are kept so dashboards and reports can turn
//! codes back into labels.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::utils::{is_string_dtype, string_values};

/// Maps the labels of one column to dense integer codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    column: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the distinct values of `values`.
    pub fn fit<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self {
            column: column.into(),
            classes,
        }
    }

    /// Column this encoder was fitted on.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Sorted class labels.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code for a single label.
    pub fn encode(&self, value: &str) -> Result<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map(|idx| idx as u32)
            .map_err(|_| ProcessingError::UnseenLabel {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Label for a single code.
    pub fn decode(&self, code: u32) -> Result<&str> {
        self.classes
            .get(code as usize)
            .map(String::as_str)
            .ok_or_else(|| ProcessingError::UnknownCode {
                column: self.column.clone(),
                code,
            })
    }

    /// Encode every value; fails on the first unseen label.
    pub fn transform<I, S>(&self, values: I) -> Result<Vec<u32>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values.into_iter().map(|v| self.encode(v.as_ref())).collect()
    }

    /// Decode every code; fails on the first unknown code.
    pub fn inverse_transform(&self, codes: &[u32]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&c| self.decode(c).map(str::to_string))
            .collect()
    }
}

/// Encoders keyed by column name.
pub type EncoderMap = BTreeMap<String, LabelEncoder>;

/// Replace every text column with its `UInt32` label codes.
///
/// Columns are expected to be null-free (imputation runs first); a null is
/// reported as [`ProcessingError::ImputationFailed`].
pub fn encode_categoricals(
    df: &mut DataFrame,
    processing_steps: &mut Vec<String>,
) -> Result<EncoderMap> {
    let mut encoders = EncoderMap::new();
    let text_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| is_string_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect();

    for name in text_columns {
        let values = string_values(df.column(&name)?.as_materialized_series())?;
        let values: Vec<String> = values
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| ProcessingError::ImputationFailed {
                    column: name.clone(),
                    reason: "null value reached label encoding".to_string(),
                })
            })
            .collect::<Result<_>>()?;

        let encoder = LabelEncoder::fit(name.as_str(), &values);
        let codes = encoder.transform(&values)?;
        df.replace(&name, Series::new(name.as_str().into(), codes))?;

        debug!("Encoded '{}' with {} classes", name, encoder.classes().len());
        processing_steps.push(format!(
            "Label-encoded '{}' ({} classes)",
            name,
            encoder.classes().len()
        ));
        encoders.insert(name, encoder);
    }

    Ok(encoders)
}
