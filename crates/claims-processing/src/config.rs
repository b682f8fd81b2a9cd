//! Configuration for loading and feature building.
//!
//! Use [`ProcessingConfig::builder()`] for a validated configuration, or
//! [`ProcessingConfig::default()`] for the values the claims dataset expects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings shared by the loader, the feature builder and the statistics module.
///
/// # Example
///
/// ```rust,ignore
/// use claims_processing::ProcessingConfig;
///
/// let config = ProcessingConfig::builder()
///     .separator(',')
///     .test_size(0.25)
///     .random_seed(7)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Field delimiter of the raw data file.
    pub separator: char,

    /// Rows scanned for schema inference. `None` scans the whole file.
    pub infer_schema_length: Option<usize>,

    /// Year vehicle ages are computed against.
    pub reference_year: i32,

    /// Ages above this (or below zero) are treated as data errors.
    pub max_vehicle_age: f64,

    /// Added to `SumInsured` before dividing to avoid division by zero.
    pub ratio_epsilon: f64,

    /// Identifier columns dropped from model features when present.
    pub id_columns: Vec<String>,

    /// Fraction of rows held out for evaluation.
    pub test_size: f64,

    /// Seed for shuffling and resampling.
    pub random_seed: u64,

    /// Significance level for hypothesis tests.
    pub significance_level: f64,

    /// Fill value for categorical columns without any observed value.
    pub unknown_category: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            separator: '|',
            infer_schema_length: None,
            reference_year: 2025,
            max_vehicle_age: 50.0,
            ratio_epsilon: 1e-6,
            id_columns: vec!["PolicyID".to_string(), "Date".to_string()],
            test_size: 0.2,
            random_seed: 42,
            significance_level: 0.05,
            unknown_category: "Unknown".to_string(),
        }
    }
}

impl ProcessingConfig {
    /// Create a new builder.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder::default()
    }

    /// Separator as the single byte polars expects.
    pub fn separator_byte(&self) -> u8 {
        // validate() guarantees an ASCII separator
        self.separator as u8
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.separator.is_ascii() {
            return Err(ConfigValidationError::InvalidSeparator(self.separator));
        }

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigValidationError::InvalidFraction {
                field: "test_size".to_string(),
                value: self.test_size,
            });
        }

        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ConfigValidationError::InvalidFraction {
                field: "significance_level".to_string(),
                value: self.significance_level,
            });
        }

        if !(self.max_vehicle_age > 0.0) {
            return Err(ConfigValidationError::InvalidVehicleAge(self.max_vehicle_age));
        }

        if self.infer_schema_length == Some(0) {
            return Err(ConfigValidationError::InvalidSchemaLength);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be strictly between 0.0 and 1.0)")]
    InvalidFraction { field: String, value: f64 },

    #[error("Invalid separator {0:?} (must be a single ASCII character)")]
    InvalidSeparator(char),

    #[error("Invalid maximum vehicle age: {0} (must be positive)")]
    InvalidVehicleAge(f64),

    #[error("Schema inference length must be at least 1 row")]
    InvalidSchemaLength,
}

/// Builder for [`ProcessingConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProcessingConfigBuilder {
    separator: Option<char>,
    infer_schema_length: Option<Option<usize>>,
    reference_year: Option<i32>,
    max_vehicle_age: Option<f64>,
    ratio_epsilon: Option<f64>,
    id_columns: Option<Vec<String>>,
    test_size: Option<f64>,
    random_seed: Option<u64>,
    significance_level: Option<f64>,
    unknown_category: Option<String>,
}

impl ProcessingConfigBuilder {
    /// Set the field delimiter (defaults to `|`).
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Limit schema inference to the first `rows` rows.
    pub fn infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Set the year vehicle ages are computed against.
    pub fn reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// Set the largest plausible vehicle age.
    pub fn max_vehicle_age(mut self, age: f64) -> Self {
        self.max_vehicle_age = Some(age);
        self
    }

    /// Set the epsilon added to the premium ratio denominator.
    pub fn ratio_epsilon(mut self, epsilon: f64) -> Self {
        self.ratio_epsilon = Some(epsilon);
        self
    }

    /// Set the identifier columns excluded from features.
    pub fn id_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the held-out fraction.
    ///
    /// # Arguments
    /// * `fraction` - Value strictly between 0.0 and 1.0 (e.g., 0.2 = 20%)
    pub fn test_size(mut self, fraction: f64) -> Self {
        self.test_size = Some(fraction);
        self
    }

    /// Set the random seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the hypothesis test significance level.
    pub fn significance_level(mut self, alpha: f64) -> Self {
        self.significance_level = Some(alpha);
        self
    }

    /// Set the fill value for all-null categorical columns.
    pub fn unknown_category(mut self, value: impl Into<String>) -> Self {
        self.unknown_category = Some(value.into());
        self
    }

    /// Build the configuration, validating all values.
    pub fn build(self) -> Result<ProcessingConfig, ConfigValidationError> {
        let defaults = ProcessingConfig::default();
        let config = ProcessingConfig {
            separator: self.separator.unwrap_or(defaults.separator),
            infer_schema_length: self
                .infer_schema_length
                .unwrap_or(defaults.infer_schema_length),
            reference_year: self.reference_year.unwrap_or(defaults.reference_year),
            max_vehicle_age: self.max_vehicle_age.unwrap_or(defaults.max_vehicle_age),
            ratio_epsilon: self.ratio_epsilon.unwrap_or(defaults.ratio_epsilon),
            id_columns: self.id_columns.unwrap_or(defaults.id_columns),
            test_size: self.test_size.unwrap_or(defaults.test_size),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            significance_level: self
                .significance_level
                .unwrap_or(defaults.significance_level),
            unknown_category: self.unknown_category.unwrap_or(defaults.unknown_category),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessingConfig::default();
        assert_eq!(config.separator, '|');
        assert_eq!(config.reference_year, 2025);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.significance_level, 0.05);
        assert_eq!(config.id_columns, vec!["PolicyID", "Date"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ProcessingConfig::builder()
            .separator(',')
            .test_size(0.3)
            .random_seed(7)
            .id_columns(["PolicyID", "TransactionMonth"])
            .build()
            .unwrap();

        assert_eq!(config.separator_byte(), b',');
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.id_columns, vec!["PolicyID", "TransactionMonth"]);
        assert_eq!(config.max_vehicle_age, 50.0);
    }

    #[test]
    fn test_validation_invalid_test_size() {
        let result = ProcessingConfig::builder().test_size(1.0).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidFraction { ref field, .. }) if field == "test_size"
        ));
        assert!(ProcessingConfig::builder().test_size(0.0).build().is_err());
    }

    #[test]
    fn test_validation_invalid_separator() {
        let result = ProcessingConfig::builder().separator('¦').build();
        assert_eq!(result, Err(ConfigValidationError::InvalidSeparator('¦')));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ProcessingConfig =
            serde_json::from_str(r#"{"separator": ",", "reference_year": 2024}"#).unwrap();
        assert_eq!(config.separator, ',');
        assert_eq!(config.reference_year, 2024);
        assert_eq!(config.unknown_category, "Unknown");
    }
}
