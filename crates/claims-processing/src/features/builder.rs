//! Feature building for the severity and probability models.
//!
//! [`DataBuilder`] owns a copy of the raw frame. [`DataBuilder::preprocess`]
//! runs feature engineering, imputation and label encoding in that order; the
//! modelling tables are then cut from the processed frame.

use polars::prelude::*;
use tracing::info;

use super::encoding::{EncoderMap, encode_categoricals};
use super::engineering::{FeatureEngineer, IS_CLAIM, TOTAL_CLAIMS};
use super::imputation::{ImputationSummary, MissingValueImputer};
use super::split::{TrainTestSplit, split_data};
use crate::config::ProcessingConfig;
use crate::error::{ProcessingError, Result, ResultExt};
use crate::utils::numeric_values;

/// Builds model-ready tables from the raw claims frame.
#[derive(Debug, Clone)]
pub struct DataBuilder {
    df: DataFrame,
    config: ProcessingConfig,
    encoders: EncoderMap,
    imputation: ImputationSummary,
    processing_steps: Vec<String>,
}

impl DataBuilder {
    /// Create a builder with the default configuration.
    pub fn new(df: DataFrame) -> Self {
        Self::with_config(df, ProcessingConfig::default())
    }

    /// Create a builder with an explicit configuration.
    pub fn with_config(df: DataFrame, config: ProcessingConfig) -> Self {
        Self {
            df,
            config,
            encoders: EncoderMap::new(),
            imputation: ImputationSummary::default(),
            processing_steps: Vec::new(),
        }
    }

    /// Engineer features, impute missing values and encode categoricals.
    pub fn preprocess(&mut self) -> Result<&DataFrame> {
        info!("Starting feature engineering...");
        FeatureEngineer::apply(&mut self.df, &self.config, &mut self.processing_steps)
            .context("Feature engineering")?;

        info!("Handling missing values...");
        self.imputation = MissingValueImputer::apply(
            &mut self.df,
            &self.config.unknown_category,
            &mut self.processing_steps,
        )
        .context("Imputation")?;

        info!("Encoding categorical variables...");
        self.encoders = encode_categoricals(&mut self.df, &mut self.processing_steps)
            .context("Label encoding")?;

        info!("Preprocessing complete.");
        Ok(&self.df)
    }

    /// Rows with a claim; target is `TotalClaims`.
    pub fn severity_data(&self) -> Result<(DataFrame, Series)> {
        let claims = self.df.column(TOTAL_CLAIMS).map_err(|_| ProcessingError::MissingColumn {
            column: TOTAL_CLAIMS.to_string(),
            hint: "severity modelling needs the claim amount".to_string(),
        })?;

        let mask: BooleanChunked = numeric_values(claims.as_materialized_series())?
            .into_iter()
            .map(|v| v.is_some_and(|x| x > 0.0))
            .collect();

        let subset = self.df.filter(&mask)?;
        let y = subset.column(TOTAL_CLAIMS)?.as_materialized_series().clone();
        let x = self.feature_frame(&subset)?;
        Ok((x, y))
    }

    /// All rows; target is the `IsClaim` flag.
    pub fn probability_data(&self) -> Result<(DataFrame, Series)> {
        let y = self
            .df
            .column(IS_CLAIM)
            .map_err(|_| ProcessingError::MissingColumn {
                column: IS_CLAIM.to_string(),
                hint: "run preprocessing first".to_string(),
            })?
            .as_materialized_series()
            .clone();
        let x = self.feature_frame(&self.df)?;
        Ok((x, y))
    }

    /// Split with the configured test size and seed.
    pub fn split_data(&self, x: &DataFrame, y: &Series) -> Result<TrainTestSplit> {
        split_data(x, y, self.config.test_size, self.config.random_seed)
    }

    /// Decode label codes of an encoded column back to text.
    pub fn decode(&self, column: &str, codes: &[u32]) -> Result<Vec<String>> {
        self.encoders
            .get(column)
            .ok_or_else(|| ProcessingError::ColumnNotFound(column.to_string()))?
            .inverse_transform(codes)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn encoders(&self) -> &EncoderMap {
        &self.encoders
    }

    pub fn imputation_summary(&self) -> &ImputationSummary {
        &self.imputation
    }

    pub fn processing_steps(&self) -> &[String] {
        &self.processing_steps
    }

    /// Drop targets and identifiers that exist in `df`.
    fn feature_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let excluded: Vec<&str> = [TOTAL_CLAIMS, IS_CLAIM]
            .into_iter()
            .chain(self.config.id_columns.iter().map(String::as_str))
            .collect();

        let keep: Vec<PlSmallStr> = df
            .get_column_names()
            .into_iter()
            .filter(|name| !excluded.contains(&name.as_str()))
            .cloned()
            .collect();

        Ok(df.select(keep)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw() -> DataFrame {
        df![
            "PolicyID" => [1i64, 2, 3, 4, 5],
            "Gender" => [Some("Male"), Some("Female"), None, Some("Male"), Some("Female")],
            "RegistrationYear" => [2010i64, 2015, 2020, 2018, 2012],
            "TotalPremium" => [100.0, 200.0, 150.0, 120.0, 80.0],
            "SumInsured" => [1000.0, 5000.0, 3000.0, 2000.0, 1500.0],
            "TotalClaims" => [Some(0.0), Some(500.0), None, Some(0.0), Some(50.0)],
        ]
        .unwrap()
    }

    #[test]
    fn test_preprocess_produces_model_ready_frame() {
        let mut builder = DataBuilder::new(raw());
        let df = builder.preprocess().unwrap();

        for col in df.get_columns() {
            assert_eq!(col.null_count(), 0, "nulls remain in {}", col.name());
        }
        assert!(df.column("IsClaim").is_ok());
        assert!(df.column("VehicleAge").is_ok());
        assert!(df.column("Premium_Risk_Ratio").is_ok());
        assert_eq!(df.column("Gender").unwrap().dtype(), &DataType::UInt32);
        assert_eq!(builder.decode("Gender", &[0, 1]).unwrap(), vec!["Female", "Male"]);
    }

    #[test]
    fn test_severity_data_keeps_only_claims() {
        let mut builder = DataBuilder::new(raw());
        builder.preprocess().unwrap();

        let (x, y) = builder.severity_data().unwrap();

        // The null claim is imputed with the median (25.0) before filtering
        assert_eq!(x.height(), 3);
        assert_eq!(y.len(), 3);
        let names: Vec<String> = x.get_column_names().iter().map(|n| n.to_string()).collect();
        assert!(!names.contains(&"TotalClaims".to_string()));
        assert!(!names.contains(&"IsClaim".to_string()));
        assert!(!names.contains(&"PolicyID".to_string()));
        assert!(names.contains(&"TotalPremium".to_string()));
    }

    #[test]
    fn test_probability_requires_preprocessing() {
        let builder = DataBuilder::new(raw());
        let err = builder.probability_data().unwrap_err();
        assert_eq!(err.error_code(), "MISSING_COLUMN");
    }

    #[test]
    fn test_probability_data_all_rows() {
        let mut builder = DataBuilder::new(raw());
        builder.preprocess().unwrap();

        let (x, y) = builder.probability_data().unwrap();
        assert_eq!(x.height(), 5);
        assert_eq!(y.name().as_str(), "IsClaim");

        let split = builder.split_data(&x, &y).unwrap();
        assert_eq!(split.sizes().test, 1);
        assert_eq!(split.sizes().train, 4);
    }

    #[test]
    fn test_severity_without_claims_column() {
        let builder = DataBuilder::new(df!["Gender" => ["Male"]].unwrap());
        assert_eq!(
            builder.severity_data().unwrap_err().error_code(),
            "MISSING_COLUMN"
        );
    }
}
