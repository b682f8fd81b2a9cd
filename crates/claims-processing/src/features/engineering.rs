//! Domain features derived from the raw policy columns.
//!
//! Each step is skipped (with a debug log) when its source columns are absent,
//! so partial extracts of the dataset still flow through the builder.

use polars::prelude::*;
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::error::{Result, ResultExt};
use crate::utils::{coerce_numeric, median, numeric_values};

pub const TOTAL_CLAIMS: &str = "TotalClaims";
pub const TOTAL_PREMIUM: &str = "TotalPremium";
pub const SUM_INSURED: &str = "SumInsured";
pub const REGISTRATION_YEAR: &str = "RegistrationYear";
pub const IS_CLAIM: &str = "IsClaim";
pub const VEHICLE_AGE: &str = "VehicleAge";
pub const PREMIUM_RISK_RATIO: &str = "Premium_Risk_Ratio";

/// Feature engineering steps, applied in place.
pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Run every feature step whose inputs are present.
    pub fn apply(
        df: &mut DataFrame,
        config: &ProcessingConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        Self::add_claim_flag(df, processing_steps)?;
        Self::add_vehicle_age(df, config, processing_steps)?;
        Self::add_premium_risk_ratio(df, config, processing_steps)?;
        Ok(())
    }

    /// `IsClaim = 1` when `TotalClaims > 0`, otherwise 0 (nulls count as 0).
    pub fn add_claim_flag(df: &mut DataFrame, processing_steps: &mut Vec<String>) -> Result<()> {
        let Ok(col) = df.column(TOTAL_CLAIMS) else {
            debug!("Skipping {}: '{}' not present", IS_CLAIM, TOTAL_CLAIMS);
            return Ok(());
        };

        let flags: Vec<i32> = numeric_values(col.as_materialized_series())?
            .into_iter()
            .map(|v| i32::from(v.is_some_and(|x| x > 0.0)))
            .collect();
        let positives = flags.iter().filter(|&&f| f == 1).count();

        df.with_column(Series::new(IS_CLAIM.into(), flags))
            .context("Adding claim flag")?;
        processing_steps.push(format!(
            "Created '{}' from '{}' ({} positive rows)",
            IS_CLAIM, TOTAL_CLAIMS, positives
        ));
        Ok(())
    }

    /// `VehicleAge = reference_year - RegistrationYear`.
    ///
    /// `RegistrationYear` is coerced to numbers first (unparseable values
    /// become null). Ages below zero or above the configured maximum are
    /// replaced by the median age computed before filtering.
    pub fn add_vehicle_age(
        df: &mut DataFrame,
        config: &ProcessingConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let Ok(col) = df.column(REGISTRATION_YEAR) else {
            debug!("Skipping {}: '{}' not present", VEHICLE_AGE, REGISTRATION_YEAR);
            return Ok(());
        };

        let years = coerce_numeric(col.as_materialized_series())?;
        let reference = f64::from(config.reference_year);
        let ages: Vec<Option<f64>> = years.iter().map(|y| y.map(|y| reference - y)).collect();

        let observed: Vec<f64> = ages.iter().flatten().copied().collect();
        let median_age = median(&observed);

        let mut replaced = 0usize;
        let ages: Vec<Option<f64>> = match median_age {
            Some(fill) => ages
                .into_iter()
                .map(|age| match age {
                    Some(a) if a < 0.0 || a > config.max_vehicle_age => {
                        replaced += 1;
                        Some(fill)
                    }
                    other => other,
                })
                .collect(),
            None => ages,
        };

        df.with_column(Series::new(REGISTRATION_YEAR.into(), years))
            .context("Coercing registration year")?;
        df.with_column(Series::new(VEHICLE_AGE.into(), ages))
            .context("Adding vehicle age")?;

        processing_steps.push(format!(
            "Created '{}' relative to {} ({} implausible ages replaced with median {:?})",
            VEHICLE_AGE, config.reference_year, replaced, median_age
        ));
        Ok(())
    }

    /// `Premium_Risk_Ratio = TotalPremium / (SumInsured + epsilon)`.
    pub fn add_premium_risk_ratio(
        df: &mut DataFrame,
        config: &ProcessingConfig,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let (Ok(premium), Ok(insured)) = (df.column(TOTAL_PREMIUM), df.column(SUM_INSURED)) else {
            debug!("Skipping {}: premium or sum insured missing", PREMIUM_RISK_RATIO);
            return Ok(());
        };

        let premium = numeric_values(premium.as_materialized_series())?;
        let insured = numeric_values(insured.as_materialized_series())?;
        let ratio: Vec<Option<f64>> = premium
            .into_iter()
            .zip(insured)
            .map(|(p, s)| Some(p? / (s? + config.ratio_epsilon)))
            .collect();

        df.with_column(Series::new(PREMIUM_RISK_RATIO.into(), ratio))
            .context("Adding premium risk ratio")?;
        processing_steps.push(format!(
            "Created '{}' = {} / ({} + {:e})",
            PREMIUM_RISK_RATIO, TOTAL_PREMIUM, SUM_INSURED, config.ratio_epsilon
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_at(df: &DataFrame, col: &str, i: usize) -> Option<f64> {
        df.column(col)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .get(i)
    }

    #[test]
    fn test_claim_flag_treats_null_as_zero() {
        let mut df = df![
            "TotalClaims" => [Some(0.0), Some(250.0), None, Some(-3.0)],
        ]
        .unwrap();
        let mut steps = Vec::new();

        FeatureEngineer::add_claim_flag(&mut df, &mut steps).unwrap();

        let flags: Vec<Option<i32>> = df
            .column(IS_CLAIM)
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(flags, vec![Some(0), Some(1), Some(0), Some(0)]);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_vehicle_age_replaces_implausible_values() {
        // Ages: 10, 5, -5 (future year), 125 (1900), null (unparseable)
        let mut df = df![
            "RegistrationYear" => ["2015", "2020", "2030", "1900", "abc"],
        ]
        .unwrap();
        let mut steps = Vec::new();

        FeatureEngineer::add_vehicle_age(&mut df, &ProcessingConfig::default(), &mut steps)
            .unwrap();

        // Median of the unfiltered ages [10, 5, -5, 125] is 7.5
        assert_eq!(f64_at(&df, VEHICLE_AGE, 0), Some(10.0));
        assert_eq!(f64_at(&df, VEHICLE_AGE, 1), Some(5.0));
        assert_eq!(f64_at(&df, VEHICLE_AGE, 2), Some(7.5));
        assert_eq!(f64_at(&df, VEHICLE_AGE, 3), Some(7.5));
        assert_eq!(f64_at(&df, VEHICLE_AGE, 4), None);
        assert_eq!(f64_at(&df, REGISTRATION_YEAR, 4), None);
    }

    #[test]
    fn test_premium_risk_ratio() {
        let mut df = df![
            "TotalPremium" => [Some(100.0), Some(50.0), None],
            "SumInsured" => [Some(1000.0), Some(0.0), Some(10.0)],
        ]
        .unwrap();
        let mut steps = Vec::new();

        FeatureEngineer::add_premium_risk_ratio(&mut df, &ProcessingConfig::default(), &mut steps)
            .unwrap();

        let first = f64_at(&df, PREMIUM_RISK_RATIO, 0).unwrap();
        assert!((first - 0.1).abs() < 1e-9);
        let second = f64_at(&df, PREMIUM_RISK_RATIO, 1).unwrap();
        assert!((second - 50.0 / 1e-6).abs() < 1.0);
        assert_eq!(f64_at(&df, PREMIUM_RISK_RATIO, 2), None);
    }

    #[test]
    fn test_missing_sources_are_skipped() {
        let mut df = df!["Gender" => ["Male"]].unwrap();
        let mut steps = Vec::new();

        FeatureEngineer::apply(&mut df, &ProcessingConfig::default(), &mut steps).unwrap();

        assert_eq!(df.width(), 1);
        assert!(steps.is_empty());
    }
}
