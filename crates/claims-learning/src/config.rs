//! Configuration types for model training.
//!
//! This module provides [`TrainerConfig`] and its builder, as well as the
//! [`ProblemType`] enum.
//!
//! # Example
//!
//! ```
//! use claims_learning::TrainerConfig;
//!
//! let config = TrainerConfig::builder()
//!     .n_estimators(200)
//!     .learning_rate(0.05)
//!     .enable_boosting(true)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.n_estimators, 200);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LearningError, Result};

/// The type of model being trained.
///
/// - [`Classification`](Self::Classification): claim probability, scored with accuracy and F1
/// - [`Regression`](Self::Regression): claim severity, scored with RMSE and R²
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ProblemType {
    /// Predicting whether a policy has any claim.
    #[default]
    Classification,

    /// Predicting the claim amount of policies that claimed.
    Regression,
}

impl ProblemType {
    /// Returns the lowercase name used in reports and persisted models.
    ///
    /// ```
    /// use claims_learning::ProblemType;
    ///
    /// assert_eq!(ProblemType::Classification.as_str(), "classification");
    /// assert_eq!(ProblemType::Regression.as_str(), "regression");
    /// ```
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Classification => "classification",
            ProblemType::Regression => "regression",
        }
    }
}

/// Hyperparameters shared by the severity and probability model families.
///
/// Use [`TrainerConfig::builder()`] to construct a validated configuration.
///
/// # Validation
///
/// [`build()`](TrainerConfigBuilder::build) checks:
/// - `n_estimators` is at least 1
/// - `learning_rate` is in `(0.0, 1.0]`
/// - `boosting_max_depth` is at least 1
/// - `forest_max_depth`, when set, is at least 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Trees per random forest and boosting rounds per gradient-boosted model (default: 100).
    pub n_estimators: usize,

    /// Shrinkage applied to every boosting round (default: 0.1).
    pub learning_rate: f64,

    /// Depth of each boosted tree (default: 6).
    pub boosting_max_depth: u16,

    /// Depth limit of random forest trees (default: unlimited).
    pub forest_max_depth: Option<u16>,

    /// Seed for forests and class oversampling (default: 42).
    pub random_seed: u64,

    /// Whether the gradient-boosted models are trained (default: true).
    pub enable_boosting: bool,

    /// Oversample the minority class before fitting the logistic regression
    /// and random forest classifiers (default: true).
    pub balance_classes: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            boosting_max_depth: 6,
            forest_max_depth: None,
            random_seed: 42,
            enable_boosting: true,
            balance_classes: true,
        }
    }
}

impl TrainerConfig {
    /// Create a new builder for `TrainerConfig`.
    #[must_use]
    pub fn builder() -> TrainerConfigBuilder {
        TrainerConfigBuilder::default()
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators < 1 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(LearningError::InvalidConfig(format!(
                "learning_rate must be in (0.0, 1.0], got {}",
                self.learning_rate
            )));
        }
        if self.boosting_max_depth < 1 {
            return Err(LearningError::InvalidConfig(
                "boosting_max_depth must be at least 1".to_string(),
            ));
        }
        if self.forest_max_depth == Some(0) {
            return Err(LearningError::InvalidConfig(
                "forest_max_depth must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`TrainerConfig`].
///
/// Created via [`TrainerConfig::builder()`]. All setters return `self` to allow
/// method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainerConfigBuilder {
    config: TrainerConfig,
}

impl TrainerConfigBuilder {
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    #[must_use]
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    #[must_use]
    pub fn boosting_max_depth(mut self, depth: u16) -> Self {
        self.config.boosting_max_depth = depth;
        self
    }

    #[must_use]
    pub fn forest_max_depth(mut self, depth: u16) -> Self {
        self.config.forest_max_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Enable or disable the gradient-boosted models.
    ///
    /// When disabled, the pipeline persists the random forests instead.
    #[must_use]
    pub fn enable_boosting(mut self, enable: bool) -> Self {
        self.config.enable_boosting = enable;
        self
    }

    #[must_use]
    pub fn balance_classes(mut self, balance: bool) -> Self {
        self.config.balance_classes = balance;
        self
    }

    /// Build the configuration, validating all parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any parameter is out of range.
    pub fn build(self) -> Result<TrainerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainerConfig::default();
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.boosting_max_depth, 6);
        assert_eq!(config.forest_max_depth, None);
        assert_eq!(config.random_seed, 42);
        assert!(config.enable_boosting);
        assert!(config.balance_classes);
    }

    #[test]
    fn test_builder_rejects_bad_learning_rate() {
        let result = TrainerConfig::builder().learning_rate(0.0).build();
        assert!(matches!(result, Err(LearningError::InvalidConfig(_))));

        let result = TrainerConfig::builder().learning_rate(1.5).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_estimators() {
        assert!(TrainerConfig::builder().n_estimators(0).build().is_err());
        assert!(TrainerConfig::builder().forest_max_depth(0).build().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainerConfig =
            serde_json::from_str(r#"{"n_estimators": 10, "enable_boosting": false}"#).unwrap();
        assert_eq!(config.n_estimators, 10);
        assert!(!config.enable_boosting);
        assert_eq!(config.learning_rate, 0.1);
    }

    #[test]
    fn test_problem_type_serde() {
        assert_eq!(
            serde_json::to_string(&ProblemType::Regression).unwrap(),
            "\"regression\""
        );
    }
}
