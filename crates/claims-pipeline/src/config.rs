//! Pipeline configuration: file locations plus the processing and trainer
//! settings.
//!
//! Loaded from JSON with [`PipelineConfig::from_file`]; missing keys take
//! their defaults.
//!
//! ```json
//! {
//!   "data_path": "data/raw/MachineLearningRating.txt",
//!   "models_dir": "models",
//!   "processing": { "test_size": 0.25 },
//!   "trainer": { "n_estimators": 200, "enable_boosting": false }
//! }
//! ```

use std::path::{Path, PathBuf};

use claims_learning::TrainerConfig;
use claims_processing::ProcessingConfig;
use claims_processing::dashboard::DEFAULT_FIGURE_DIR;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result, ResultExt};

/// Environment variable overriding [`PipelineConfig::data_path`].
pub const DATA_PATH_ENV: &str = "CLAIMS_DATA_PATH";

pub const DEFAULT_DATA_PATH: &str = "data/raw/MachineLearningRating.txt";
pub const DEFAULT_MODELS_DIR: &str = "models";

pub const SEVERITY_MODEL_FILE: &str = "severity_model.json";
pub const PROBABILITY_MODEL_FILE: &str = "probability_model.json";
pub const TRAINING_REPORT_FILE: &str = "training_report.json";

/// Configuration of an end-to-end run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipe-delimited raw policy/claims file.
    pub data_path: PathBuf,

    /// Output directory for saved models and the training report.
    pub models_dir: PathBuf,

    /// Output directory for dashboard figures.
    pub dashboard_dir: PathBuf,

    pub processing: ProcessingConfig,

    pub trainer: TrainerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            dashboard_dir: PathBuf::from(DEFAULT_FIGURE_DIR),
            processing: ProcessingConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Read a JSON configuration file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .context(format!("Failed to read config '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .context(format!("Failed to parse config '{}'", path.display()))?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `CLAIMS_DATA_PATH` when it is set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        match std::env::var(DATA_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                debug!("{} overrides data path: {}", DATA_PATH_ENV, path);
                self.data_path = PathBuf::from(path);
            }
            _ => {}
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_path.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "data_path must not be empty".to_string(),
            ));
        }
        if self.models_dir.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "models_dir must not be empty".to_string(),
            ));
        }
        self.processing
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        self.trainer.validate()?;
        Ok(())
    }

    pub fn severity_model_path(&self) -> PathBuf {
        self.models_dir.join(SEVERITY_MODEL_FILE)
    }

    pub fn probability_model_path(&self) -> PathBuf {
        self.models_dir.join(PROBABILITY_MODEL_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.models_dir.join(TRAINING_REPORT_FILE)
    }
}

/// Builder for [`PipelineConfig`]. Unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    data_path: Option<PathBuf>,
    models_dir: Option<PathBuf>,
    dashboard_dir: Option<PathBuf>,
    processing: Option<ProcessingConfig>,
    trainer: Option<TrainerConfig>,
}

impl PipelineConfigBuilder {
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = Some(dir.into());
        self
    }

    pub fn dashboard_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dashboard_dir = Some(dir.into());
        self
    }

    pub fn processing(mut self, config: ProcessingConfig) -> Self {
        self.processing = Some(config);
        self
    }

    pub fn trainer(mut self, config: TrainerConfig) -> Self {
        self.trainer = Some(config);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<PipelineConfig> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            data_path: self.data_path.unwrap_or(defaults.data_path),
            models_dir: self.models_dir.unwrap_or(defaults.models_dir),
            dashboard_dir: self.dashboard_dir.unwrap_or(defaults.dashboard_dir),
            processing: self.processing.unwrap_or(defaults.processing),
            trainer: self.trainer.unwrap_or(defaults.trainer),
        };
        config.validate()?;
        Ok(config)
    }
}
