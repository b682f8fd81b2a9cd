//! Training report written next to the saved models, plus the dataset
//! overview printed by `inspect`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use claims_learning::{ModelResult, results_frame};
use claims_processing::SplitSizes;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Rows used by one model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRows {
    /// Rows in the family's model table before splitting.
    pub rows: usize,
    pub split: SplitSizes,
}

/// Where a run left its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    /// Key of the saved severity model, e.g. `Severity_GBT`.
    pub severity_model_key: String,
    pub severity_model: PathBuf,
    pub probability_model_key: String,
    pub probability_model: PathBuf,
    pub report: PathBuf,
}

/// Summary of an end-to-end run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub generated_at: String,
    pub data_path: PathBuf,

    /// Rows and columns of the raw file.
    pub rows_loaded: usize,
    pub columns_loaded: usize,

    /// Column count after feature building.
    pub feature_columns: usize,

    pub severity: StageRows,
    pub probability: StageRows,

    /// One entry per trained model, in training order.
    pub results: Vec<ModelResult>,

    pub artifacts: Artifacts,

    pub duration_seconds: f64,
}

impl TrainingReport {
    pub fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Results as a table, one row per model.
    pub fn results_table(&self) -> Result<DataFrame> {
        Ok(results_frame(&self.results)?)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        info!("Report saved: {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Name, type and missing-value count of one raw column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Shape and column overview of the raw data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub data_path: PathBuf,
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

impl DatasetSummary {
    pub fn from_frame(data_path: impl Into<PathBuf>, df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                dtype: col.dtype().to_string(),
                null_count: col.null_count(),
            })
            .collect();
        Self {
            data_path: data_path.into(),
            rows: df.height(),
            columns,
        }
    }

    /// Columns with at least one missing value, most missing first.
    pub fn columns_with_nulls(&self) -> Vec<&ColumnInfo> {
        let mut missing: Vec<&ColumnInfo> =
            self.columns.iter().filter(|c| c.null_count > 0).collect();
        missing.sort_by(|a, b| b.null_count.cmp(&a.null_count));
        missing
    }
}
