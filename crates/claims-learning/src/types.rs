//! Result and metric types returned by the trainer.
//!
//! - [`Metrics`]: evaluation metrics (classification or regression)
//! - [`ModelResult`]: one evaluated model, as listed in reports

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ProblemType;
use crate::error::Result;

/// Test-set metrics of a trained model.
///
/// Only the fields relevant to the problem type are populated:
/// `rmse`/`r2` for severity models, `accuracy`/`f1_score` for probability
/// models. Serialized keys match the column headers of the results table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Root mean squared error (regression only).
    #[serde(rename = "RMSE", skip_serializing_if = "Option::is_none", default)]
    pub rmse: Option<f64>,

    /// Coefficient of determination (regression only).
    #[serde(rename = "R2", skip_serializing_if = "Option::is_none", default)]
    pub r2: Option<f64>,

    /// Fraction of correct predictions (classification only).
    #[serde(rename = "Accuracy", skip_serializing_if = "Option::is_none", default)]
    pub accuracy: Option<f64>,

    /// F1 score of the claim class (classification only).
    #[serde(rename = "F1", skip_serializing_if = "Option::is_none", default)]
    pub f1_score: Option<f64>,
}

impl Metrics {
    pub fn regression(rmse: f64, r2: f64) -> Self {
        Self {
            rmse: Some(rmse),
            r2: Some(r2),
            ..Self::default()
        }
    }

    pub fn classification(accuracy: f64, f1_score: f64) -> Self {
        Self {
            accuracy: Some(accuracy),
            f1_score: Some(f1_score),
            ..Self::default()
        }
    }
}

/// One evaluated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    /// Display name, e.g. `RandomForest_Reg`. Unique within a trainer.
    pub name: String,

    /// Key the fitted model is stored under, e.g. `Severity_RF`.
    pub key: String,

    pub problem_type: ProblemType,

    pub metrics: Metrics,

    /// Rows the model was fitted on, after any class balancing.
    pub train_rows: usize,

    pub test_rows: usize,

    /// Wall-clock fit time in seconds.
    pub training_time_seconds: f64,
}

/// Tabulate results with one row per model.
///
/// Metric columns appear only when at least one model reports them, so a
/// severity-only run shows `RMSE` and `R2` alone.
pub fn results_frame(results: &[ModelResult]) -> Result<DataFrame> {
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    let mut columns = vec![Column::new("Model".into(), names)];

    let metric_columns: [(&str, fn(&Metrics) -> Option<f64>); 4] = [
        ("RMSE", |m| m.rmse),
        ("R2", |m| m.r2),
        ("Accuracy", |m| m.accuracy),
        ("F1", |m| m.f1_score),
    ];
    for (header, get) in metric_columns {
        let values: Vec<Option<f64>> = results.iter().map(|r| get(&r.metrics)).collect();
        if values.iter().any(Option::is_some) {
            columns.push(Column::new(header.into(), values));
        }
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_serialize_only_populated_fields() {
        let json = serde_json::to_value(Metrics::regression(1200.5, 0.25)).unwrap();
        assert_eq!(json["RMSE"], 1200.5);
        assert_eq!(json["R2"], 0.25);
        assert!(json.get("Accuracy").is_none());

        let json = serde_json::to_value(Metrics::classification(0.9, 0.1)).unwrap();
        assert_eq!(json["F1"], 0.1);
        assert!(json.get("RMSE").is_none());
    }

    #[test]
    fn test_results_frame_empty() {
        let table = results_frame(&[]).unwrap();
        assert_eq!(table.shape(), (0, 1));
    }
}
