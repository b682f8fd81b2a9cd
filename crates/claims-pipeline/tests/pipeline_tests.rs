//! End-to-end tests against a small extract of the policy/claims file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use claims_learning::{TrainedModel, TrainerConfig};
use claims_pipeline::{
    CancellationToken, Pipeline, PipelineConfig, PipelineError, PipelineStage, ProgressUpdate,
    TrainingReport,
};
use claims_processing::stats::TestOutcome;
use claims_processing::{ProcessingConfig, SplitSizes};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/claims_sample.txt")
}

fn config(out: &Path, enable_boosting: bool) -> PipelineConfig {
    let processing = ProcessingConfig::builder()
        .id_columns(["PolicyID", "UnderwrittenCoverID", "TransactionMonth"])
        .build()
        .unwrap();
    let trainer = TrainerConfig::builder()
        .n_estimators(5)
        .enable_boosting(enable_boosting)
        .build()
        .unwrap();

    PipelineConfig::builder()
        .data_path(fixture())
        .models_dir(out.join("models"))
        .dashboard_dir(out.join("figures"))
        .processing(processing)
        .trainer(trainer)
        .build()
        .unwrap()
}

fn pipeline(out: &Path) -> Pipeline {
    Pipeline::builder().config(config(out, true)).build().unwrap()
}

// ============================================================================
// End-to-End Run
// ============================================================================

#[test]
fn test_run_writes_models_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let report = pipeline(dir.path()).run().unwrap();

    let models = dir.path().join("models");
    assert!(models.join("severity_model.json").exists());
    assert!(models.join("probability_model.json").exists());
    assert!(models.join("training_report.json").exists());

    assert_eq!(report.rows_loaded, 80);
    assert_eq!(report.severity.rows, 30);
    assert_eq!(report.severity.split, SplitSizes { train: 24, test: 6 });
    assert_eq!(report.probability.split, SplitSizes { train: 64, test: 16 });
    assert_eq!(report.results.len(), 6);

    assert_eq!(report.artifacts.severity_model_key, "Severity_GBT");
    assert_eq!(report.artifacts.probability_model_key, "Probability_GBT");

    let severity = TrainedModel::load(&report.artifacts.severity_model).unwrap();
    assert_eq!(severity.name, "GradientBoosting_Reg");
    assert!(!severity.feature_names.contains(&"TotalClaims".to_string()));

    let saved = TrainingReport::load(models.join("training_report.json")).unwrap();
    assert_eq!(saved.results.len(), 6);
    assert_eq!(saved.artifacts, report.artifacts);

    let table = report.results_table().unwrap();
    assert_eq!(table.shape(), (6, 5));
}

#[test]
fn test_run_without_boosting_saves_forests() {
    let dir = tempfile::tempdir().unwrap();
    let report = Pipeline::builder()
        .config(config(dir.path(), false))
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.artifacts.severity_model_key, "Severity_RF");
    assert_eq!(report.artifacts.probability_model_key, "Probability_RF");

    let probability = TrainedModel::load(&report.artifacts.probability_model).unwrap();
    assert_eq!(probability.name, "RandomForest_Clf");
}

#[test]
fn test_progress_updates_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);

    Pipeline::builder()
        .config(config(dir.path(), false))
        .on_progress(move |u| sink.lock().unwrap().push(u))
        .build()
        .unwrap()
        .run()
        .unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.first().unwrap().stage, PipelineStage::Initializing);
    assert_eq!(updates.last().unwrap().stage, PipelineStage::Complete);
    assert!(
        updates
            .windows(2)
            .all(|pair| pair[0].progress <= pair[1].progress + 1e-6)
    );
    for stage in [
        PipelineStage::SeverityTraining,
        PipelineStage::ProbabilityTraining,
        PipelineStage::SavingArtifacts,
    ] {
        assert!(updates.iter().any(|u| u.stage == stage), "{:?}", stage);
    }
}

#[test]
fn test_missing_data_file_fails_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), true);
    config.data_path = dir.path().join("MachineLearningRating.txt");

    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);
    let err = Pipeline::builder()
        .config(config)
        .on_progress(move |u| sink.lock().unwrap().push(u.stage))
        .build()
        .unwrap()
        .run()
        .unwrap_err();

    assert!(matches!(err, PipelineError::DataNotFound(_)));
    assert_eq!(stages.lock().unwrap().last(), Some(&PipelineStage::Failed));
    assert!(!dir.path().join("models").exists());
}

#[test]
fn test_cancelled_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let err = Pipeline::builder()
        .config(config(dir.path(), true))
        .cancellation_token(token)
        .build()
        .unwrap()
        .run()
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(!dir.path().join("models").exists());
}

// ============================================================================
// Standalone Commands
// ============================================================================

#[test]
fn test_hypothesis_commands() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path());

    let chi2 = pipeline.chi2("Province", "IsClaim").unwrap();
    assert_eq!(chi2.result.dof, 4.0);
    assert_eq!(chi2.table.row_labels.len(), 5);
    assert!((0.0..=1.0).contains(&chi2.result.p_value));

    // Labels stay readable because only the engineered columns are added
    let ttest = pipeline
        .t_test("Gender", "TotalClaims", "Male", "Female")
        .unwrap();
    assert!(matches!(ttest, TestOutcome::Completed(_)));

    let missing = pipeline
        .t_test("Gender", "TotalClaims", "Male", "Unknown")
        .unwrap();
    assert_eq!(missing.interpretation(), "Insufficient Data");

    let anova = pipeline.anova("Province", "TotalClaims").unwrap();
    assert!(anova.p_value().is_some());

    let err = pipeline.chi2("Province", "NoSuchColumn").unwrap_err();
    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
}

#[test]
fn test_dashboard_with_exploratory_figures() {
    let dir = tempfile::tempdir().unwrap();
    let saved = pipeline(dir.path())
        .generate_dashboard(&["TotalPremium".to_string(), "TotalClaims".to_string()])
        .unwrap();

    assert_eq!(saved.len(), 9);
    let figures = dir.path().join("figures");
    for name in [
        "premium_vs_claims.json",
        "numerical_distributions.json",
        "correlation_matrix.json",
    ] {
        assert!(figures.join(name).exists(), "{} missing", name);
    }
}

#[test]
fn test_inspect_raw_file() {
    let dir = tempfile::tempdir().unwrap();
    let summary = pipeline(dir.path()).inspect().unwrap();

    assert_eq!(summary.rows, 80);
    assert_eq!(summary.columns.len(), 12);
    assert_eq!(summary.columns[0].name, "UnderwrittenCoverID");

    let gender = summary.columns.iter().find(|c| c.name == "Gender").unwrap();
    assert_eq!(gender.null_count, 5);
}

#[test]
fn test_config_file_drives_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    let json = serde_json::json!({
        "data_path": fixture(),
        "models_dir": dir.path().join("artifacts"),
        "trainer": { "n_estimators": 3 }
    });
    std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    assert_eq!(config.trainer.n_estimators, 3);
    assert_eq!(config.report_path(), dir.path().join("artifacts/training_report.json"));

    let summary = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .inspect()
        .unwrap();
    assert_eq!(summary.rows, 80);
}
