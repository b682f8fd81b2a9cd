//! The end-to-end pipeline and the standalone commands built on the same
//! configuration (dashboard, hypothesis tests, inspection).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use claims_learning::{
    CancellationToken, ModelTrainer, PROBABILITY_GBT, PROBABILITY_RF, SEVERITY_GBT, SEVERITY_RF,
};
use claims_processing::features::FeatureEngineer;
use claims_processing::stats::{self, ChiSquaredOutcome};
use claims_processing::{DashboardGenerator, DataBuilder, TestOutcome, load_data_with};
use polars::prelude::DataFrame;
use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, ResultExt};
use crate::progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
use crate::report::{Artifacts, DatasetSummary, StageRows, TrainingReport};

/// Runs the claims workflow: load, build features, train both model families
/// and save the best available model of each.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use claims_pipeline::{Pipeline, PipelineConfig};
///
/// let report = Pipeline::builder()
///     .config(PipelineConfig::builder().data_path("data/sample.txt").build()?)
///     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
///     .build()?
///     .run()?;
///
/// println!("{}", report.results_table()?);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: CancellationToken,
}

// The CLI and tests move a built pipeline into worker threads
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Train and save the severity and probability models.
    ///
    /// Saves `Severity_GBT` when boosting is enabled, otherwise `Severity_RF`
    /// (likewise for probability), then writes the training report.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::DataNotFound`] if the data file does not exist
    /// - [`PipelineError::Cancelled`] (or a wrapped learning cancellation) if
    ///   the token was cancelled; check with [`PipelineError::is_cancelled`]
    pub fn run(&self) -> Result<TrainingReport> {
        match self.run_internal() {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(report)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                }
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn run_internal(&self) -> Result<TrainingReport> {
        let start_time = Instant::now();
        info!("Starting End-to-End Pipeline...");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            "Starting end-to-end pipeline...",
        ));
        self.check_cancelled()?;

        // 1. Load
        self.report_progress(ProgressUpdate::new(PipelineStage::Loading, 0.0, "Loading data..."));
        let raw = self.load()?;
        let (rows_loaded, columns_loaded) = raw.shape();
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            1.0,
            format!("Loaded {} rows x {} columns", rows_loaded, columns_loaded),
        ));
        self.check_cancelled()?;

        // 2. Build features
        self.report_progress(ProgressUpdate::new(
            PipelineStage::FeatureBuilding,
            0.0,
            "Building features...",
        ));
        let mut builder = DataBuilder::with_config(raw, self.config.processing.clone());
        let feature_columns = builder.preprocess()?.width();
        self.report_progress(ProgressUpdate::new(
            PipelineStage::FeatureBuilding,
            1.0,
            "Features built",
        ));
        self.check_cancelled()?;

        let mut trainer = ModelTrainer::new(self.config.trainer.clone())
            .with_cancellation(self.cancellation_token.clone());

        // 3. Severity models on claims-only rows
        info!("--- Pipeline: Claim Severity Model ---");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::SeverityTraining,
            0.0,
            "Training severity models...",
        ));
        let (x_sev, y_sev) = builder.severity_data()?;
        let split = builder.split_data(&x_sev, &y_sev).context("Severity split")?;
        trainer
            .train_severity_models(&split.x_train, &split.x_test, &split.y_train, &split.y_test)
            .context("Severity models")?;
        let severity = StageRows {
            rows: x_sev.height(),
            split: split.sizes(),
        };
        self.check_cancelled()?;

        // 4. Probability models on all rows
        info!("--- Pipeline: Claim Probability Model ---");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::ProbabilityTraining,
            0.0,
            "Training probability models...",
        ));
        let (x_prob, y_prob) = builder.probability_data()?;
        let split = builder.split_data(&x_prob, &y_prob).context("Probability split")?;
        trainer
            .train_probability_models(&split.x_train, &split.x_test, &split.y_train, &split.y_test)
            .context("Probability models")?;
        let probability = StageRows {
            rows: x_prob.height(),
            split: split.sizes(),
        };
        self.check_cancelled()?;

        // 5. Artifacts
        self.report_progress(ProgressUpdate::new(
            PipelineStage::SavingArtifacts,
            0.0,
            "Saving models...",
        ));
        let models_dir = &self.config.models_dir;
        fs::create_dir_all(models_dir)
            .context(format!("Failed to create '{}'", models_dir.display()))?;

        let severity_key = preferred_key(&trainer, SEVERITY_GBT, SEVERITY_RF);
        let severity_path = self.config.severity_model_path();
        trainer.save_model(severity_key, &severity_path)?;

        let probability_key = preferred_key(&trainer, PROBABILITY_GBT, PROBABILITY_RF);
        let probability_path = self.config.probability_model_path();
        trainer.save_model(probability_key, &probability_path)?;

        let report = TrainingReport {
            generated_at: TrainingReport::timestamp(),
            data_path: self.config.data_path.clone(),
            rows_loaded,
            columns_loaded,
            feature_columns,
            severity,
            probability,
            results: trainer.model_results().to_vec(),
            artifacts: Artifacts {
                severity_model_key: severity_key.to_string(),
                severity_model: severity_path,
                probability_model_key: probability_key.to_string(),
                probability_model: probability_path,
                report: self.config.report_path(),
            },
            duration_seconds: start_time.elapsed().as_secs_f64(),
        };
        report.write_to_file(&report.artifacts.report)?;

        info!(
            "Pipeline Complete. Models saved to '{}' directory.",
            models_dir.display()
        );
        Ok(report)
    }

    /// Build features and write the dashboard figures.
    ///
    /// `exploratory` names numeric columns for the additional histogram,
    /// correlation and box plot figures; pass an empty slice to skip them.
    pub fn generate_dashboard(&self, exploratory: &[String]) -> Result<Vec<PathBuf>> {
        let mut builder = DataBuilder::with_config(self.load()?, self.config.processing.clone());
        builder.preprocess()?;

        let generator = DashboardGenerator::new(&self.config.dashboard_dir);
        let mut saved = generator.generate(&builder)?;

        if !exploratory.is_empty() {
            let columns: Vec<&str> = exploratory.iter().map(String::as_str).collect();
            saved.extend(generator.generate_exploratory(builder.frame(), &columns)?);
        }
        Ok(saved)
    }

    /// Chi-squared test of independence between two columns.
    pub fn chi2(&self, col1: &str, col2: &str) -> Result<ChiSquaredOutcome> {
        let df = self.load_engineered()?;
        Ok(stats::chi2_independence(
            &df,
            col1,
            col2,
            self.config.processing.significance_level,
        )?)
    }

    /// Welch's t-test of `value_col` between two groups of `group_col`.
    pub fn t_test(
        &self,
        group_col: &str,
        value_col: &str,
        group_a: &str,
        group_b: &str,
    ) -> Result<TestOutcome> {
        let df = self.load_engineered()?;
        Ok(stats::welch_t_test(
            &df,
            group_col,
            value_col,
            group_a,
            group_b,
            self.config.processing.significance_level,
        )?)
    }

    /// One-way ANOVA of `value_col` across the groups of `group_col`.
    pub fn anova(&self, group_col: &str, value_col: &str) -> Result<TestOutcome> {
        let df = self.load_engineered()?;
        Ok(stats::one_way_anova(
            &df,
            group_col,
            value_col,
            self.config.processing.significance_level,
        )?)
    }

    /// Shape, types and missing values of the raw file.
    pub fn inspect(&self) -> Result<DatasetSummary> {
        let df = self.load()?;
        Ok(DatasetSummary::from_frame(&self.config.data_path, &df))
    }

    fn load(&self) -> Result<DataFrame> {
        let path = &self.config.data_path;
        if !path.exists() {
            error!("Data file not found at {}", path.display());
            return Err(PipelineError::DataNotFound(path.display().to_string()));
        }
        info!("Loading data from {}...", path.display());
        Ok(load_data_with(path, &self.config.processing)?)
    }

    /// Raw data plus the engineered columns, with labels left readable so
    /// tests can name their groups.
    fn load_engineered(&self) -> Result<DataFrame> {
        let mut df = self.load()?;
        let mut steps = Vec::new();
        FeatureEngineer::apply(&mut df, &self.config.processing, &mut steps)?;
        for step in &steps {
            debug!("{}", step);
        }
        Ok(df)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

fn preferred_key<'a>(trainer: &ModelTrainer, preferred: &'a str, fallback: &'a str) -> &'a str {
    if trainer.has_model(preferred) {
        preferred
    } else {
        fallback
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// ```rust,ignore
    /// let pipeline = Pipeline::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token. Cancel a clone of it from any thread; the
    /// run stops at the next stage boundary or between models.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Validate the configuration and build the pipeline.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
