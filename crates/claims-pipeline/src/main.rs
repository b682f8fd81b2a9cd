//! CLI entry point for the claims analytics pipeline.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use claims_pipeline::{DatasetSummary, Pipeline, PipelineConfig, TrainingReport};
use claims_processing::stats::{ChiSquaredOutcome, TestOutcome, TestResult};
use dotenv::dotenv;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Insurance claims analytics: risk models, dashboard and hypothesis tests",
    long_about = "Trains claim severity and claim probability models on a pipe-delimited \
                  policy/claims file, writes dashboard figures and runs hypothesis tests.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  CLAIMS_DATA_PATH    Data file used when --data is not given\n  \
                  RUST_LOG            Log filter, overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Train and save both models\n  \
                  claims-pipeline run --data data/raw/MachineLearningRating.txt\n\n  \
                  # Dashboard with extra exploratory figures\n  \
                  claims-pipeline dashboard --exploratory TotalPremium,TotalClaims\n\n  \
                  # Does claim frequency depend on the province?\n  \
                  claims-pipeline hypothesis chi2 Province IsClaim"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raw data file (overrides the config file and CLAIMS_DATA_PATH)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Output directory for models and the training report
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and results)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print results as JSON to stdout
    ///
    /// Disables all logging so stdout holds only the JSON document.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build features, train both model families and save the models
    Run {
        /// Skip the gradient-boosted models
        #[arg(long)]
        no_boosting: bool,

        /// Trees per forest and boosting rounds
        #[arg(long)]
        n_estimators: Option<usize>,
    },

    /// Write the dashboard figures as JSON chart data
    Dashboard {
        /// Output directory for figures
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Numeric columns for extra histogram, correlation and box plot figures
        #[arg(long, value_delimiter = ',')]
        exploratory: Vec<String>,
    },

    /// Run a hypothesis test on the raw data plus engineered columns
    Hypothesis {
        #[command(subcommand)]
        test: HypothesisTest,
    },

    /// Show shape, column types and missing values of the data file
    Inspect,
}

#[derive(Subcommand, Debug)]
enum HypothesisTest {
    /// Chi-squared test of independence between two categorical columns
    Chi2 { col1: String, col2: String },

    /// Welch's t-test of a numeric column between two groups
    Ttest {
        group_col: String,
        value_col: String,
        group_a: String,
        group_b: String,
    },

    /// One-way ANOVA of a numeric column across all groups
    Anova { group_col: String, value_col: String },
}

/// Initialize the tracing subscriber.
///
/// With `json_output` no subscriber is installed so stdout holds only JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    // Load environment variables from .env file
    dotenv().ok();

    let mut config = load_config(&cli)?;

    match &cli.command {
        Command::Run {
            no_boosting,
            n_estimators,
        } => {
            if *no_boosting {
                config.trainer.enable_boosting = false;
            }
            if let Some(n) = n_estimators {
                config.trainer.n_estimators = *n;
            }
            let report = build_pipeline(&cli, config)?.run()?;
            print_training_report(&report, cli.json)
        }
        Command::Dashboard {
            output,
            exploratory,
        } => {
            if let Some(dir) = output {
                config.dashboard_dir = dir.clone();
            }
            let saved = build_pipeline(&cli, config)?.generate_dashboard(exploratory)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&saved)?);
            } else {
                println!("\nSaved {} figures:", saved.len());
                for path in &saved {
                    println!("  {}", path.display());
                }
            }
            Ok(())
        }
        Command::Hypothesis { test } => {
            let pipeline = build_pipeline(&cli, config)?;
            run_hypothesis(&pipeline, test, cli.json)
        }
        Command::Inspect => {
            let summary = build_pipeline(&cli, config)?.inspect()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(())
        }
    }
}

/// Config file (or defaults), then `CLAIMS_DATA_PATH`, then CLI flags.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .map_err(|e| anyhow!("Failed to load config '{}': {}", path.display(), e))?,
        None => PipelineConfig::default(),
    };
    let mut config = config.with_env_overrides();

    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if let Some(dir) = &cli.models_dir {
        config.models_dir = dir.clone();
    }
    Ok(config)
}

fn build_pipeline(cli: &Cli, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);
    if !cli.json && !cli.quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    Ok(builder.build()?)
}

fn print_training_report(report: &TrainingReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n--- Final Results ---");
    println!("{}", report.results_table()?);
    println!();
    println!(
        "Severity model:    {} -> {}",
        report.artifacts.severity_model_key,
        report.artifacts.severity_model.display()
    );
    println!(
        "Probability model: {} -> {}",
        report.artifacts.probability_model_key,
        report.artifacts.probability_model.display()
    );
    println!("Report:            {}", report.artifacts.report.display());
    println!("Duration:          {:.1}s", report.duration_seconds);
    Ok(())
}

fn run_hypothesis(pipeline: &Pipeline, test: &HypothesisTest, json: bool) -> Result<()> {
    match test {
        HypothesisTest::Chi2 { col1, col2 } => {
            let outcome = pipeline.chi2(col1, col2)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_chi2(col1, col2, &outcome);
            }
        }
        HypothesisTest::Ttest {
            group_col,
            value_col,
            group_a,
            group_b,
        } => {
            let outcome = pipeline.t_test(group_col, value_col, group_a, group_b)?;
            let heading = format!(
                "T-Test of {} by {}: '{}' vs '{}'",
                value_col, group_col, group_a, group_b
            );
            print_outcome(&heading, &outcome, json)?;
        }
        HypothesisTest::Anova {
            group_col,
            value_col,
        } => {
            let outcome = pipeline.anova(group_col, value_col)?;
            let heading = format!("ANOVA of {} across {}", value_col, group_col);
            print_outcome(&heading, &outcome, json)?;
        }
    }
    Ok(())
}

fn print_outcome(heading: &str, outcome: &TestOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!("\n{}", heading);
    println!("{}", "-".repeat(heading.len()));
    match outcome {
        TestOutcome::Completed(result) => print_test_result(result),
        TestOutcome::Insufficient { reason } => println!("  {}", reason),
    }
    Ok(())
}

fn print_chi2(col1: &str, col2: &str, outcome: &ChiSquaredOutcome) {
    let heading = format!("Chi-squared: {} vs {}", col1, col2);
    println!("\n{}", heading);
    println!("{}", "-".repeat(heading.len()));

    let table = &outcome.table;
    print!("  {:<24}", truncate_str(col1, 23));
    for label in &table.col_labels {
        print!(" {:>10}", truncate_str(label, 10));
    }
    println!();
    for (label, row) in table.row_labels.iter().zip(&table.counts) {
        print!("  {:<24}", truncate_str(label, 23));
        for count in row {
            print!(" {:>10}", count);
        }
        println!();
    }
    println!();
    print_test_result(&outcome.result);
}

fn print_test_result(result: &TestResult) {
    println!("  Test:       {}", result.test.display_name());
    println!("  Statistic:  {:.4}", result.statistic);
    println!("  P-value:    {:.4e}", result.p_value);
    match result.dof_within {
        Some(within) => println!("  DoF:        {} / {}", result.dof, within),
        None => println!("  DoF:        {:.2}", result.dof),
    }
    println!("  Alpha:      {}", result.alpha);
    println!("  {}", result.interpretation);
}

fn print_summary(summary: &DatasetSummary) {
    println!("\n{}", "=".repeat(60));
    println!("DATASET OVERVIEW");
    println!("{}", "=".repeat(60));
    println!("  File:    {}", summary.data_path.display());
    println!("  Rows:    {}", summary.rows);
    println!("  Columns: {}", summary.columns.len());
    println!();

    println!("{:<28} {:<14} {:>10}", "Column", "Type", "Missing");
    println!("{}", "-".repeat(54));
    for col in &summary.columns {
        println!(
            "{:<28} {:<14} {:>10}",
            truncate_str(&col.name, 27),
            truncate_str(&col.dtype, 13),
            col.null_count
        );
    }

    let missing = summary.columns_with_nulls();
    if !missing.is_empty() {
        println!("\nColumns with missing values: {}", missing.len());
    }
}

fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}~", kept)
    }
}
