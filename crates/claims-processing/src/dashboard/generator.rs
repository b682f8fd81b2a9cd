//! Dashboard figure generation.
//!
//! Works on the preprocessed frame held by a [`DataBuilder`]. Encoded
//! categorical columns are decoded back to their labels so bars and hues
//! carry readable names.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{info, warn};

use super::figures::{BoxPanel, Figure, FigureData, HistogramPanel, ScatterPoint};
use crate::error::{ProcessingError, Result};
use crate::features::DataBuilder;
use crate::features::engineering::{
    IS_CLAIM, PREMIUM_RISK_RATIO, SUM_INSURED, TOTAL_CLAIMS, TOTAL_PREMIUM, VEHICLE_AGE,
};
use crate::stats::descriptive::{
    box_plot, build_histogram, correlation_matrix as pearson_matrix, group_means, sorted_values,
    value_counts,
};
use crate::utils::{numeric_values, string_values};

/// Default output directory for figures.
pub const DEFAULT_FIGURE_DIR: &str = "dashboard/figures";

/// Columns of the correlation heatmap.
pub const HEATMAP_COLUMNS: [&str; 6] = [
    TOTAL_PREMIUM,
    TOTAL_CLAIMS,
    SUM_INSURED,
    VEHICLE_AGE,
    PREMIUM_RISK_RATIO,
    IS_CLAIM,
];

const TOP_VEHICLE_TYPES: usize = 10;

/// Writes dashboard figures as JSON files.
#[derive(Debug, Clone)]
pub struct DashboardGenerator {
    output_dir: PathBuf,
    histogram_bins: usize,
    max_scatter_points: usize,
}

impl Default for DashboardGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_FIGURE_DIR)
    }
}

impl DashboardGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            histogram_bins: 30,
            max_scatter_points: 10_000,
        }
    }

    #[must_use]
    pub fn with_histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = bins.max(1);
        self
    }

    /// Cap on scatter points written; larger frames are sampled evenly.
    #[must_use]
    pub fn with_max_scatter_points(mut self, points: usize) -> Self {
        self.max_scatter_points = points.max(1);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Build and save every dashboard figure. Returns the written paths.
    ///
    /// Figures whose source columns are missing are skipped with a warning.
    pub fn generate(&self, builder: &DataBuilder) -> Result<Vec<PathBuf>> {
        info!("Generating Dashboard Figures...");

        let builders: [(&str, fn(&Self, &DataBuilder) -> Result<Figure>); 6] = [
            ("Premium vs Claims", Self::premium_vs_claims),
            ("Geographic Trends", Self::geographic_trend),
            ("Outliers", Self::outliers_boxplot),
            ("Correlation Heatmap", Self::correlation_heatmap),
            ("Categorical Risk", Self::categorical_risk),
            ("Key Insight", Self::key_insight),
        ];

        let mut saved = Vec::with_capacity(builders.len());
        for (label, build) in builders {
            info!("Plotting {}...", label);
            match build(self, builder) {
                Ok(figure) => saved.push(self.save(&figure)?),
                Err(e @ ProcessingError::ColumnNotFound(_)) => {
                    warn!("Skipping {}: {}", label, e);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Dashboard Generation Complete.");
        Ok(saved)
    }

    /// Save histogram, correlation and box plot figures for `columns`.
    pub fn generate_exploratory(&self, df: &DataFrame, columns: &[&str]) -> Result<Vec<PathBuf>> {
        let figures = [
            numerical_distributions(df, columns, self.histogram_bins)?,
            correlation_matrix(df, columns)?,
            outlier_boxplots(df, columns)?,
        ];
        figures.iter().flatten().map(|f| self.save(f)).collect()
    }

    /// Write one figure to `<output_dir>/<name>.json`.
    pub fn save(&self, figure: &Figure) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.json", figure.name));
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(figure)?.as_bytes())?;
        info!("Saved figure: {}", path.display());
        Ok(path)
    }

    /// Scatter of premium against claims, coloured by the claim flag.
    pub fn premium_vs_claims(&self, builder: &DataBuilder) -> Result<Figure> {
        let df = builder.frame();
        let x = numbers(df, TOTAL_PREMIUM)?;
        let y = numbers(df, TOTAL_CLAIMS)?;
        let hue = labels(builder, IS_CLAIM).ok();

        let total_points = x.len();
        let stride = total_points.div_ceil(self.max_scatter_points).max(1);
        let points = (0..total_points)
            .step_by(stride)
            .filter_map(|i| {
                Some(ScatterPoint {
                    x: x[i]?,
                    y: y[i]?,
                    hue: hue.as_ref().and_then(|h| h[i].clone()),
                })
            })
            .collect();

        Ok(Figure::new(
            "premium_vs_claims",
            "Premium vs. Claims Correlation",
            FigureData::Scatter {
                total_points,
                points,
            },
        )
        .with_x_label("Total Premium (ZAR)")
        .with_y_label("Total Claims (ZAR)"))
    }

    /// Mean claim amount per province, highest first.
    pub fn geographic_trend(&self, builder: &DataBuilder) -> Result<Figure> {
        let provinces = labels(builder, "Province")?;
        let claims = numbers(builder.frame(), TOTAL_CLAIMS)?;

        let mut bars = group_means(&provinces, &claims);
        bars.sort_by(|a, b| b.mean.total_cmp(&a.mean));
        for bar in &mut bars {
            bar.ci = None;
        }

        Ok(Figure::new(
            "geographic_trend",
            "Average Claim Severity by Province",
            FigureData::Bar { bars },
        )
        .with_x_label("Province")
        .with_y_label("Avg Total Claims (ZAR)"))
    }

    /// Box plot of premiums with IQR outliers.
    pub fn outliers_boxplot(&self, builder: &DataBuilder) -> Result<Figure> {
        let figure = box_figure(builder.frame(), &[TOTAL_PREMIUM])?;
        Ok(Figure {
            name: "outliers_boxplot".to_string(),
            title: "Distribution of Total Premium (Outlier Detection)".to_string(),
            ..figure
        }
        .with_x_label("Total Premium"))
    }

    /// Pearson correlations of the key risk variables.
    pub fn correlation_heatmap(&self, builder: &DataBuilder) -> Result<Figure> {
        let df = builder.frame();
        let present: Vec<&str> = HEATMAP_COLUMNS
            .into_iter()
            .filter(|c| df.column(c).is_ok())
            .collect();
        if present.is_empty() {
            return Err(ProcessingError::ColumnNotFound(HEATMAP_COLUMNS.join(", ")));
        }

        let figure = heatmap_figure(df, &present)?;
        Ok(Figure {
            name: "correlation_heatmap".to_string(),
            title: "Key Variable Correlations".to_string(),
            ..figure
        })
    }

    /// Claim rate per vehicle type for the most common types.
    pub fn categorical_risk(&self, builder: &DataBuilder) -> Result<Figure> {
        let types = labels(builder, "VehicleType")?;
        let flags = numbers(builder.frame(), IS_CLAIM)?;

        let top: Vec<String> = value_counts(&types)
            .into_iter()
            .take(TOP_VEHICLE_TYPES)
            .map(|(label, _)| label)
            .collect();
        let means = group_means(&types, &flags);
        let bars = top
            .iter()
            .filter_map(|label| means.iter().find(|g| &g.label == label).cloned())
            .map(|mut g| {
                g.ci = None;
                g
            })
            .collect();

        Ok(Figure::new(
            "categorical_risk",
            "Claim Probability by Vehicle Type",
            FigureData::Bar { bars },
        )
        .with_x_label("VehicleType")
        .with_y_label("Claim Probability"))
    }

    /// Mean claim amount by gender with 95% confidence intervals.
    pub fn key_insight(&self, builder: &DataBuilder) -> Result<Figure> {
        let genders = labels(builder, "Gender")?;
        let claims = numbers(builder.frame(), TOTAL_CLAIMS)?;

        Ok(Figure::new(
            "key3_insight_plots",
            "Risk Profile: Gender Analysis (Statistically Insignificant)",
            FigureData::Bar {
                bars: group_means(&genders, &claims),
            },
        )
        .with_x_label("Gender")
        .with_y_label("Average Claim Severity"))
    }
}

// =============================================================================
// Exploratory figures
// =============================================================================

/// Histogram per numeric column. `None` when `columns` is empty.
pub fn numerical_distributions(
    df: &DataFrame,
    columns: &[&str],
    bins: usize,
) -> Result<Option<Figure>> {
    if columns.is_empty() {
        return Ok(None);
    }

    let panels = columns
        .iter()
        .map(|&column| -> Result<HistogramPanel> {
            let values: Vec<f64> = numbers(df, column)?.into_iter().flatten().collect();
            Ok(HistogramPanel {
                column: column.to_string(),
                bins: build_histogram(&sorted_values(&values), bins),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(
        Figure::new(
            "numerical_distributions",
            "Numerical Distributions",
            FigureData::Histograms { panels },
        )
        .with_y_label("Frequency"),
    ))
}

/// Correlation matrix of numeric columns. `None` when `columns` is empty.
pub fn correlation_matrix(df: &DataFrame, columns: &[&str]) -> Result<Option<Figure>> {
    if columns.is_empty() {
        return Ok(None);
    }
    heatmap_figure(df, columns).map(Some)
}

/// Box plot per numeric column. `None` when `columns` is empty.
pub fn outlier_boxplots(df: &DataFrame, columns: &[&str]) -> Result<Option<Figure>> {
    if columns.is_empty() {
        return Ok(None);
    }
    box_figure(df, columns).map(Some)
}

fn heatmap_figure(df: &DataFrame, columns: &[&str]) -> Result<Figure> {
    let data = columns
        .iter()
        .map(|&c| -> Result<(String, Vec<Option<f64>>)> { Ok((c.to_string(), numbers(df, c)?)) })
        .collect::<Result<Vec<_>>>()?;

    Ok(Figure::new(
        "correlation_matrix",
        "Correlation Matrix",
        FigureData::Heatmap {
            matrix: pearson_matrix(&data),
        },
    ))
}

fn box_figure(df: &DataFrame, columns: &[&str]) -> Result<Figure> {
    let mut panels = Vec::with_capacity(columns.len());
    for &column in columns {
        let values: Vec<f64> = numbers(df, column)?.into_iter().flatten().collect();
        match box_plot(&sorted_values(&values)) {
            Some(summary) => panels.push(BoxPanel {
                column: column.to_string(),
                summary,
            }),
            None => warn!("No values to plot in '{}'", column),
        }
    }

    Ok(Figure::new(
        "outlier_boxplots",
        "Outlier Detection",
        FigureData::BoxPlot { panels },
    ))
}

fn numbers(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(column)
        .map_err(|_| ProcessingError::ColumnNotFound(column.to_string()))?;
    Ok(numeric_values(col.as_materialized_series())?)
}

/// Column values as labels, decoding label-encoded columns.
fn labels(builder: &DataBuilder, column: &str) -> Result<Vec<Option<String>>> {
    let series = builder
        .frame()
        .column(column)
        .map_err(|_| ProcessingError::ColumnNotFound(column.to_string()))?
        .as_materialized_series();

    let Some(encoder) = builder.encoders().get(column) else {
        return Ok(string_values(series)?);
    };

    let codes = series.cast(&DataType::UInt32)?;
    codes
        .u32()?
        .into_iter()
        .map(|code| {
            code.map(|c| encoder.decode(c).map(str::to_string))
                .transpose()
        })
        .collect()
}
