//! Dashboard figures as JSON chart data.

pub mod figures;
pub mod generator;

pub use figures::{Figure, FigureData};
pub use generator::{
    DEFAULT_FIGURE_DIR, DashboardGenerator, correlation_matrix, numerical_distributions,
    outlier_boxplots,
};
