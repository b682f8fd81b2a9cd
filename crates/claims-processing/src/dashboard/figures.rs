//! Serializable chart data.
//!
//! Figures are written as JSON documents; any plotting front end can render
//! them without re-reading the dataset.

use serde::{Deserialize, Serialize};

use crate::stats::{BoxPlotSummary, GroupStat, HeatmapMatrix, HistogramBin};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub hue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramPanel {
    pub column: String,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxPanel {
    pub column: String,
    pub summary: BoxPlotSummary,
}

/// Chart payload, tagged by chart type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FigureData {
    Scatter {
        /// Rows in the source data; `points` may be a sample.
        total_points: usize,
        points: Vec<ScatterPoint>,
    },
    Bar {
        bars: Vec<GroupStat>,
    },
    BoxPlot {
        panels: Vec<BoxPanel>,
    },
    Heatmap {
        matrix: HeatmapMatrix,
    },
    Histograms {
        panels: Vec<HistogramPanel>,
    },
}

/// A titled, labelled chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// File stem the figure is saved under.
    pub name: String,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    #[serde(flatten)]
    pub data: FigureData,
}

impl Figure {
    pub fn new(name: impl Into<String>, title: impl Into<String>, data: FigureData) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            x_label: None,
            y_label: None,
            data,
        }
    }

    #[must_use]
    pub fn with_x_label(mut self, label: impl Into<String>) -> Self {
        self.x_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = Some(label.into());
        self
    }
}
