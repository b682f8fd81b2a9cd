//! Descriptive statistics behind the dashboard figures.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

/// Outlier points kept per box plot; the full count is always reported.
pub const MAX_OUTLIER_POINTS: usize = 1_000;

/// One histogram bucket, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Box plot with Tukey whiskers.
///
/// `min` and `max` are the whisker ends: the most extreme values within
/// 1.5 IQR of the quartiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxPlotSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub outlier_count: usize,
    pub outliers: Vec<f64>,
}

/// Square matrix of pairwise statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapMatrix {
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

/// Mean of a value column within one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStat {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    /// 95% confidence interval of the mean; `None` below two observations.
    pub ci: Option<(f64, f64)>,
}

/// Sort ascending, dropping NaN.
pub fn sorted_values(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile of sorted data with linear interpolation.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

/// Equal-width histogram of sorted data.
pub fn build_histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: sorted.len(),
        }];
    }

    let bin_count = bins.max(1);
    let width = (max - min) / bin_count as f64;
    let mut counts = vec![0usize; bin_count];

    for value in sorted {
        let index = (((value - min) / width) as usize).min(bin_count - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: min + idx as f64 * width,
            end: min + (idx as f64 + 1.0) * width,
            count,
        })
        .collect()
}

/// Box plot summary of sorted data. `None` when empty.
pub fn box_plot(sorted: &[f64]) -> Option<BoxPlotSummary> {
    if sorted.is_empty() {
        return None;
    }

    let q1 = quantile_sorted(sorted, 0.25);
    let median = quantile_sorted(sorted, 0.5);
    let q3 = quantile_sorted(sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let min = sorted.iter().copied().find(|v| *v >= lower_fence).unwrap_or(q1);
    let max = sorted.iter().rev().copied().find(|v| *v <= upper_fence).unwrap_or(q3);

    let all_outliers = sorted.iter().filter(|v| **v < lower_fence || **v > upper_fence);
    let outlier_count = all_outliers.clone().count();

    Some(BoxPlotSummary {
        min,
        q1,
        median,
        q3,
        max,
        lower_fence,
        upper_fence,
        outlier_count,
        outliers: all_outliers.take(MAX_OUTLIER_POINTS).copied().collect(),
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator). `None` below two observations.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() as f64 - 1.0))
}

/// Student-t confidence interval of the mean.
pub fn mean_confidence_interval(values: &[f64], level: f64) -> Option<(f64, f64)> {
    let m = mean(values)?;
    let var = sample_variance(values)?;
    let n = values.len() as f64;
    let dist = StudentsT::new(0.0, 1.0, n - 1.0).ok()?;
    let t = dist.inverse_cdf(0.5 + level / 2.0);
    let half_width = t * (var / n).sqrt();
    Some((m - half_width, m + half_width))
}

/// Pearson correlation over pairs where both values are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Pairwise Pearson matrix of named columns.
pub fn correlation_matrix(columns: &[(String, Vec<Option<f64>>)]) -> HeatmapMatrix {
    let labels: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
    let values = columns
        .iter()
        .map(|(_, x)| columns.iter().map(|(_, y)| pearson(x, y)).collect())
        .collect();
    HeatmapMatrix {
        x_labels: labels.clone(),
        y_labels: labels,
        values,
    }
}

/// Group values by label, skipping rows where either side is missing or the
/// value is not finite.
pub fn group_values(labels: &[Option<String>], values: &[Option<f64>]) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut skipped = 0usize;
    for (label, value) in labels.iter().zip(values) {
        match (label, value) {
            (Some(label), Some(value)) if value.is_finite() => {
                groups.entry(label.clone()).or_default().push(*value);
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!("Skipped {} rows with a missing label or value", skipped);
    }
    groups
}

/// Per-group mean with a 95% confidence interval, sorted by label.
pub fn group_means(labels: &[Option<String>], values: &[Option<f64>]) -> Vec<GroupStat> {
    group_values(labels, values)
        .into_iter()
        .filter_map(|(label, vals)| {
            Some(GroupStat {
                count: vals.len(),
                mean: mean(&vals)?,
                ci: mean_confidence_interval(&vals, 0.95),
                label,
            })
        })
        .collect()
}

/// Frequency of each label, most frequent first (ties by label).
pub fn value_counts(labels: &[Option<String>]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels.iter().flatten() {
        *counts.entry(label.as_str()).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
