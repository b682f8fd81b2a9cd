//! Hypothesis tests and descriptive statistics.

pub mod descriptive;
pub mod hypothesis;

pub use descriptive::{BoxPlotSummary, GroupStat, HeatmapMatrix, HistogramBin};
pub use hypothesis::{
    ChiSquaredOutcome, ContingencyTable, DEFAULT_ALPHA, Decision, TestKind, TestOutcome,
    TestResult, chi2_independence, one_way_anova, welch_t_test,
};
