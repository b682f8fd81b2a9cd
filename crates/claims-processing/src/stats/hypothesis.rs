//! Classical hypothesis tests on claims data.
//!
//! - chi-squared test of independence between two categorical columns
//! - Welch's two-sample t-test of a value column between two groups
//! - one-way ANOVA of a value column across all groups
//!
//! Group labels are compared as text, so encoded columns can be tested with
//! their codes (`"0"`, `"1"`) and raw columns with their labels.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::debug;

use super::descriptive::{group_values, mean, sample_variance};
use crate::error::{ProcessingError, Result};
use crate::utils::{numeric_values, string_values};

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Outcome of comparing a p-value to the significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Reject,
    FailToReject,
}

impl Decision {
    /// NaN p-values never reject.
    pub fn from_p_value(p_value: f64, alpha: f64) -> Self {
        if p_value < alpha {
            Self::Reject
        } else {
            Self::FailToReject
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    ChiSquared,
    WelchT,
    OneWayAnova,
}

impl TestKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ChiSquared => "Chi-squared test of independence",
            Self::WelchT => "Welch's t-test",
            Self::OneWayAnova => "One-way ANOVA",
        }
    }

    fn interpretation(&self, decision: Decision) -> &'static str {
        match (self, decision) {
            (Self::ChiSquared, Decision::Reject) => {
                "Reject Null Hypothesis: Significant difference exists."
            }
            (Self::ChiSquared, Decision::FailToReject) => {
                "Fail to Reject Null: No significant difference found."
            }
            (Self::WelchT, Decision::Reject) => {
                "Reject Null Hypothesis: Means are significantly different."
            }
            (Self::WelchT, Decision::FailToReject) => {
                "Fail to Reject Null: No significant difference in means."
            }
            (Self::OneWayAnova, Decision::Reject) => {
                "Reject Null Hypothesis: At least one group mean is different."
            }
            (Self::OneWayAnova, Decision::FailToReject) => {
                "Fail to Reject Null: No significant difference across groups."
            }
        }
    }
}

/// Statistic, p-value and decision of a completed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test: TestKind,
    pub statistic: f64,
    pub p_value: f64,
    /// Degrees of freedom; for ANOVA the between-groups value.
    pub dof: f64,
    /// Within-groups degrees of freedom (ANOVA only).
    pub dof_within: Option<f64>,
    pub alpha: f64,
    pub decision: Decision,
    pub interpretation: String,
}

impl TestResult {
    fn new(test: TestKind, statistic: f64, p_value: f64, dof: f64, alpha: f64) -> Self {
        let decision = Decision::from_p_value(p_value, alpha);
        Self {
            test,
            statistic,
            p_value,
            dof,
            dof_within: None,
            alpha,
            decision,
            interpretation: test.interpretation(decision).to_string(),
        }
    }

    pub fn is_significant(&self) -> bool {
        self.decision == Decision::Reject
    }
}

/// Observed counts of two categorical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    /// Cross-tabulate label pairs; pairs with a missing side are skipped.
    pub fn from_pairs(rows: &[Option<String>], cols: &[Option<String>]) -> Self {
        let mut cells: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        for (r, c) in rows.iter().zip(cols) {
            if let (Some(r), Some(c)) = (r, c) {
                *cells.entry((r.as_str(), c.as_str())).or_insert(0) += 1;
            }
        }

        let mut row_labels: Vec<String> = cells.keys().map(|(r, _)| r.to_string()).collect();
        row_labels.dedup();
        let mut col_labels: Vec<String> = cells.keys().map(|(_, c)| c.to_string()).collect();
        col_labels.sort();
        col_labels.dedup();

        let counts = row_labels
            .iter()
            .map(|r| {
                col_labels
                    .iter()
                    .map(|c| cells.get(&(r.as_str(), c.as_str())).copied().unwrap_or(0))
                    .collect()
            })
            .collect();

        Self {
            row_labels,
            col_labels,
            counts,
        }
    }

    /// Expected counts under independence.
    pub fn expected(&self) -> Vec<Vec<f64>> {
        let row_totals: Vec<f64> = self
            .counts
            .iter()
            .map(|row| row.iter().sum::<u64>() as f64)
            .collect();
        let col_totals: Vec<f64> = (0..self.col_labels.len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum::<u64>() as f64)
            .collect();
        let total: f64 = row_totals.iter().sum();

        row_totals
            .iter()
            .map(|rt| col_totals.iter().map(|ct| rt * ct / total).collect())
            .collect()
    }
}

/// Result of the chi-squared test with its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquaredOutcome {
    pub result: TestResult,
    pub table: ContingencyTable,
    pub expected: Vec<Vec<f64>>,
}

/// Result of a test that may lack enough data to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Completed(TestResult),
    Insufficient { reason: String },
}

impl TestOutcome {
    /// Human-readable interpretation, or the reason the test did not run.
    pub fn interpretation(&self) -> &str {
        match self {
            Self::Completed(result) => &result.interpretation,
            Self::Insufficient { reason } => reason,
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match self {
            Self::Completed(result) => Some(result.p_value),
            Self::Insufficient { .. } => None,
        }
    }
}

fn column_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let col = df
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    Ok(string_values(col.as_materialized_series())?)
}

fn column_numbers(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(name)
        .map_err(|_| ProcessingError::ColumnNotFound(name.to_string()))?;
    Ok(numeric_values(col.as_materialized_series())?)
}

/// Chi-squared test of independence between `col1` and `col2`.
///
/// Applies Yates' continuity correction when the table has one degree of
/// freedom.
pub fn chi2_independence(
    df: &DataFrame,
    col1: &str,
    col2: &str,
    alpha: f64,
) -> Result<ChiSquaredOutcome> {
    let table = ContingencyTable::from_pairs(&column_strings(df, col1)?, &column_strings(df, col2)?);
    let (r, c) = (table.row_labels.len(), table.col_labels.len());
    if r == 0 || c == 0 {
        return Err(ProcessingError::InsufficientData(format!(
            "no rows with both '{}' and '{}' present",
            col1, col2
        )));
    }

    let expected = table.expected();
    if r < 2 || c < 2 {
        // A single level on either side matches its expectation exactly
        debug!("chi2({}, {}) on a {}x{} table: dof = 0", col1, col2, r, c);
        return Ok(ChiSquaredOutcome {
            result: TestResult::new(TestKind::ChiSquared, 0.0, 1.0, 0.0, alpha),
            table,
            expected,
        });
    }

    let dof = ((r - 1) * (c - 1)) as f64;
    let yates = (r - 1) * (c - 1) == 1;

    let mut statistic = 0.0;
    for (obs_row, exp_row) in table.counts.iter().zip(&expected) {
        for (&obs, &exp) in obs_row.iter().zip(exp_row) {
            let mut diff = (obs as f64 - exp).abs();
            if yates {
                diff = (diff - 0.5).max(0.0);
            }
            statistic += diff * diff / exp;
        }
    }

    let dist = ChiSquared::new(dof).map_err(|e| ProcessingError::InsufficientData(e.to_string()))?;
    let p_value = dist.sf(statistic);
    debug!(
        "chi2({}, {}) = {:.4}, dof = {}, p = {:.4e}",
        col1, col2, statistic, dof, p_value
    );

    Ok(ChiSquaredOutcome {
        result: TestResult::new(TestKind::ChiSquared, statistic, p_value, dof, alpha),
        table,
        expected,
    })
}

/// Welch's t-test of `value_col` between `group_a` and `group_b`.
pub fn welch_t_test(
    df: &DataFrame,
    group_col: &str,
    value_col: &str,
    group_a: &str,
    group_b: &str,
    alpha: f64,
) -> Result<TestOutcome> {
    let groups = group_values(&column_strings(df, group_col)?, &column_numbers(df, value_col)?);
    let sample_a = groups.get(group_a).map(Vec::as_slice).unwrap_or_default();
    let sample_b = groups.get(group_b).map(Vec::as_slice).unwrap_or_default();

    if sample_a.len() < 2 || sample_b.len() < 2 {
        return Ok(TestOutcome::Insufficient {
            reason: "Insufficient Data".to_string(),
        });
    }

    Ok(TestOutcome::Completed(welch_from_samples(sample_a, sample_b, alpha)))
}

/// Welch's t-test on two samples of at least two values each.
pub fn welch_from_samples(a: &[f64], b: &[f64], alpha: f64) -> TestResult {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (ma, mb) = (mean(a).unwrap_or(f64::NAN), mean(b).unwrap_or(f64::NAN));
    let va = sample_variance(a).unwrap_or(f64::NAN) / na;
    let vb = sample_variance(b).unwrap_or(f64::NAN) / nb;

    let se = (va + vb).sqrt();
    let statistic = (ma - mb) / se;
    let dof = (va + vb).powi(2) / (va.powi(2) / (na - 1.0) + vb.powi(2) / (nb - 1.0));

    let p_value = if se > 0.0 && statistic.is_finite() && dof.is_finite() {
        match StudentsT::new(0.0, 1.0, dof) {
            Ok(dist) => 2.0 * dist.sf(statistic.abs()),
            Err(_) => f64::NAN,
        }
    } else {
        f64::NAN
    };

    TestResult::new(TestKind::WelchT, statistic, p_value, dof, alpha)
}

/// One-way ANOVA of `value_col` across the groups of `group_col`.
pub fn one_way_anova(
    df: &DataFrame,
    group_col: &str,
    value_col: &str,
    alpha: f64,
) -> Result<TestOutcome> {
    let groups = group_values(&column_strings(df, group_col)?, &column_numbers(df, value_col)?);
    let samples: Vec<Vec<f64>> = groups.into_values().filter(|g| !g.is_empty()).collect();

    if samples.len() < 2 {
        return Ok(TestOutcome::Insufficient {
            reason: "Insufficient Groups".to_string(),
        });
    }

    Ok(TestOutcome::Completed(anova_from_groups(&samples, alpha)))
}

/// Fisher's one-way ANOVA over non-empty groups.
pub fn anova_from_groups(groups: &[Vec<f64>], alpha: f64) -> TestResult {
    let k = groups.len();
    let n_total: usize = groups.iter().map(Vec::len).sum();
    let grand_mean = groups.iter().flatten().sum::<f64>() / n_total as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let m = mean(group).unwrap_or(grand_mean);
        ss_between += group.len() as f64 * (m - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = n_total as f64 - k as f64;
    let ms_between = ss_between / df_between;
    let ms_within = ss_within / df_within;

    let (statistic, p_value) = if df_within <= 0.0 {
        (f64::NAN, f64::NAN)
    } else if ms_within > 0.0 {
        let f_stat = ms_between / ms_within;
        let p = FisherSnedecor::new(df_between, df_within)
            .map(|dist| dist.sf(f_stat))
            .unwrap_or(f64::NAN);
        (f_stat, p)
    } else if ss_between > 0.0 {
        // Constant groups with different means
        (f64::INFINITY, 0.0)
    } else {
        (f64::NAN, f64::NAN)
    };

    let mut result = TestResult::new(TestKind::OneWayAnova, statistic, p_value, df_between, alpha);
    result.dof_within = Some(df_within);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_contingency_table_sorted_labels() {
        let rows: Vec<Option<String>> =
            vec![Some("b".into()), Some("a".into()), Some("b".into()), None];
        let cols: Vec<Option<String>> =
            vec![Some("y".into()), Some("x".into()), Some("x".into()), Some("x".into())];
        let table = ContingencyTable::from_pairs(&rows, &cols);
        assert_eq!(table.row_labels, vec!["a", "b"]);
        assert_eq!(table.col_labels, vec!["x", "y"]);
        assert_eq!(table.counts, vec![vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_chi2_with_yates_correction() {
        // [[10, 20], [30, 40]]: scipy chi2_contingency gives 0.4464, p = 0.5040
        let mut group = Vec::new();
        let mut flag = Vec::new();
        for (g, f, n) in [("A", "0", 10), ("A", "1", 20), ("B", "0", 30), ("B", "1", 40)] {
            for _ in 0..n {
                group.push(g);
                flag.push(f);
            }
        }
        let df = df!["Group" => group, "Flag" => flag].unwrap();

        let outcome = chi2_independence(&df, "Group", "Flag", DEFAULT_ALPHA).unwrap();

        assert_eq!(outcome.result.dof, 1.0);
        assert!(close(outcome.result.statistic, 0.4464, 1e-3));
        assert!(close(outcome.result.p_value, 0.5040, 1e-3));
        assert_eq!(outcome.result.decision, Decision::FailToReject);
        assert_eq!(
            outcome.result.interpretation,
            "Fail to Reject Null: No significant difference found."
        );
    }

    #[test]
    fn test_chi2_detects_dependence() {
        let group: Vec<&str> = (0..200).map(|i| if i < 100 { "A" } else { "B" }).collect();
        let flag: Vec<&str> = (0..200)
            .map(|i| if (i < 100 && i % 10 == 0) || (i >= 100 && i % 10 != 0) { "1" } else { "0" })
            .collect();
        let df = df!["Group" => group, "Flag" => flag].unwrap();

        let outcome = chi2_independence(&df, "Group", "Flag", DEFAULT_ALPHA).unwrap();

        assert!(outcome.result.is_significant());
        assert_eq!(
            outcome.result.interpretation,
            "Reject Null Hypothesis: Significant difference exists."
        );
    }

    #[test]
    fn test_chi2_single_level_fails_to_reject() {
        // scipy chi2_contingency on a 1x2 table -> (0.0, 1.0, dof 0)
        let df = df!["Group" => ["A", "A", "A"], "Flag" => ["0", "1", "1"]].unwrap();
        let outcome = chi2_independence(&df, "Group", "Flag", DEFAULT_ALPHA).unwrap();

        assert_eq!(outcome.table.counts, vec![vec![1, 2]]);
        assert_eq!(outcome.result.statistic, 0.0);
        assert_eq!(outcome.result.p_value, 1.0);
        assert_eq!(outcome.result.dof, 0.0);
        assert_eq!(outcome.result.decision, Decision::FailToReject);
    }

    #[test]
    fn test_chi2_without_complete_rows_is_insufficient() {
        let df = df![
            "Group" => [Some("A"), None],
            "Flag" => [None, Some("1")],
        ]
        .unwrap();
        let err = chi2_independence(&df, "Group", "Flag", DEFAULT_ALPHA).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_welch_matches_reference() {
        // scipy.stats.ttest_ind([1,2,3,4,5], [2,4,6,8,10], equal_var=False)
        // -> statistic -1.8974, p 0.1075, dof 5.882
        let result = welch_from_samples(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[2.0, 4.0, 6.0, 8.0, 10.0],
            DEFAULT_ALPHA,
        );
        assert!(close(result.statistic, -1.8974, 1e-3));
        assert!(close(result.dof, 5.882, 1e-2));
        assert!(close(result.p_value, 0.1075, 1e-3));
        assert_eq!(
            result.interpretation,
            "Fail to Reject Null: No significant difference in means."
        );
    }

    #[test]
    fn test_welch_insufficient_data() {
        let df = df![
            "Gender" => ["Male", "Male", "Female"],
            "TotalClaims" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let outcome = welch_t_test(&df, "Gender", "TotalClaims", "Male", "Female", DEFAULT_ALPHA)
            .unwrap();

        assert_eq!(outcome.interpretation(), "Insufficient Data");
        assert_eq!(outcome.p_value(), None);
    }

    #[test]
    fn test_welch_on_encoded_groups() {
        let df = df![
            "Gender" => [0u32, 0, 0, 1, 1, 1],
            "TotalClaims" => [1.0, 2.0, 3.0, 100.0, 101.0, 102.0],
        ]
        .unwrap();

        let outcome =
            welch_t_test(&df, "Gender", "TotalClaims", "0", "1", DEFAULT_ALPHA).unwrap();

        match outcome {
            TestOutcome::Completed(result) => {
                assert!(result.is_significant());
                assert_eq!(
                    result.interpretation,
                    "Reject Null Hypothesis: Means are significantly different."
                );
            }
            other => panic!("expected a completed test, got {:?}", other),
        }
    }

    #[test]
    fn test_welch_zero_variance_is_nan() {
        let result = welch_from_samples(&[1.0, 1.0], &[1.0, 1.0], DEFAULT_ALPHA);
        assert!(result.p_value.is_nan());
        assert_eq!(result.decision, Decision::FailToReject);
    }

    #[test]
    fn test_anova_matches_reference() {
        // scipy.stats.f_oneway([1,2,3], [4,5,6], [7,8,9]) -> F = 27.0, p = 0.001
        let result = anova_from_groups(
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]],
            DEFAULT_ALPHA,
        );
        assert!(close(result.statistic, 27.0, 1e-9));
        assert!(close(result.p_value, 0.001, 1e-4));
        assert_eq!(result.dof, 2.0);
        assert_eq!(result.dof_within, Some(6.0));
        assert_eq!(
            result.interpretation,
            "Reject Null Hypothesis: At least one group mean is different."
        );
    }

    #[test]
    fn test_anova_constant_groups() {
        // scipy f_oneway([1,1], [2,2]) -> F = inf, p = 0.0
        let df = df!["G" => ["a", "a", "b", "b"], "V" => [1.0, 1.0, 2.0, 2.0]].unwrap();
        match one_way_anova(&df, "G", "V", DEFAULT_ALPHA).unwrap() {
            TestOutcome::Completed(result) => {
                assert_eq!(result.statistic, f64::INFINITY);
                assert_eq!(result.p_value, 0.0);
                assert_eq!(result.decision, Decision::Reject);
            }
            other => panic!("expected a completed test, got {:?}", other),
        }

        // Every value identical: no variance anywhere
        let result = anova_from_groups(&[vec![3.0, 3.0], vec![3.0, 3.0]], DEFAULT_ALPHA);
        assert!(result.statistic.is_nan());
        assert!(result.p_value.is_nan());
        assert_eq!(result.decision, Decision::FailToReject);
    }

    #[test]
    fn test_anova_insufficient_groups() {
        let df = df![
            "Province" => [Some("Gauteng"), Some("Gauteng"), None],
            "TotalClaims" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let outcome = one_way_anova(&df, "Province", "TotalClaims", DEFAULT_ALPHA).unwrap();
        assert_eq!(outcome.interpretation(), "Insufficient Groups");
    }

    #[test]
    fn test_missing_column() {
        let df = df!["Province" => ["Gauteng"]].unwrap();
        let err = one_way_anova(&df, "Province", "TotalClaims", DEFAULT_ALPHA).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }
}
