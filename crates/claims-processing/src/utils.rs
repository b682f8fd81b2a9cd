//! Shared column helpers.
//!
//! Dtype classification plus extraction and null filling routines used by the
//! feature builder, the statistics module and the dashboard.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Dtype Classification
// =============================================================================

/// Broad grouping of polars dtypes used to pick an imputation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or float column.
    Numeric,
    /// String or categorical column.
    Categorical,
    /// Boolean column.
    Boolean,
    /// Anything else (dates, nested types).
    Other,
}

/// Check if a dtype is an integer or float type.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a dtype is a float type.
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a dtype holds text labels.
pub fn is_string_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String | DataType::Categorical(_, _) | DataType::Enum(_, _)
    )
}

/// Classify a dtype.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_string_dtype(dtype) {
        DtypeCategory::Categorical
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Extract a column as `f64` values, keeping nulls.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Extract the non-null, finite `f64` values of a column.
pub fn finite_values(series: &Series) -> PolarsResult<Vec<f64>> {
    Ok(numeric_values(series)?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect())
}

/// Extract a column as owned strings, keeping nulls.
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Parse text the way a lenient numeric coercion does: trimmed, unparseable is null.
pub fn coerce_numeric(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        return numeric_values(series);
    }
    Ok(string_values(series)?
        .into_iter()
        .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
        .collect())
}

// =============================================================================
// Aggregates
// =============================================================================

/// Median of a slice, ignoring NaN. Returns `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent non-null value; ties resolve to the smallest value.
pub fn string_mode(series: &Series) -> Option<String> {
    let values = string_values(series).ok()?;

    let mut value_counts: HashMap<String, usize> = HashMap::new();
    for val in values.into_iter().flatten() {
        *value_counts.entry(val).or_insert(0) += 1;
    }

    value_counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val)
}

// =============================================================================
// Null Filling
// =============================================================================

/// Fill nulls in a numeric column, producing a `Float64` series.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = numeric_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill nulls in a text column, producing a `String` series.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<String> = string_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Replace NaN and infinite floats with nulls.
pub fn nullify_non_finite(series: &Series) -> PolarsResult<Series> {
    let cleaned: Vec<Option<f64>> = numeric_values(series)?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(Series::new(series.name().clone(), cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::Categorical);
        assert_eq!(get_dtype_category(&DataType::Boolean), DtypeCategory::Boolean);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Other);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_string_mode_tie_breaks_on_smallest() {
        let s = Series::new("g".into(), &[Some("b"), Some("a"), None, Some("b"), Some("a")]);
        assert_eq!(string_mode(&s), Some("a".to_string()));

        let s = Series::new("g".into(), &[Some("z"), Some("z"), Some("a")]);
        assert_eq!(string_mode(&s), Some("z".to_string()));

        let s = Series::new("g".into(), &[None::<&str>, None]);
        assert_eq!(string_mode(&s), None);
    }

    #[test]
    fn test_coerce_numeric_from_text() {
        let s = Series::new("year".into(), &[Some("2010"), Some(" 2015 "), Some("n/a"), None]);
        let values = coerce_numeric(&s).unwrap();
        assert_eq!(values, vec![Some(2010.0), Some(2015.0), None, None]);
    }

    #[test]
    fn test_fill_string_nulls() {
        let s = Series::new("g".into(), &[Some("F"), None]);
        let filled = fill_string_nulls(&s, "Unknown").unwrap();
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.str().unwrap().get(1), Some("Unknown"));
    }

    #[test]
    fn test_nullify_non_finite() {
        let s = Series::new("r".into(), &[1.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN]);
        let cleaned = nullify_non_finite(&s).unwrap();
        assert_eq!(cleaned.null_count(), 3);
        assert_eq!(cleaned.f64().unwrap().get(0), Some(1.0));
    }
}
