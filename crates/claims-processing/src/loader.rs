//! Raw data loading.
//!
//! The claims dataset ships as a pipe-delimited text file with a header row.
//! Several columns mix numbers and text deep into the file, so schema
//! inference scans every row unless configured otherwise. The usual textual
//! missing-value markers (`NA`, `NaN`, `null`, ...) are read as nulls.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::ProcessingConfig;
use crate::error::{ProcessingError, Result, ResultExt};

/// Field values read as missing in every column.
pub const MISSING_VALUE_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load a delimited file into a `DataFrame`.
///
/// Fails with [`ProcessingError::FileNotFound`] when `path` does not exist.
/// If the strict read fails, a second attempt ignores parse errors; when that
/// also fails the first error is returned.
pub fn load_data(path: impl AsRef<Path>, separator: u8) -> Result<DataFrame> {
    read_delimited(path.as_ref(), separator, None)
}

/// Load using the path-independent settings of a [`ProcessingConfig`].
pub fn load_data_with(path: impl AsRef<Path>, config: &ProcessingConfig) -> Result<DataFrame> {
    read_delimited(
        path.as_ref(),
        config.separator_byte(),
        config.infer_schema_length,
    )
}

fn read_delimited(
    path: &Path,
    separator: u8,
    infer_schema_length: Option<usize>,
) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ProcessingError::FileNotFound(path.display().to_string()));
    }

    info!("Loading data from {}", path.display());

    let strict = read_with(path, separator, infer_schema_length, false);
    let df = match strict {
        Ok(df) => df,
        Err(strict_err) => {
            debug!("Strict load failed: {}", strict_err);
            warn!("Retrying load of {} with parse errors ignored", path.display());
            match read_with(path, separator, infer_schema_length, true) {
                Ok(df) => df,
                Err(lenient_err) => {
                    debug!("Lenient load failed: {}", lenient_err);
                    return Err(strict_err)
                        .context(format!("Failed to load {}", path.display()));
                }
            }
        }
    };

    info!("Data loaded successfully. Shape: ({}, {})", df.height(), df.width());
    Ok(df)
}

fn read_with(
    path: &Path,
    separator: u8,
    infer_schema_length: Option<usize>,
    ignore_errors: bool,
) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_schema_length)
        .with_ignore_errors(ignore_errors)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(missing_values())),
        )
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
}

fn missing_values() -> NullValues {
    NullValues::AllColumns(
        MISSING_VALUE_TOKENS
            .iter()
            .map(|token| PlSmallStr::from_static(token))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_missing_file() {
        let err = load_data("/definitely/not/here.txt", b'|').unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_pipe_delimited() {
        let file = write_temp("PolicyID|Gender|TotalClaims\n1|Male|0.0\n2||120.5\n");
        let df = load_data(file.path(), b'|').unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("Gender").unwrap().null_count(), 1);
    }

    #[test]
    fn test_full_schema_inference() {
        // Text appears only in the last row; a short inference window would
        // type the column as integer.
        let mut contents = String::from("Code|Value\n");
        for i in 0..150 {
            contents.push_str(&format!("{}|{}\n", i, i));
        }
        contents.push_str("A12|1\n");
        let file = write_temp(&contents);

        let df = load_data(file.path(), b'|').unwrap();
        assert_eq!(df.height(), 151);
        assert_eq!(df.column("Code").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_missing_value_tokens_are_null() {
        let file = write_temp(
            "PolicyID|SumInsured|Gender|TotalClaims\n\
             1|100.0|Male|0.0\n\
             2|NaN|NA|20.0\n\
             3|NA|null|5.0\n\
             4|250.5|N/A|0.0\n",
        );
        let df = load_data(file.path(), b'|').unwrap();

        let insured = df.column("SumInsured").unwrap();
        assert_eq!(insured.dtype(), &DataType::Float64);
        assert_eq!(insured.null_count(), 2);
        assert_eq!(df.column("Gender").unwrap().null_count(), 3);
        assert_eq!(df.column("TotalClaims").unwrap().null_count(), 0);
    }

    #[test]
    fn test_malformed_row_retried_leniently() {
        // The last row cannot be parsed as a float; only the lenient read accepts it
        let file = write_temp("PolicyID|TotalPremium\n1|10.5\n2|12.0\n3|12.5.7\n");
        let config = ProcessingConfig::builder()
            .infer_schema_length(Some(2))
            .build()
            .unwrap();

        let df = load_data_with(file.path(), &config).unwrap();
        assert_eq!(df.height(), 3);

        let premium = df.column("TotalPremium").unwrap();
        assert_eq!(premium.dtype(), &DataType::Float64);
        assert_eq!(premium.null_count(), 1);
    }

    #[test]
    fn test_unreadable_file_keeps_strict_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_data(dir.path(), b'|').unwrap_err();
        assert_eq!(err.error_code(), "POLARS_ERROR");
        assert!(err.to_string().contains("Failed to load"));
    }

    #[test]
    fn test_load_with_config_separator() {
        let file = write_temp("a,b\n1,2\n");
        let config = ProcessingConfig::builder().separator(',').build().unwrap();
        let df = load_data_with(file.path(), &config).unwrap();
        assert_eq!(df.shape(), (1, 2));
    }
}
