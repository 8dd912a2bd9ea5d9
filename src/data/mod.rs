//! Dataset loading, saving, and inspection
//!
//! CSV files are parsed into Polars `DataFrame`s with schema inference.
//! Loading never panics: missing files and parse failures come back as
//! `PipelineError::Data` with the offending path in the message.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Column names probed, in order, when no target is named explicitly.
pub const TARGET_CANDIDATES: [&str; 5] = ["status", "target", "label", "class", "diagnosis"];

/// Load tabular data from disk
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file with a header row and inferred schema.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let file_path = path.as_ref();

        if !file_path.exists() {
            return Err(PipelineError::Data(format!(
                "File not found: {}",
                file_path.display()
            )));
        }

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .try_into_reader_with_file_path(Some(file_path.to_path_buf()))
            .map_err(|e| PipelineError::Data(format!("Failed to open {}: {}", file_path.display(), e)))?
            .finish()
            .map_err(|e| PipelineError::Data(format!("Failed to parse {}: {}", file_path.display(), e)))
    }
}

/// Write DataFrames back to disk
pub struct DataSaver;

impl DataSaver {
    /// Save a DataFrame as CSV with a header row.
    pub fn save_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
        let mut file = File::create(path.as_ref())?;

        CsvWriter::new(&mut file)
            .finish(df)
            .map_err(|e| PipelineError::Data(e.to_string()))
    }
}

/// Per-column diagnostics
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
    pub n_unique: usize,
}

/// Shape, dtype, missingness, and target-distribution diagnostics for a
/// loaded table. Rendering is the CLI's job.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<ColumnSummary>,
    /// Target column actually found, if any
    pub target_column: Option<String>,
    /// (class value, count) pairs in ascending class order
    pub class_counts: Vec<(i64, usize)>,
}

impl DatasetSummary {
    /// Summarize a DataFrame. The target column is `target_hint` when given,
    /// otherwise the first match from [`TARGET_CANDIDATES`].
    pub fn describe(df: &DataFrame, target_hint: Option<&str>) -> Result<Self> {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| {
                let n_unique = col.n_unique().unwrap_or(0);
                ColumnSummary {
                    name: col.name().to_string(),
                    dtype: col.dtype().to_string(),
                    null_count: col.null_count(),
                    n_unique,
                }
            })
            .collect();

        let target_column = match target_hint {
            Some(name) if df.column(name).is_ok() => Some(name.to_string()),
            Some(_) | None => TARGET_CANDIDATES
                .iter()
                .find(|name| df.column(name).is_ok())
                .map(|s| s.to_string()),
        };

        let class_counts = match &target_column {
            Some(name) => Self::count_classes(df, name)?,
            None => Vec::new(),
        };

        Ok(Self {
            n_rows: df.height(),
            n_cols: df.width(),
            columns,
            target_column,
            class_counts,
        })
    }

    fn count_classes(df: &DataFrame, target: &str) -> Result<Vec<(i64, usize)>> {
        let series = df
            .column(target)
            .map_err(|_| PipelineError::FeatureNotFound(target.to_string()))?;
        let as_i64 = series
            .cast(&DataType::Int64)
            .map_err(|e| PipelineError::Data(e.to_string()))?;

        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for value in as_i64
            .i64()
            .map_err(|e| PipelineError::Data(e.to_string()))?
            .into_iter()
            .flatten()
        {
            *counts.entry(value).or_insert(0) += 1;
        }

        Ok(counts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_df() -> DataFrame {
        df!(
            "name" => &["s1", "s2", "s3", "s4"],
            "jitter" => &[0.01, 0.02, 0.03, 0.04],
            "shimmer" => &[0.1, 0.2, 0.3, 0.4],
            "status" => &[0i64, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_load_csv() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "jitter,shimmer,status").unwrap();
        writeln!(file, "0.01,0.1,0").unwrap();
        writeln!(file, "0.02,0.2,1").unwrap();
        file.flush().unwrap();

        let df = DataLoader::load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let result = DataLoader::load_csv("/nonexistent/voices.csv");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("voices.csv"));
    }

    #[test]
    fn test_save_csv_round_trip() {
        let mut df = sample_df();
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        DataSaver::save_csv(&mut df, file.path()).unwrap();

        let reloaded = DataLoader::load_csv(file.path()).unwrap();
        assert_eq!(reloaded.height(), 4);
        assert_eq!(reloaded.width(), 4);
    }

    #[test]
    fn test_summary_probes_target() {
        let df = sample_df();
        let summary = DatasetSummary::describe(&df, None).unwrap();
        assert_eq!(summary.n_rows, 4);
        assert_eq!(summary.n_cols, 4);
        assert_eq!(summary.target_column.as_deref(), Some("status"));
        assert_eq!(summary.class_counts, vec![(0, 1), (1, 3)]);
    }

    #[test]
    fn test_summary_explicit_target() {
        let df = sample_df();
        let summary = DatasetSummary::describe(&df, Some("status")).unwrap();
        assert_eq!(summary.target_column.as_deref(), Some("status"));
        assert!(summary.columns.iter().all(|c| c.null_count == 0));
    }
}
