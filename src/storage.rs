//! Path-level dataset I/O with the format picked from the file extension

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::arrow_handler::{build_dataset_ipc, parse_arrow_ipc, read_parquet, write_parquet};
use crate::dataset::Dataset;
use crate::utils::AnalysisError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
    Arrow,
    Parquet,
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataFormat::Csv => "csv",
            DataFormat::Json => "json",
            DataFormat::Arrow => "arrow",
            DataFormat::Parquet => "parquet",
        })
    }
}

/// Pick a format from the extension (case-insensitive)
pub fn detect_format(path: &Path) -> Result<DataFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => Ok(DataFormat::Csv),
        "json" => Ok(DataFormat::Json),
        "arrow" | "ipc" => Ok(DataFormat::Arrow),
        "parquet" | "pq" => Ok(DataFormat::Parquet),
        _ => Err(AnalysisError::invalid(format!(
            "unsupported file extension for '{}'",
            path.display()
        ))),
    }
}

/// Dataset name derived from the file stem
fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string()
}

pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let format = detect_format(path)?;
    let name = dataset_name(path);
    debug!(path = %path.display(), %format, "reading dataset");

    match format {
        DataFormat::Csv => Dataset::from_csv_reader(name, fs::File::open(path)?),
        DataFormat::Json => Dataset::from_json(name, &fs::read_to_string(path)?),
        DataFormat::Arrow => parse_arrow_ipc(name, &fs::read(path)?),
        DataFormat::Parquet => read_parquet(name, fs::File::open(path)?),
    }
}

/// Write a dataset, creating missing parent directories
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    let format = detect_format(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    debug!(path = %path.display(), %format, rows = dataset.n_rows(), "writing dataset");

    match format {
        DataFormat::Csv => dataset.write_csv(fs::File::create(path)?),
        DataFormat::Json => Ok(fs::write(path, dataset.to_json_string()?)?),
        DataFormat::Arrow => Ok(fs::write(path, build_dataset_ipc(dataset)?)?),
        DataFormat::Parquet => write_parquet(dataset, fs::File::create(path)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        Dataset::from_columns(
            "sample",
            vec![
                // sorted names, since JSON reads columns back in key order
                ("note", Column::text(["a", "b", "c"])),
                ("x", Column::from_options(vec![Some(1.5), None, Some(-2.0)])),
                ("x_outlier_iqr", Column::Boolean(vec![Some(true), Some(false), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("a/b.csv")).unwrap(), DataFormat::Csv);
        assert_eq!(detect_format(Path::new("b.JSON")).unwrap(), DataFormat::Json);
        assert_eq!(detect_format(Path::new("b.arrow")).unwrap(), DataFormat::Arrow);
        assert_eq!(detect_format(Path::new("b.ipc")).unwrap(), DataFormat::Arrow);
        assert_eq!(detect_format(Path::new("b.parquet")).unwrap(), DataFormat::Parquet);
        assert_eq!(detect_format(Path::new("b.PQ")).unwrap(), DataFormat::Parquet);
        assert!(matches!(
            detect_format(Path::new("b.xlsx")),
            Err(AnalysisError::InvalidArgument(_))
        ));
        assert!(detect_format(Path::new("noext")).is_err());
    }

    #[test]
    fn test_write_and_read_every_format() {
        let dir = tempdir().unwrap();
        let ds = sample();

        for file in [
            "nested/out.csv",
            "out.json",
            "deeper/still/out.arrow",
            "cols/out.parquet",
        ] {
            let path: PathBuf = dir.path().join(file);
            write_dataset(&ds, &path).unwrap();
            let back = read_dataset(&path).unwrap();
            assert_eq!(back, ds, "format of {}", file);
            assert_eq!(back.name, "out");
        }
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_dataset(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }
}
