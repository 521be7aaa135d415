//! Data loading utilities

use crate::error::{CongestionError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// On-disk tabular format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Parquet,
    Csv,
}

impl FileFormat {
    /// Guess from a path or URL suffix; anything not parquet is read as CSV
    pub fn detect(location: &str) -> Self {
        let lower = location.to_lowercase();
        let lower = lower.split(['?', '#']).next().unwrap_or_default();
        if lower.ends_with(".parquet") || lower.ends_with(".pq") {
            FileFormat::Parquet
        } else {
            FileFormat::Csv
        }
    }
}

/// Data loader for parquet and CSV sources
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for CSV schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    fn open(path: &Path) -> Result<File> {
        File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CongestionError::ArtifactNotFound(path.display().to_string())
            } else {
                CongestionError::IoError(e)
            }
        })
    }

    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| CongestionError::DataError(e.to_string()))
    }

    pub fn load_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| CongestionError::DataError(e.to_string()))
    }

    /// Load by file extension
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let df = match FileFormat::detect(&path.to_string_lossy()) {
            FileFormat::Parquet => self.load_parquet(path)?,
            FileFormat::Csv => self.load_csv(path)?,
        };
        debug!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded data"
        );
        Ok(df)
    }

    /// Parse an in-memory file, e.g. a downloaded body
    pub fn load_bytes(&self, bytes: Vec<u8>, format: FileFormat) -> Result<DataFrame> {
        let cursor = Cursor::new(bytes);
        let df = match format {
            FileFormat::Parquet => ParquetReader::new(cursor).finish(),
            FileFormat::Csv => CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(self.infer_schema_length))
                .into_reader_with_file_handle(cursor)
                .finish(),
        };
        df.map_err(|e| CongestionError::DataError(e.to_string()))
    }
}

/// Gzip-compressed parquet writer
pub struct DataSaver;

impl DataSaver {
    pub fn save_parquet(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Gzip(None))
            .finish(df)
            .map_err(|e| CongestionError::DataError(e.to_string()))?;
        debug!(path = %path.display(), rows = df.height(), "Saved parquet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(FileFormat::detect("data/train.parquet"), FileFormat::Parquet);
        assert_eq!(FileFormat::detect("https://host/x/train.parquet?raw=1"), FileFormat::Parquet);
        assert_eq!(FileFormat::detect("train.CSV"), FileFormat::Csv);
    }

    #[test]
    fn test_parquet_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("data.parquet");
        let mut df = df!(
            "x" => &[1i64, 2, 3],
            "direction" => &["N", "S", "EB"]
        )
        .unwrap();
        DataSaver::save_parquet(&mut df, &path).unwrap();
        let loaded = DataLoader::new().load_auto(&path).unwrap();
        assert!(loaded.equals(&df));
    }

    #[test]
    fn test_csv_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "x,y,direction\n1,2,N\n0,3,SW\n").unwrap();
        let df = DataLoader::new().load_auto(&path).unwrap();
        assert_eq!(df.shape(), (2, 3));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            DataLoader::new().load_parquet("/nonexistent/file.parquet"),
            Err(CongestionError::ArtifactNotFound(_))
        ));
    }
}
