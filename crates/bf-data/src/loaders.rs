use std::fs;
use std::path::Path;

use arrow::compute::concat_batches;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use bf_types::{BfResult, DataError};

use crate::dataset::{arrow_error, TabularDataset};

/// Loads tabular files into [`TabularDataset`]s
#[derive(Debug)]
pub struct TableLoader {
    batch_size: usize,
}

impl TableLoader {
    pub fn new() -> Self {
        Self {
            batch_size: 8192, // Parquet rows decoded per batch
        }
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Load a Parquet file, concatenating all of its record batches
    pub fn load_parquet<P: AsRef<Path>>(&self, file_path: P, label: &str) -> BfResult<TabularDataset> {
        let path = file_path.as_ref();
        tracing::info!("Loading Parquet table from: {}", path.display());

        let file = fs::File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            DataError::LoadingFailed {
                message: format!("Failed to create Parquet reader for {}: {}", path.display(), e),
            }
        })?;
        let schema = builder.schema().clone();
        let reader = builder
            .with_batch_size(self.batch_size)
            .build()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to build Parquet reader: {}", e),
            })?;

        let mut batches = Vec::new();
        for batch_result in reader {
            let batch = batch_result.map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read Parquet batch: {}", e),
            })?;
            batches.push(batch);
        }

        let batch = concat_batches(&schema, &batches).map_err(arrow_error)?;
        let dataset = TabularDataset::new(batch, label)?;

        tracing::info!(
            "Loaded {} rows from Parquet file: {}",
            dataset.num_rows(),
            path.display()
        );
        Ok(dataset)
    }

    /// Load a headed CSV file where every cell is numeric; empty cells are missing values
    pub fn load_csv<P: AsRef<Path>>(&self, file_path: P, label: &str) -> BfResult<TabularDataset> {
        use csv::ReaderBuilder;

        let path = file_path.as_ref();
        tracing::info!("Loading CSV table from: {}", path.display());

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open CSV file {}: {}", path.display(), e),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV headers: {}", e),
            })?
            .clone();
        tracing::debug!("CSV headers: {:?}", headers);

        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

        for (line_num, result) in rdr.records().enumerate() {
            // header occupies line 1
            let line = line_num + 2;
            let record = result.map_err(|e| DataError::ParseError {
                line,
                message: e.to_string(),
            })?;

            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                let cell = cell.trim();
                let value = if cell.is_empty() {
                    f64::NAN
                } else {
                    cell.parse::<f64>().map_err(|e| DataError::ParseError {
                        line,
                        message: format!("'{}': {}", cell, e),
                    })?
                };
                column.push(value);
            }
        }

        let named = headers
            .iter()
            .map(str::to_string)
            .zip(columns)
            .collect::<Vec<_>>();
        let dataset = TabularDataset::from_columns(label, named)?;

        tracing::info!(
            "Loaded {} rows from CSV file: {}",
            dataset.num_rows(),
            path.display()
        );
        Ok(dataset)
    }
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a CSV table with the default loader settings.
pub fn load_csv<P: AsRef<Path>>(path: P, label: &str) -> BfResult<TabularDataset> {
    TableLoader::new().load_csv(path, label)
}

/// Load a Parquet table with the default loader settings.
pub fn load_parquet<P: AsRef<Path>>(path: P, label: &str) -> BfResult<TabularDataset> {
    TableLoader::new().load_parquet(path, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_types::BfError;
    use parquet::arrow::ArrowWriter;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn csv_round_trip_into_dataset() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "f0,f1,label").unwrap();
        writeln!(file, "0.5,1,0").unwrap();
        writeln!(file, "1.5,,1").unwrap();
        writeln!(file, "2.5,3,1").unwrap();
        file.flush().unwrap();

        let ds = load_csv(file.path(), "label").unwrap();
        assert_eq!(ds.num_rows(), 3);
        assert_eq!(ds.feature_names(), vec!["f0", "f1"]);
        assert_eq!(ds.labels().unwrap(), vec![0.0, 1.0, 1.0]);

        let matrix = ds.feature_matrix().unwrap();
        assert_eq!(matrix.row(0), &[0.5, 1.0]);
        assert!(matrix.row(1)[1].is_nan());
    }

    #[test]
    fn csv_reports_bad_cell_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "f0,label").unwrap();
        writeln!(file, "1,0").unwrap();
        writeln!(file, "abc,1").unwrap();
        file.flush().unwrap();

        match load_csv(file.path(), "label") {
            Err(BfError::Data(DataError::ParseError { line, .. })) => assert_eq!(line, 3),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn parquet_batches_are_concatenated() {
        let source = crate::synthetic::make_classification(40, 3, 11).unwrap();
        let file = NamedTempFile::new().unwrap();

        let mut writer =
            ArrowWriter::try_new(file.reopen().unwrap(), source.batch().schema(), None).unwrap();
        writer.write(&source.batch().slice(0, 25)).unwrap();
        writer.write(&source.batch().slice(25, 15)).unwrap();
        writer.close().unwrap();

        let loaded = TableLoader::with_batch_size(10)
            .load_parquet(file.path(), "label")
            .unwrap();
        assert_eq!(loaded.num_rows(), 40);
        assert_eq!(loaded.feature_names(), source.feature_names());
        assert_eq!(loaded.labels().unwrap(), source.labels().unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_parquet("/definitely/not/here.parquet", "label");
        assert!(matches!(result, Err(BfError::Io(_))));
    }
}
