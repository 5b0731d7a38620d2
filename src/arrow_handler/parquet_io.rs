use std::fs::File;
use std::io::Write;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use tracing::debug;

use super::builder::dataset_to_batch;
use super::parser::batches_to_dataset;
use crate::dataset::Dataset;
use crate::utils::AnalysisError;

/// Read a Parquet file into a dataset
///
/// Row groups are concatenated and columns converted the same way as an
/// Arrow IPC stream.
pub fn read_parquet(name: impl Into<String>, file: File) -> Result<Dataset, AnalysisError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to open parquet file: {}", e)))?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create parquet reader: {}", e)))?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AnalysisError::ArrowError(format!("failed to read parquet batch: {}", e)))?;
    debug!(batches = batches.len(), "parquet batches read");
    batches_to_dataset(name, &schema, &batches)
}

/// Write a dataset as a single-row-group Parquet file
pub fn write_parquet<W: Write + Send>(dataset: &Dataset, writer: W) -> Result<(), AnalysisError> {
    let batch = dataset_to_batch(dataset)?;
    let mut writer = ArrowWriter::try_new(writer, batch.schema(), None)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create parquet writer: {}", e)))?;
    writer
        .write(&batch)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to write parquet batch: {}", e)))?;
    writer
        .close()
        .map_err(|e| AnalysisError::ArrowError(format!("failed to finish parquet file: {}", e)))?;
    Ok(())
}
