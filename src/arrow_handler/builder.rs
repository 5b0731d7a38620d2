use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::sync::Arc;

use crate::dataset::{Column, Dataset};
use crate::utils::AnalysisError;

/// Build Arrow IPC bytes for a whole dataset
///
/// # Returns
/// * `Ok(Vec<u8>)` - Arrow IPC Stream format bytes, one record batch
/// * `Err(AnalysisError)` - If building fails
pub fn build_dataset_ipc(dataset: &Dataset) -> Result<Vec<u8>, AnalysisError> {
    let batch = dataset_to_batch(dataset)?;
    serialize_to_ipc(batch.schema(), batch)
}

/// Convert a dataset into a single record batch
///
/// Numeric columns become nullable `Float64`, boolean columns `Boolean` and
/// text columns `Utf8`. Column order is preserved.
pub fn dataset_to_batch(dataset: &Dataset) -> Result<RecordBatch, AnalysisError> {
    let mut fields = Vec::with_capacity(dataset.n_columns());
    let mut arrays = Vec::with_capacity(dataset.n_columns());

    for name in dataset.column_names() {
        let column = dataset.require(name)?;
        let (data_type, array) = column_to_array(column);
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(dataset.n_rows()));
    RecordBatch::try_new_with_options(schema, arrays, &options)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create RecordBatch: {}", e)))
}

fn column_to_array(column: &Column) -> (DataType, ArrayRef) {
    match column {
        Column::Numeric(values) => (
            DataType::Float64,
            Arc::new(Float64Array::from(values.clone())) as ArrayRef,
        ),
        Column::Boolean(values) => (
            DataType::Boolean,
            Arc::new(BooleanArray::from(values.clone())) as ArrayRef,
        ),
        Column::Text(values) => (
            DataType::Utf8,
            Arc::new(values.iter().map(|v| v.as_deref()).collect::<StringArray>()) as ArrayRef,
        ),
    }
}

/// Serialize RecordBatch to Arrow IPC Stream format
fn serialize_to_ipc(schema: Arc<Schema>, batch: RecordBatch) -> Result<Vec<u8>, AnalysisError> {
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, &schema).map_err(|e| {
            AnalysisError::ArrowError(format!("failed to create StreamWriter: {}", e))
        })?;
        writer
            .write(&batch)
            .map_err(|e| AnalysisError::ArrowError(format!("failed to write batch: {}", e)))?;
        writer
            .finish()
            .map_err(|e| AnalysisError::ArrowError(format!("failed to finish writer: {}", e)))?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrow_handler::parse_arrow_ipc;
    use arrow::ipc::reader::StreamReader;
    use std::io::Cursor;

    fn sample() -> Dataset {
        Dataset::from_columns(
            "sample",
            vec![
                ("x", Column::from_options(vec![Some(1.0), None, Some(3.0)])),
                ("x_outlier_z", Column::Boolean(vec![Some(false), None, Some(true)])),
                ("tag", Column::text(["a", "b", "c"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_dataset_ipc_schema() {
        let result = build_dataset_ipc(&sample()).unwrap();
        assert!(!result.is_empty());

        let reader = StreamReader::try_new(Cursor::new(result), None).unwrap();
        let schema = reader.schema();
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(schema.fields()[0].data_type(), &DataType::Float64);
        assert_eq!(schema.fields()[1].data_type(), &DataType::Boolean);
        assert_eq!(schema.fields()[2].data_type(), &DataType::Utf8);
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn test_build_then_parse_keeps_missing_values() {
        let ds = sample();
        let bytes = build_dataset_ipc(&ds).unwrap();
        let parsed = parse_arrow_ipc("sample", &bytes).unwrap();
        assert_eq!(parsed, ds);
    }

    #[test]
    fn test_build_dataset_ipc_without_columns() {
        let bytes = build_dataset_ipc(&Dataset::new("empty")).unwrap();
        let parsed = parse_arrow_ipc("empty", &bytes).unwrap();
        assert_eq!(parsed.n_columns(), 0);
    }
}
