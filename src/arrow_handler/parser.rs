use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::ipc::reader::StreamReader;
use arrow::record_batch::RecordBatch;
use std::io::Cursor;

use crate::dataset::{Column, Dataset};
use crate::utils::AnalysisError;

/// Parse Arrow IPC Stream format data into a dataset
///
/// # Arguments
/// * `name` - Name for the resulting dataset
/// * `data` - Raw bytes in Arrow IPC Stream format
///
/// # Returns
/// * `Ok(Dataset)` - All batches concatenated; numeric types widened to f64,
///   booleans kept, everything else read as text
/// * `Err(AnalysisError)` - If the stream is empty or cannot be decoded
pub fn parse_arrow_ipc(name: impl Into<String>, data: &[u8]) -> Result<Dataset, AnalysisError> {
    if data.is_empty() {
        return Err(AnalysisError::ArrowError("empty input data".to_string()));
    }

    let cursor = Cursor::new(data);
    let reader = StreamReader::try_new(cursor, None)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to create StreamReader: {}", e)))?;
    let schema = reader.schema();

    let batches = reader
        .collect::<Result<Vec<RecordBatch>, _>>()
        .map_err(|e| AnalysisError::ArrowError(format!("failed to read batch: {}", e)))?;
    batches_to_dataset(name, &schema, &batches)
}

/// Concatenate record batches sharing `schema` into one dataset
pub fn batches_to_dataset(
    name: impl Into<String>,
    schema: &SchemaRef,
    batches: &[RecordBatch],
) -> Result<Dataset, AnalysisError> {
    let batch = concat_batches(schema, batches)
        .map_err(|e| AnalysisError::ArrowError(format!("failed to concatenate batches: {}", e)))?;

    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        columns.push((field.name().clone(), convert_column(field.name(), array)?));
    }
    Dataset::from_columns(name, columns)
}

/// Convert one Arrow array into a dataset column
fn convert_column(name: &str, array: &ArrayRef) -> Result<Column, AnalysisError> {
    let data_type = array.data_type();

    if data_type.is_numeric() {
        let widened = cast_array(name, array, &DataType::Float64)?;
        let values = downcast::<Float64Array>(name, &widened)?;
        return Ok(Column::from_options(values.iter()));
    }

    match data_type {
        DataType::Boolean => {
            let values = downcast::<BooleanArray>(name, array)?;
            return Ok(Column::Boolean(values.iter().collect()));
        }
        // no values at all, same as an all-missing CSV column
        DataType::Null => return Ok(Column::from_options(vec![None; array.len()])),
        _ => {}
    }

    let text = cast_array(name, array, &DataType::Utf8)?;
    let values = downcast::<StringArray>(name, &text)?;
    Ok(Column::Text(
        values.iter().map(|v| v.map(str::to_string)).collect(),
    ))
}

fn cast_array(name: &str, array: &ArrayRef, to: &DataType) -> Result<ArrayRef, AnalysisError> {
    cast(array, to).map_err(|e| {
        AnalysisError::ArrowError(format!(
            "column '{}' cannot be cast from {:?} to {:?}: {}",
            name,
            array.data_type(),
            to,
            e
        ))
    })
}

fn downcast<'a, T: 'static>(name: &str, array: &'a ArrayRef) -> Result<&'a T, AnalysisError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        AnalysisError::ArrowError(format!(
            "column '{}' has unexpected array type {:?}",
            name,
            array.data_type()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{Field, Schema};
    use arrow::ipc::writer::StreamWriter;
    use std::sync::Arc;

    fn write_batches(schema: Arc<Schema>, batches: &[RecordBatch]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, &schema).unwrap();
            for batch in batches {
                writer.write(batch).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer
    }

    fn sample_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("y", DataType::Float64, true),
            Field::new("y_outlier_iqr", DataType::Boolean, true),
            Field::new("label", DataType::Utf8, true),
        ]))
    }

    fn sample_batch(schema: &Arc<Schema>, ids: Vec<i64>) -> RecordBatch {
        let n = ids.len();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Float64Array::from(
                (0..n).map(|i| if i == 1 { None } else { Some(i as f64) }).collect::<Vec<_>>(),
            )),
            Arc::new(BooleanArray::from(
                (0..n).map(|i| Some(i == 0)).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                (0..n).map(|i| Some(format!("row{}", i))).collect::<Vec<_>>(),
            )),
        ];
        RecordBatch::try_new(schema.clone(), columns).unwrap()
    }

    #[test]
    fn test_parse_arrow_ipc_normal() {
        let schema = sample_schema();
        let data = write_batches(schema.clone(), &[sample_batch(&schema, vec![1, 2, 3])]);

        let ds = parse_arrow_ipc("sample", &data).unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column_names(), vec!["id", "y", "y_outlier_iqr", "label"]);
        assert_eq!(ds.numeric("id").unwrap(), &[Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(ds.numeric("y").unwrap(), &[Some(0.0), None, Some(2.0)]);
        assert_eq!(
            ds.column("y_outlier_iqr").unwrap().as_boolean().unwrap(),
            &[Some(true), Some(false), Some(false)]
        );
        assert_eq!(ds.column("label").unwrap().dtype(), "text");
    }

    #[test]
    fn test_parse_arrow_ipc_concatenates_batches() {
        let schema = sample_schema();
        let data = write_batches(
            schema.clone(),
            &[sample_batch(&schema, vec![1, 2]), sample_batch(&schema, vec![3, 4, 5])],
        );

        let ds = parse_arrow_ipc("sample", &data).unwrap();
        assert_eq!(ds.n_rows(), 5);
        assert_eq!(ds.numeric("id").unwrap()[4], Some(5.0));
    }

    #[test]
    fn test_parse_arrow_ipc_empty() {
        let result = parse_arrow_ipc("empty", &[]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty input"));
    }

    #[test]
    fn test_parse_arrow_ipc_garbage() {
        // continuation marker and an 8-byte length, then a truncated message
        let result = parse_arrow_ipc("bad", &[0xFF, 0xFF, 0xFF, 0xFF, 0x08, 0x00, 0x00, 0x00, 0x01]);
        assert!(matches!(result, Err(AnalysisError::ArrowError(_))));
    }
}
