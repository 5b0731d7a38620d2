use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeSet, HashSet};
use std::io::{Read, Write};
use std::sync::Arc;

use crate::utils::{
    format_bool, format_float, is_missing, normalize_float, parse_bool, parse_number,
    AnalysisError,
};
use crate::Result;

/// A single column of values, each position either present or missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl Column {
    /// Build a numeric column from plain floats; `NaN` becomes missing
    pub fn numeric<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Column::Numeric(values.into_iter().map(normalize_float).collect())
    }

    /// Build a numeric column from optional floats; `Some(NaN)` becomes missing
    pub fn from_options<I: IntoIterator<Item = Option<f64>>>(values: I) -> Self {
        Column::Numeric(values.into_iter().map(|v| v.and_then(normalize_float)).collect())
    }

    /// Build a boolean column without missing values
    pub fn boolean<I: IntoIterator<Item = bool>>(values: I) -> Self {
        Column::Boolean(values.into_iter().map(Some).collect())
    }

    /// Build a text column without missing values
    pub fn text<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Column::Text(values.into_iter().map(|s| Some(s.into())).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Boolean(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short type tag, used in logs and error messages
    pub fn dtype(&self) -> &'static str {
        match self {
            Column::Numeric(_) => "numeric",
            Column::Boolean(_) => "boolean",
            Column::Text(_) => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<&[Option<bool>]> {
        match self {
            Column::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the value at `row` is missing, `None` past the last row
    pub fn is_null(&self, row: usize) -> Option<bool> {
        match self {
            Column::Numeric(v) => v.get(row).map(Option::is_none),
            Column::Boolean(v) => v.get(row).map(Option::is_none),
            Column::Text(v) => v.get(row).map(Option::is_none),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_null(row) == Some(true)).count()
    }

    /// Keep the rows whose `keep` entry is true
    fn take(&self, keep: &[bool]) -> Column {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter(|&(_, &k)| k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        match self {
            Column::Numeric(v) => Column::Numeric(pick(v, keep)),
            Column::Boolean(v) => Column::Boolean(pick(v, keep)),
            Column::Text(v) => Column::Text(pick(v, keep)),
        }
    }

    /// Render one cell for CSV output; missing renders as an empty cell
    fn cell(&self, row: usize) -> String {
        match self {
            Column::Numeric(v) => v[row].map(format_float).unwrap_or_default(),
            Column::Boolean(v) => v[row].map(|b| format_bool(b).to_string()).unwrap_or_default(),
            Column::Text(v) => v[row].clone().unwrap_or_default(),
        }
    }

    fn json_value(&self, row: usize) -> Value {
        match self {
            Column::Numeric(v) => v[row]
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Column::Boolean(v) => v[row].map(Value::Bool).unwrap_or(Value::Null),
            Column::Text(v) => v[row].clone().map(Value::String).unwrap_or(Value::Null),
        }
    }

    /// Infer a column type from raw text cells
    ///
    /// Numeric if every present cell parses as a float, boolean if every
    /// present cell is `true`/`false`, text otherwise. An all-missing column
    /// is numeric.
    pub fn infer_from_cells(cells: &[String]) -> Column {
        let present = || cells.iter().filter(|c| !is_missing(c));

        if present().all(|c| parse_number(c).is_some()) {
            return Column::Numeric(
                cells
                    .iter()
                    .map(|c| if is_missing(c) { None } else { parse_number(c) })
                    .collect(),
            );
        }

        if present().all(|c| parse_bool(c).is_some()) {
            return Column::Boolean(
                cells
                    .iter()
                    .map(|c| if is_missing(c) { None } else { parse_bool(c) })
                    .collect(),
            );
        }

        Column::Text(
            cells
                .iter()
                .map(|c| if is_missing(c) { None } else { Some(c.clone()) })
                .collect(),
        )
    }

    fn infer_from_json(values: &[Value]) -> Column {
        let present = || values.iter().filter(|v| !v.is_null());

        if present().all(Value::is_number) {
            return Column::from_options(values.iter().map(Value::as_f64));
        }

        if present().all(Value::is_boolean) {
            return Column::Boolean(values.iter().map(Value::as_bool).collect());
        }

        Column::Text(
            values
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
struct NamedColumn {
    name: String,
    data: Arc<Column>,
}

/// An ordered collection of equally long, named columns
///
/// Cloning is cheap: column storage is shared until a column is rewritten.
/// Every transformation in this crate takes `&Dataset` and returns a new one.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    columns: Vec<NamedColumn>,
}

impl Dataset {
    /// Create a new empty dataset
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Build a dataset from `(name, column)` pairs
    pub fn from_columns<S: Into<String>>(
        name: impl Into<String>,
        columns: Vec<(S, Column)>,
    ) -> Result<Self> {
        let mut dataset = Dataset::new(name);
        let mut seen = HashSet::new();
        for (column_name, column) in columns {
            let column_name: String = column_name.into();
            if !seen.insert(column_name.clone()) {
                return Err(AnalysisError::ValidationError(format!(
                    "duplicate column name '{}'",
                    column_name
                )));
            }
            dataset.set_column(column_name, column)?;
        }
        Ok(dataset)
    }

    /// Builder-style variant of [`Dataset::set_column`]
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.set_column(name, column)?;
        Ok(self)
    }

    /// Insert or replace a column on this (owned) dataset value
    ///
    /// A replaced column keeps its position; a new one is appended.
    pub fn set_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(AnalysisError::ValidationError(format!(
                "column '{}' has {} rows, dataset has {}",
                name,
                column.len(),
                self.n_rows()
            )));
        }

        let data = Arc::new(column);
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.data = data,
            None => self.columns.push(NamedColumn { name, data }),
        }
        Ok(())
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of numeric columns in order
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.data.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.data.as_ref())
    }

    /// Get a column or fail with `ColumnNotFound`
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| AnalysisError::not_found(name))
    }

    /// Check that every name refers to an existing column
    pub fn require_all<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            self.require(name.as_ref())?;
        }
        Ok(())
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.column(name).map(Column::is_numeric).unwrap_or(false)
    }

    /// Get the values of a numeric column
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        let column = self.require(name)?;
        column.as_numeric().ok_or_else(|| {
            AnalysisError::invalid(format!(
                "column '{}' is {}, expected numeric",
                name,
                column.dtype()
            ))
        })
    }

    /// New dataset containing only rows whose `keep` entry is true
    pub fn filter_rows(&self, keep: &[bool]) -> Result<Dataset> {
        if keep.len() != self.n_rows() {
            return Err(AnalysisError::ValidationError(format!(
                "row mask has {} entries, dataset has {} rows",
                keep.len(),
                self.n_rows()
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| NamedColumn {
                name: c.name.clone(),
                data: Arc::new(c.data.take(keep)),
            })
            .collect();

        Ok(Dataset {
            name: self.name.clone(),
            columns,
        })
    }

    /// New dataset without the named columns (absent names are ignored)
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.iter().any(|n| n.as_ref() == c.name))
            .cloned()
            .collect();

        Dataset {
            name: self.name.clone(),
            columns,
        }
    }

    /// Load dataset from CSV text
    pub fn from_csv(name: impl Into<String>, csv_data: &str) -> Result<Self> {
        Self::from_csv_reader(name, csv_data.as_bytes())
    }

    /// Load dataset from any CSV reader with a header row
    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

        for result in reader.records() {
            let record = result?;
            for (i, field) in record.iter().enumerate() {
                cells[i].push(field.to_string());
            }
        }

        let columns = headers
            .iter()
            .zip(cells)
            .map(|(header, raw)| (header.to_string(), Column::infer_from_cells(&raw)))
            .collect();

        Self::from_columns(name, columns)
    }

    /// Write dataset as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;

        for row in 0..self.n_rows() {
            writer.write_record(self.columns.iter().map(|c| c.data.cell(row)))?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| AnalysisError::ValidationError(format!("non-UTF-8 CSV output: {}", e)))
    }

    /// Load dataset from a JSON array of objects
    ///
    /// Columns are the union of all keys in sorted order; a key absent from
    /// an object is a missing value for that row.
    pub fn from_json(name: impl Into<String>, json_data: &str) -> Result<Self> {
        let records: Vec<Map<String, Value>> = serde_json::from_str(json_data)?;

        let keys: BTreeSet<&String> = records.iter().flat_map(|r| r.keys()).collect();
        let columns = keys
            .into_iter()
            .map(|key| {
                let values: Vec<Value> = records
                    .iter()
                    .map(|r| r.get(key).cloned().unwrap_or(Value::Null))
                    .collect();
                (key.clone(), Column::infer_from_json(&values))
            })
            .collect();

        Self::from_columns(name, columns)
    }

    /// Serialize dataset as a JSON array of objects; missing values are `null`
    pub fn to_json_string(&self) -> Result<String> {
        let records: Vec<Map<String, Value>> = (0..self.n_rows())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.data.json_value(row)))
                    .collect()
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.data == b.data)
    }
}
