use crate::error::StorageError;
use crate::extract::normalize::POSSIBLE_FIELDS;
use crate::models::FlatRecord;
use crate::storage::Table;
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Physical type chosen for a column from the values it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Int64,
    Float64,
    Utf8,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Boolean),
            Value::Number(number) if number.is_i64() => Some(Self::Int64),
            Value::Number(_) => Some(Self::Float64),
            _ => Some(Self::Utf8),
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Self::Float64,
            _ => Self::Utf8,
        }
    }

    /// All-null columns are written as text
    fn infer<'a>(values: impl Iterator<Item = &'a Value>) -> Self {
        values
            .filter_map(Self::of)
            .reduce(Self::merge)
            .unwrap_or(Self::Utf8)
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
        }
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn build_array(table: &Table, column: &str, kind: ColumnKind) -> ArrayRef {
    let values = table.column(column);
    match kind {
        ColumnKind::Boolean => Arc::new(BooleanArray::from(
            values.map(Value::as_bool).collect::<Vec<_>>(),
        )),
        ColumnKind::Int64 => Arc::new(Int64Array::from(
            values.map(Value::as_i64).collect::<Vec<_>>(),
        )),
        ColumnKind::Float64 => Arc::new(Float64Array::from(
            values.map(Value::as_f64).collect::<Vec<_>>(),
        )),
        ColumnKind::Utf8 => Arc::new(StringArray::from(values.map(text).collect::<Vec<_>>())),
    }
}

fn record_batch(table: &Table) -> Result<RecordBatch, StorageError> {
    let mut fields = Vec::with_capacity(table.columns.len());
    let mut arrays = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        let kind = ColumnKind::infer(table.column(column));
        fields.push(Field::new(column.as_str(), kind.data_type(), true));
        arrays.push(build_array(table, column, kind));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Columns of the file written for an empty crawl
fn empty_table() -> Table {
    let columns = POSSIBLE_FIELDS
        .iter()
        .chain(["latitude", "longitude"].iter())
        .map(|column| column.to_string())
        .collect();
    Table {
        columns,
        rows: Vec::new(),
    }
}

/// Flatten `records` and write them to a Parquet file at `path`
///
/// Parent directories are created as needed. Returns the number of rows
/// written. An empty record set still writes a file with zero rows, typed
/// as text, holding the always-present columns.
pub fn save(records: &[FlatRecord], path: &Path) -> Result<usize, StorageError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let table = if records.is_empty() {
        warn!("No records collected, writing an empty table to {}", path.display());
        empty_table()
    } else {
        Table::from_records(records)
    };
    let batch = record_batch(&table)?;

    let properties = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(properties))?;
    writer.write(&batch)?;
    writer.close()?;

    info!(
        "Data saved to {} ({} rows, {} columns)",
        path.display(),
        table.len(),
        table.columns.len()
    );
    Ok(table.len())
}

/// Read a file written by [`save`]; a missing file is an empty table
pub fn load(path: &Path) -> Result<Table, StorageError> {
    if !path.exists() {
        return Ok(Table::default());
    }

    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        for row in 0..batch.num_rows() {
            let mut fields = Map::new();
            for (index, name) in columns.iter().enumerate() {
                fields.insert(name.clone(), cell(batch.column(index), row, name)?);
            }
            rows.push(fields);
        }
    }

    Ok(Table { columns, rows })
}

fn cell(column: &ArrayRef, row: usize, name: &str) -> Result<Value, StorageError> {
    if column.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match column.data_type() {
        DataType::Boolean => Value::Bool(column.as_boolean().value(row)),
        DataType::Int64 => Value::from(column.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => Value::from(column.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(column.as_string::<i32>().value(row).to_string()),
        other => {
            return Err(StorageError::UnsupportedColumn {
                column: name.to_string(),
                data_type: other.to_string(),
            })
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_kinds_widen() {
        let values = [json!(1), Value::Null, json!(2.5)];
        assert_eq!(ColumnKind::infer(values.iter()), ColumnKind::Float64);

        let values = [json!(true), json!("yes")];
        assert_eq!(ColumnKind::infer(values.iter()), ColumnKind::Utf8);

        let values = [Value::Null, Value::Null];
        assert_eq!(ColumnKind::infer(values.iter()), ColumnKind::Utf8);

        let values = [json!(false), json!(true)];
        assert_eq!(ColumnKind::infer(values.iter()), ColumnKind::Boolean);
    }

    #[test]
    fn sequences_are_written_as_json_text() {
        assert_eq!(
            text(&json!([{"kind": "BALCONY"}])),
            Some(r#"[{"kind":"BALCONY"}]"#.to_string())
        );
        assert_eq!(text(&json!("Bostadsrätt")), Some("Bostadsrätt".to_string()));
        assert_eq!(text(&Value::Null), None);
    }
}
