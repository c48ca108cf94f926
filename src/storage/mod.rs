//! Tabular persistence of crawl results.
//!
//! Records are flattened into columns named by their `_`-joined key path
//! (`broker_name`, `askingPrice_amount`, ...). Sequences do not flatten and
//! are stored as JSON text.

pub mod columnar;

pub use columnar::{load, save};

use crate::models::FlatRecord;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Separator between key-path segments in column names
pub const KEY_SEPARATOR: &str = "_";

static NULL: Value = Value::Null;

/// Rows read back from (or about to be written to) a columnar file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in first-seen order
    pub columns: Vec<String>,
    /// One map per row; every column is present, `null` where empty
    pub rows: Vec<Map<String, Value>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flatten records into rows sharing one column set
    pub fn from_records(records: &[FlatRecord]) -> Self {
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        let mut flat_rows = Vec::with_capacity(records.len());

        for record in records {
            let mut row = Vec::new();
            flatten_into(None, record.fields(), &mut row);
            for (column, _) in &row {
                if seen.insert(column.clone()) {
                    columns.push(column.clone());
                }
            }
            flat_rows.push(row.into_iter().collect::<HashMap<_, _>>());
        }

        let rows = flat_rows
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|column| (column.clone(), row.remove(column).unwrap_or(Value::Null)))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> impl Iterator<Item = &Value> + '_ {
        let name = name.to_string();
        self.rows
            .iter()
            .map(move |row| row.get(&name).unwrap_or(&NULL))
    }
}

fn flatten_into(prefix: Option<&str>, fields: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in fields {
        let column = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, KEY_SEPARATOR, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if nested.is_empty() => out.push((column, Value::Null)),
            Value::Object(nested) => flatten_into(Some(&column), nested, out),
            other => out.push((column, other.clone())),
        }
    }
}
