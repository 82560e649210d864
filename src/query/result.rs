//! Result materialization
//!
//! Turns a [`TabularResponse`] into [`Row`]s and reduces the responses of
//! `COUNT` / `SUM` statements to a single value.

use crate::client::TabularResponse;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::sync::Arc;

/// One record of a result: column name to cell value
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Rows of one response share their column list
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Cell for a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|index| self.values.get(index))
    }

    pub fn time(&self) -> Option<&Value> {
        self.get("time")
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(column, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(&self.values)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// One [`Row`] per response row, in order
pub fn materialize(response: &TabularResponse) -> Vec<Row> {
    let columns: Arc<[String]> = response.columns.clone().into();
    response
        .rows
        .iter()
        .map(|values| Row::new(columns.clone(), values.clone()))
        .collect()
}

/// Cells of the first row, without the leading `time` column
fn first_row_values(response: &TabularResponse) -> Option<&[Value]> {
    let row = response.rows.first()?;
    if response.has_time_column() && !row.is_empty() {
        Some(&row[1..])
    } else {
        Some(row)
    }
}

/// Reduce a `COUNT` response to one number.
///
/// `COUNT(*)` yields one count column per field; the largest one is the
/// number of points. Null cells are ignored; no numeric cell means zero.
pub fn count_from_response(response: &TabularResponse) -> u64 {
    let Some(values) = first_row_values(response) else {
        return 0;
    };

    values
        .iter()
        .filter_map(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
        .max()
        .unwrap_or(0)
}

/// Reduce a `SUM` response to its first value, or `0` when there are no rows
pub fn sum_from_response(response: &TabularResponse) -> Value {
    first_row_values(response)
        .and_then(|values| values.first().cloned())
        .unwrap_or_else(|| Value::from(0))
}
