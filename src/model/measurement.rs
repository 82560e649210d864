//! Model instances
//!
//! A [`Measurement`] is one record of a [`Schema`]: a typed value slot per
//! declared field. Values are validated and cast on the way in, so a built
//! instance always renders to a valid point.

use crate::model::{FieldKind, FieldValue, FieldValueError, Point, Schema, ToPoint};
use crate::query::Row;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One record of a measurement
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    schema: Arc<Schema>,
    values: Vec<Option<FieldValue>>,
}

impl Measurement {
    /// Build an instance from `(field, value)` pairs.
    ///
    /// Fields that are missing get their default, or the current time for
    /// `auto_now` timestamps. A non-nullable field without a default must be
    /// present.
    pub fn new<K: AsRef<str>>(
        schema: Arc<Schema>,
        values: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Self, FieldValueError> {
        let given: Vec<(K, Value)> = values.into_iter().collect();

        for def in schema.fields() {
            if def.is_required() && !given.iter().any(|(k, _)| k.as_ref() == def.name) {
                return Err(FieldValueError::Required(def.name.clone()));
            }
        }

        let mut instance = Self::blank(schema)?;
        for (key, value) in given {
            instance.set(key.as_ref(), value)?;
        }
        Ok(instance)
    }

    /// Defaults and auto timestamps only
    fn blank(schema: Arc<Schema>) -> Result<Self, FieldValueError> {
        let now = Utc::now().timestamp_nanos_opt();
        let mut values = Vec::with_capacity(schema.fields().len());

        for def in schema.fields() {
            let value = match (def.kind, &def.default) {
                (_, Some(default)) if !default.is_null() => def.coerce(default)?,
                (FieldKind::Timestamp { auto_now: true, .. }, _) => now.map(FieldValue::Timestamp),
                _ => None,
            };
            values.push(value);
        }

        Ok(Self { schema, values })
    }

    /// Rebuild an instance from a fetched row.
    ///
    /// Columns the schema doesn't declare are ignored, as are null cells. A
    /// timestamp field missing from the row is read from the `time` column.
    pub fn from_row(schema: Arc<Schema>, row: &Row) -> Result<Self, FieldValueError> {
        let mut values = vec![None; schema.fields().len()];

        for (index, def) in schema.fields().iter().enumerate() {
            let cell = row
                .get(&def.name)
                .or_else(|| if def.is_timestamp() { row.time() } else { None });

            if let Some(cell) = cell.filter(|c| !c.is_null()) {
                values[index] = def.coerce(cell)?;
            }
        }

        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn measurement(&self) -> &str {
        self.schema.measurement()
    }

    /// Current value of a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .position(name)
            .and_then(|index| self.values[index].as_ref())
    }

    /// Validate, cast and store a value
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), FieldValueError> {
        let index = self
            .schema
            .position(name)
            .ok_or_else(|| FieldValueError::UnknownField {
                measurement: self.schema.measurement().to_string(),
                field: name.to_string(),
            })?;

        self.values[index] = self.schema.fields()[index].coerce(&value)?;
        Ok(())
    }

    /// Field name to value, timestamps in their field's precision
    pub fn to_json(&self) -> Map<String, Value> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(def, value)| {
                let json = match (def.kind, value) {
                    (FieldKind::Timestamp { precision, .. }, Some(FieldValue::Timestamp(ns))) => {
                        Value::from(precision.from_nanos(*ns))
                    }
                    (_, Some(v)) => v.to_json(),
                    (_, None) => Value::Null,
                };
                (def.name.clone(), json)
            })
            .collect()
    }
}

impl ToPoint for Measurement {
    fn to_point(&self) -> Result<Point, FieldValueError> {
        let mut point = Point::new(self.schema.measurement());

        for (def, value) in self.schema.fields().iter().zip(&self.values) {
            let Some(value) = value else { continue };

            match (def.kind, value) {
                (FieldKind::Tag, v) => point.tags.push((def.name.clone(), v.as_text())),
                (FieldKind::Timestamp { .. }, FieldValue::Timestamp(ns)) if point.timestamp.is_none() => {
                    point.timestamp = Some(*ns);
                }
                (_, v) => point.fields.push((def.name.clone(), v.clone())),
            }
        }

        Ok(point)
    }
}
