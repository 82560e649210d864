//! Line protocol points
//!
//! A [`Point`] is one row on its way to the store: measurement, tag set,
//! field set and an optional nanosecond timestamp. `to_line` renders it in
//! InfluxDB line protocol:
//!
//! ```text
//! vehicle,name=car speed=12.5,gear=3i,note="ok" 1705329342000000000
//! ```

use crate::model::{FieldValue, FieldValueError};

/// A single data point in line-protocol shape
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
    /// Nanoseconds since the Unix epoch; the store assigns one when absent
    pub timestamp: Option<i64>,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp: None,
        }
    }

    /// Builder: add a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Builder: add a field value
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Builder: set the timestamp in nanoseconds
    pub fn timestamp(mut self, nanos: i64) -> Self {
        self.timestamp = Some(nanos);
        self
    }

    /// Render as one line of line protocol.
    ///
    /// Tags with an empty value are left out. Fails when there are no fields
    /// or a float field is NaN or infinite.
    pub fn to_line(&self) -> Result<String, FieldValueError> {
        if self.fields.is_empty() {
            return Err(FieldValueError::NoFields(self.measurement.clone()));
        }

        if let Some((key, _)) = self
            .fields
            .iter()
            .find(|(_, value)| matches!(value, FieldValue::Float(f) if !f.is_finite()))
        {
            return Err(FieldValueError::invalid(key, "non-finite float"));
        }

        let mut line = escape_measurement(&self.measurement);

        // the store rejects empty tag values
        for (key, value) in self.tags.iter().filter(|(_, value)| !value.is_empty()) {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape_key(key), render_field(value)))
            .collect();
        line.push(' ');
        line.push_str(&fields.join(","));

        if let Some(ts) = self.timestamp {
            line.push(' ');
            line.push_str(&ts.to_string());
        }

        Ok(line)
    }
}

/// Anything that can be written as a point
pub trait ToPoint {
    fn to_point(&self) -> Result<Point, FieldValueError>;
}

impl ToPoint for Point {
    fn to_point(&self) -> Result<Point, FieldValueError> {
        Ok(self.clone())
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn render_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(i) | FieldValue::Timestamp(i) => format!("{}i", i),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
    }
}
