//! Typed field definitions
//!
//! A [`FieldDef`] describes one column of a measurement: its name, whether it
//! is a tag, a typed field value or the point timestamp, and how missing
//! values are handled. `coerce` turns loosely typed input (JSON values, as
//! they arrive from callers or from fetched rows) into a [`FieldValue`].

use crate::model::FieldValueError;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamp precision, used to read numeric timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    #[serde(rename = "ns")]
    Nanoseconds,
    #[serde(rename = "u")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
}

impl Precision {
    /// Parse from the InfluxDB precision abbreviation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ns" => Some(Self::Nanoseconds),
            "u" => Some(Self::Microseconds),
            "ms" => Some(Self::Milliseconds),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            _ => None,
        }
    }

    /// Nanoseconds in one unit of this precision
    pub fn nanos_per_unit(&self) -> i64 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60 * 1_000_000_000,
            Self::Hours => 3600 * 1_000_000_000,
        }
    }

    /// Convert nanoseconds to whole units of this precision
    pub fn from_nanos(&self, nanos: i64) -> i64 {
        nanos / self.nanos_per_unit()
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nanoseconds => write!(f, "ns"),
            Self::Microseconds => write!(f, "u"),
            Self::Milliseconds => write!(f, "ms"),
            Self::Seconds => write!(f, "s"),
            Self::Minutes => write!(f, "m"),
            Self::Hours => write!(f, "h"),
        }
    }
}

/// What a column is, and how its values are typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Indexed string dimension
    Tag,
    Integer,
    Float,
    String,
    Boolean,
    /// The point timestamp. Numbers are read in `precision` units.
    Timestamp { precision: Precision, auto_now: bool },
}

/// A typed value held by a model instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    /// Nanoseconds since the Unix epoch
    Timestamp(i64),
}

impl FieldValue {
    /// Raw JSON view of the value
    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::from(s.as_str()),
            Self::Boolean(b) => Value::from(*b),
            Self::Timestamp(ns) => Value::from(*ns),
        }
    }

    /// Text form, as used for tag values
    pub fn as_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) | Self::Timestamp(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Boolean(b) => b.to_string(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Definition of one column of a measurement
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Whether the value may be absent (default: true)
    pub nullable: bool,
    /// Value used when none is given
    pub default: Option<Value>,
}

impl FieldDef {
    /// Create a nullable field without a default
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            default: None,
        }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Tag)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Timestamp in seconds, filled with the current time when missing
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Timestamp {
                precision: Precision::Seconds,
                auto_now: true,
            },
        )
    }

    /// Builder: disallow missing values
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Builder: set the default value
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Builder: set the unit numeric timestamps are read in
    pub fn precision(mut self, precision: Precision) -> Self {
        if let FieldKind::Timestamp { auto_now, .. } = self.kind {
            self.kind = FieldKind::Timestamp { precision, auto_now };
        }
        self
    }

    /// Builder: toggle filling a missing timestamp with the current time
    pub fn auto_now(mut self, auto_now: bool) -> Self {
        if let FieldKind::Timestamp { precision, .. } = self.kind {
            self.kind = FieldKind::Timestamp { precision, auto_now };
        }
        self
    }

    /// Must be provided by the caller
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }

    pub fn is_tag(&self) -> bool {
        self.kind == FieldKind::Tag
    }

    pub fn is_timestamp(&self) -> bool {
        matches!(self.kind, FieldKind::Timestamp { .. })
    }

    /// Cast `value` to this field's type.
    ///
    /// `null` falls back to the default; `Ok(None)` means the field stays empty.
    pub fn coerce(&self, value: &Value) -> Result<Option<FieldValue>, FieldValueError> {
        if value.is_null() {
            return match &self.default {
                Some(default) if !default.is_null() => self.cast(default).map(Some),
                _ if self.nullable => Ok(None),
                _ => Err(FieldValueError::Required(self.name.clone())),
            };
        }
        self.cast(value).map(Some)
    }

    fn cast(&self, value: &Value) -> Result<FieldValue, FieldValueError> {
        match self.kind {
            FieldKind::Tag | FieldKind::String => Ok(FieldValue::String(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
            FieldKind::Integer => self.cast_integer(value).map(FieldValue::Integer),
            FieldKind::Float => self.cast_float(value).map(FieldValue::Float),
            FieldKind::Boolean => Ok(FieldValue::Boolean(match value {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
                Value::String(s) => match s.to_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    other => !other.is_empty(),
                },
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
                Value::Null => false,
            })),
            FieldKind::Timestamp { precision, .. } => {
                self.cast_timestamp(value, precision).map(FieldValue::Timestamp)
            }
        }
    }

    fn cast_integer(&self, value: &Value) -> Result<i64, FieldValueError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .ok_or_else(|| FieldValueError::invalid(&self.name, format!("{} is out of range", n))),
            Value::String(s) => {
                let s = s.trim();
                let invalid =
                    || FieldValueError::invalid(&self.name, format!("invalid literal for integer: '{}'", s));
                match s.parse::<i64>() {
                    Ok(i) => Ok(i),
                    Err(_) => match s.parse::<f64>() {
                        Ok(f) if f.is_finite() => Ok(f.trunc() as i64),
                        _ => Err(invalid()),
                    },
                }
            }
            Value::Bool(b) => Ok(*b as i64),
            other => Err(FieldValueError::invalid(
                &self.name,
                format!("expected an integer, got {}", other),
            )),
        }
    }

    fn cast_float(&self, value: &Value) -> Result<f64, FieldValueError> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| FieldValueError::invalid(&self.name, format!("{} is out of range", n))),
            Value::String(s) => {
                let parsed = s.trim().parse::<f64>().map_err(|_| {
                    FieldValueError::invalid(&self.name, format!("invalid literal for float: '{}'", s))
                })?;
                if !parsed.is_finite() {
                    return Err(FieldValueError::invalid(
                        &self.name,
                        format!("non-finite float: '{}'", s.trim()),
                    ));
                }
                Ok(parsed)
            }
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(FieldValueError::invalid(
                &self.name,
                format!("expected a number, got {}", other),
            )),
        }
    }

    fn cast_timestamp(&self, value: &Value, precision: Precision) -> Result<i64, FieldValueError> {
        let unit = precision.nanos_per_unit();
        let overflow = || FieldValueError::invalid(&self.name, "timestamp out of range");

        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => i.checked_mul(unit).ok_or_else(overflow),
                None => n
                    .as_f64()
                    .map(|f| (f * unit as f64).round() as i64)
                    .ok_or_else(overflow),
            },
            Value::String(s) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return dt.timestamp_nanos_opt().ok_or_else(overflow);
                }
                match s.trim().parse::<i64>() {
                    Ok(i) => i.checked_mul(unit).ok_or_else(overflow),
                    Err(_) => Err(FieldValueError::invalid(
                        &self.name,
                        format!("invalid timestamp: '{}'", s),
                    )),
                }
            }
            other => Err(FieldValueError::invalid(
                &self.name,
                format!("expected a timestamp, got {}", other),
            )),
        }
    }
}
