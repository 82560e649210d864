//! Model error types
//!
//! Raised when a value cannot be stored in a typed field or a model instance
//! cannot be rendered as a point.

use thiserror::Error;

/// Errors raised by the model layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldValueError {
    /// A non-nullable field without a default was not provided
    #[error("The field '{0}' cannot be nullable")]
    Required(String),

    /// The schema has no field with this name
    #[error("Unknown field '{field}' for measurement '{measurement}'")]
    UnknownField { measurement: String, field: String },

    /// The value could not be cast to the field's type
    #[error("<'{field}'> : {reason}")]
    InvalidValue { field: String, reason: String },

    /// Line protocol needs at least one field value
    #[error("Point for measurement '{0}' has no field values")]
    NoFields(String),

    /// An object in a bulk insert could not be rendered
    #[error("Object at position {index} could not be rendered: {source}")]
    InBatch {
        index: usize,
        #[source]
        source: Box<FieldValueError>,
    },
}

impl FieldValueError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FieldValueError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
