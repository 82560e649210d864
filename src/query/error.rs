//! Query error types
//!
//! Defines all error conditions that can occur while building, rendering and
//! executing queries.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// The transport failed to deliver the statement or its reply
    #[error("Transport error: {0}")]
    Transport(#[from] crate::client::TransportError),

    /// The store accepted the statement but reported an error for it
    #[error("Execution error: {0}")]
    Execution(String),

    /// A model instance could not be turned into a point
    #[error("Field value error: {0}")]
    FieldValue(#[from] crate::model::FieldValueError),

    /// A keyword filter or search key names a column the model doesn't declare
    #[error("Unknown field '{field}' for measurement '{measurement}'")]
    UnknownField { measurement: String, field: String },

    /// Operation needs a model (schema) attached to the query
    #[error("No model attached to query: {0}")]
    NoModel(&'static str),

    /// Criteria expression parsing failed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::UnknownField {
            measurement: "vehicle".to_string(),
            field: "colour".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown field 'colour' for measurement 'vehicle'"
        );

        let err = QueryError::Execution("database not found: fleet".to_string());
        assert_eq!(err.to_string(), "Execution error: database not found: fleet");
    }
}
