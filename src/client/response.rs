//! Tabular responses
//!
//! The store answers every query with a table: ordered column names and rows
//! of raw JSON cells. `TabularResponse` is that table, decoded from the
//! InfluxDB `/query` JSON body.

use crate::client::TransportError;
use crate::query::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Columns plus rows, with the error the store reported (if any)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResponse {
    /// Column names, in order; `time` usually comes first
    pub columns: Vec<String>,
    /// One value sequence per row, aligned with `columns`
    pub rows: Vec<Vec<Value>>,
    /// Statement-level error reported by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TabularResponse {
    /// Build a successful response
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
            error: None,
        }
    }

    /// A response with no columns and no rows
    pub fn empty() -> Self {
        Self::default()
    }

    /// A response carrying a store-side error
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the first column is `time`
    pub fn has_time_column(&self) -> bool {
        self.columns.first().map(|c| c == "time").unwrap_or(false)
    }

    /// Surface a store-side error as `QueryError::Execution`
    pub fn raise_if_error(&self) -> QueryResult<()> {
        match &self.error {
            Some(message) => Err(QueryError::Execution(message.clone())),
            None => Ok(()),
        }
    }

    /// Decode an InfluxDB `/query` JSON body.
    ///
    /// Only the first statement is read. Series that share the first series'
    /// columns are concatenated (this is what a `GROUP BY <tag>` reply looks
    /// like); series with a different shape are dropped.
    pub fn from_influx_json(body: &str) -> Result<Self, TransportError> {
        let reply: InfluxReply = serde_json::from_str(body)?;

        if let Some(error) = reply.error {
            return Ok(Self::failed(error));
        }

        let Some(statement) = reply.results.into_iter().next() else {
            return Ok(Self::empty());
        };

        if let Some(error) = statement.error {
            return Ok(Self::failed(error));
        }

        let mut series = statement.series.into_iter();
        let Some(first) = series.next() else {
            return Ok(Self::empty());
        };

        let mut response = Self::new(first.columns, first.values);
        for extra in series {
            if extra.columns == response.columns {
                response.rows.extend(extra.values);
            } else {
                tracing::warn!(
                    series = extra.name.as_deref().unwrap_or(""),
                    "Dropping series with mismatched columns"
                );
            }
        }

        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct InfluxReply {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    name: Option<String>,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_single_series() {
        let body = r#"{"results":[{"statement_id":0,"series":[{"name":"vehicle","columns":["time","speed","name"],"values":[["2024-01-15T14:00:00Z",12.5,"car"],["2024-01-15T14:01:00Z",13,"car"]]}]}]}"#;
        let response = TabularResponse::from_influx_json(body).unwrap();

        assert_eq!(response.columns, vec!["time", "speed", "name"]);
        assert_eq!(response.rows.len(), 2);
        assert_eq!(response.rows[1][1], json!(13));
        assert!(response.has_time_column());
        assert!(response.raise_if_error().is_ok());
    }

    #[test]
    fn test_decode_empty_statement() {
        let body = r#"{"results":[{"statement_id":0}]}"#;
        let response = TabularResponse::from_influx_json(body).unwrap();
        assert!(response.is_empty());
        assert!(response.columns.is_empty());
    }

    #[test]
    fn test_decode_statement_error() {
        let body = r#"{"results":[{"statement_id":0,"error":"database not found: fleet"}]}"#;
        let response = TabularResponse::from_influx_json(body).unwrap();
        let err = response.raise_if_error().unwrap_err();
        assert!(matches!(err, QueryError::Execution(ref m) if m == "database not found: fleet"));
    }

    #[test]
    fn test_decode_grouped_series() {
        let body = r#"{"results":[{"series":[
            {"name":"vehicle","tags":{"name":"car"},"columns":["time","count"],"values":[[0,3]]},
            {"name":"vehicle","tags":{"name":"bus"},"columns":["time","count"],"values":[[0,5]]},
            {"name":"vehicle","columns":["time","other"],"values":[[0,1]]}
        ]}]}"#;
        let response = TabularResponse::from_influx_json(body).unwrap();
        assert_eq!(response.rows, vec![vec![json!(0), json!(3)], vec![json!(0), json!(5)]]);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            TabularResponse::from_influx_json("not json"),
            Err(TransportError::Decode(_))
        ));
    }
}
