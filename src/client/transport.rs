//! Transport seam
//!
//! The query layer needs exactly three capabilities from the store. Anything
//! that implements [`Transport`] can back a [`Query`](crate::query::Query):
//! the HTTP [`InfluxClient`](crate::client::InfluxClient) in production, or
//! [`MemoryTransport`] in tests and offline tooling.

use crate::client::{TabularResponse, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Capabilities the query layer needs from the store
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run a read statement and return its table
    async fn execute_query(&self, query: &str) -> Result<TabularResponse, TransportError>;

    /// Submit newline-separated line-protocol points
    async fn write_points(&self, lines: &str) -> Result<(), TransportError>;

    /// Run a `DELETE` statement
    async fn delete_points(&self, statement: &str) -> Result<(), TransportError>;
}

/// In-process transport that records statements and replays canned replies.
///
/// Replies are queued with [`push_response`](Self::push_response) and handed
/// out in order, one per `execute_query`; once the queue is empty every query
/// gets an empty table.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    responses: Mutex<VecDeque<TabularResponse>>,
    queries: Mutex<Vec<String>>,
    writes: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
}

impl MemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the reply for the next query
    pub fn push_response(&self, response: TabularResponse) {
        lock(&self.responses).push_back(response);
    }

    /// Every query executed so far, in order
    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }

    /// The most recent query, if any
    pub fn last_query(&self) -> Option<String> {
        lock(&self.queries).last().cloned()
    }

    /// Every write body submitted so far
    pub fn writes(&self) -> Vec<String> {
        lock(&self.writes).clone()
    }

    /// Every delete statement issued so far
    pub fn deletes(&self) -> Vec<String> {
        lock(&self.deletes).clone()
    }
}

// A poisoned lock only means another test thread panicked mid-push; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn execute_query(&self, query: &str) -> Result<TabularResponse, TransportError> {
        lock(&self.queries).push(query.to_string());
        Ok(lock(&self.responses).pop_front().unwrap_or_default())
    }

    async fn write_points(&self, lines: &str) -> Result<(), TransportError> {
        lock(&self.writes).push(lines.to_string());
        Ok(())
    }

    async fn delete_points(&self, statement: &str) -> Result<(), TransportError> {
        lock(&self.deletes).push(statement.to_string());
        Ok(())
    }
}
