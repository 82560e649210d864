//! InfluxDB HTTP client
//!
//! Speaks the InfluxDB 1.x HTTP API: statements go to `/query`, points go to
//! `/write` as line protocol. Write dispatch honours the process-wide
//! toggles from [`InfluxConfig`]: writes can be disabled, pushed onto a
//! background task, or have their failures logged instead of returned.

use crate::client::{TabularResponse, Transport, TransportError};
use crate::config::InfluxConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// InfluxDB REST API client
#[derive(Debug, Clone)]
pub struct InfluxClient {
    client: Client,
    config: InfluxConfig,
}

impl InfluxClient {
    /// Create a new client with the given configuration
    pub fn new(config: InfluxConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.ssl && !config.verify_ssl)
            .build()
            .map_err(TransportError::Request)?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Scheme, host and port of the server
    pub fn base_url(&self) -> String {
        let scheme = if self.config.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.config.host, self.config.port)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.config.username, Some(&self.config.password))
        }
    }

    /// Check if the server answers `/ping`
    pub async fn ping(&self) -> Result<(), TransportError> {
        let url = format!("{}/ping", self.base_url());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Unavailable)
        }
    }

    /// Run a statement against the configured database
    pub async fn query(&self, statement: &str) -> Result<TabularResponse, TransportError> {
        let url = format!("{}/query", self.base_url());
        tracing::debug!(statement, "Sending InfluxQL statement");

        let request = self.client.post(&url).form(&[
            ("q", statement),
            ("db", self.config.database.as_str()),
        ]);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        Self::decode(response).await
    }

    /// Run a statement that returns nothing, failing if the store rejects it
    async fn command(&self, statement: &str) -> Result<(), TransportError> {
        let response = self.query(statement).await?;
        match response.error {
            Some(message) => Err(TransportError::Rejected(message)),
            None => Ok(()),
        }
    }

    /// Drop a measurement and all of its points
    pub async fn drop_measurement(&self, measurement: &str) -> Result<(), TransportError> {
        tracing::info!(measurement, "Dropping measurement");
        self.command(&format!("DROP MEASUREMENT \"{}\"", measurement))
            .await
    }

    /// Drop a whole database
    pub async fn drop_database(&self, database: &str) -> Result<(), TransportError> {
        tracing::info!(database, "Dropping database");
        self.command(&format!("DROP DATABASE \"{}\"", database)).await
    }

    async fn decode(response: Response) -> Result<TabularResponse, TransportError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(TransportError::from_reqwest)?;

        if status.is_success() {
            return TabularResponse::from_influx_json(&text);
        }

        // Bad statements come back as 400 with an `{"error": ...}` body
        if status.as_u16() == 400 {
            if let Ok(parsed) = TabularResponse::from_influx_json(&text) {
                if parsed.error.is_some() {
                    return Ok(parsed);
                }
            }
        }

        Err(TransportError::Api {
            status: status.as_u16(),
            message: text,
        })
    }

    /// POST line protocol to `/write`
    async fn send_write(&self, lines: String) -> Result<(), TransportError> {
        let url = format!("{}/write", self.base_url());

        let request = self
            .client
            .post(&url)
            .query(&[("db", self.config.database.as_str()), ("precision", "ns")])
            .body(lines);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(TransportError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Write points according to the configured dispatch mode
    pub async fn write(&self, lines: &str) -> Result<(), TransportError> {
        if self.config.disabled {
            tracing::debug!(bytes = lines.len(), "InfluxDB writes disabled, dropping points");
            return Ok(());
        }

        if self.config.use_threading {
            let client = self.clone();
            let body = lines.to_string();
            tokio::spawn(async move {
                if let Err(e) = client.send_write(body).await {
                    tracing::error!(error = %e, "Error while writing data points");
                }
            });
            return Ok(());
        }

        match self.send_write(lines.to_string()).await {
            Ok(()) => Ok(()),
            Err(e) if self.config.fail_silently => {
                tracing::error!(error = %e, "Error while writing data points");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Transport for InfluxClient {
    async fn execute_query(&self, query: &str) -> Result<TabularResponse, TransportError> {
        self.query(query).await
    }

    async fn write_points(&self, lines: &str) -> Result<(), TransportError> {
        self.write(lines).await
    }

    async fn delete_points(&self, statement: &str) -> Result<(), TransportError> {
        self.command(statement).await
    }
}
