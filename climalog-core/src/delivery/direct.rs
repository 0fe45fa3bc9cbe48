//! HTTP delivery to the backend ingestion endpoint
//!
//! One POST per record, no retries: a failed record is dropped for the
//! current cycle.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::DirectConfig;
use crate::error::{Error, Result};
use crate::types::CanonicalRecord;

use super::resolve::classify_unreachable;

/// Resource path appended to the backend base URL
pub const INGEST_PATH: &str = "/weather/logs";

/// Stateless HTTP sender
pub struct DirectTransport {
    http_client: reqwest::Client,
    ingest_url: reqwest::Url,
    timeout: Duration,
}

impl DirectTransport {
    /// Create a transport from configuration
    ///
    /// Returns an error if the backend URL is invalid.
    pub fn new(config: &DirectConfig) -> Result<Self> {
        let ingest_url = ingest_url(&config.backend_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            ingest_url,
            timeout: config.timeout(),
        })
    }

    pub fn ingest_url(&self) -> &str {
        self.ingest_url.as_str()
    }

    /// POST one record. Any 2xx status is success.
    pub async fn send(&self, record: &CanonicalRecord) -> Result<()> {
        tracing::debug!(url = %self.ingest_url, city = %record.city, "Sending record");

        let result = self
            .http_client
            .post(self.ingest_url.clone())
            .json(record)
            .send()
            .await;

        let outcome = match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    tracing::debug!(
                        city = %record.city,
                        status = status.as_u16(),
                        "Record accepted by backend"
                    );
                    return Ok(());
                }
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                Error::Protocol(format!("API error ({}): {}", status, error_text))
            }
            Err(e) => self.classify(e).await,
        };

        match &outcome {
            Error::Dns { host, .. } => tracing::error!(
                city = %record.city,
                host = %host,
                url = %self.ingest_url,
                hint = outcome.hint().unwrap_or_default(),
                "Could not resolve backend hostname"
            ),
            other => tracing::error!(
                city = %record.city,
                kind = %other.kind(),
                error = %other,
                "Failed to send record to backend"
            ),
        }

        Err(outcome)
    }

    async fn classify(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            return Error::Connection(format!("request timed out after {:?}", self.timeout));
        }
        if error.is_builder() {
            return Error::Config(format!("invalid request: {}", error));
        }

        match self.ingest_url.host_str() {
            Some(host) => {
                let port = self.ingest_url.port_or_known_default().unwrap_or(80);
                classify_unreachable(host, port, format!("HTTP request failed: {}", error)).await
            }
            None => Error::Connection(format!("HTTP request failed: {}", error)),
        }
    }
}

/// Build the ingestion URL from a base URL, ignoring trailing slashes.
pub fn ingest_url(base_url: &str) -> Result<reqwest::Url> {
    let joined = format!("{}{}", base_url.trim().trim_end_matches('/'), INGEST_PATH);
    reqwest::Url::parse(&joined)
        .map_err(|e| Error::Config(format!("invalid backend URL '{}': {}", base_url, e)))
}
