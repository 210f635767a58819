//! HTTP transport to the answer service.
//!
//! [`HttpTransport`] implements the core [`Transport`] trait with a single
//! `POST` of the JSON query body to the configured endpoint:
//!
//! - 2xx → body decoded as a [`QueryResult`]; an undecodable body is
//!   [`TransportError::Decode`].
//! - non-2xx with a string `detail` field → [`TransportError::Service`].
//! - non-2xx otherwise → [`TransportError::Status`].
//! - no response at all → [`TransportError::Network`].
//!
//! There is no retry and no timeout beyond `service.timeout_secs`, which is
//! unset by default.

use anyhow::Result;
use async_trait::async_trait;
use perspicuity_core::{QueryRequest, QueryResult, Transport, TransportError};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;

/// Answer-service client backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Build a client for the endpoint described by `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.service.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, TransportError> {
        debug!(endpoint = %self.endpoint, context_results = request.context_results, "sending query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;
            return serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()));
        }

        let body_text = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body_text, "service returned an error");

        match extract_detail(&body_text) {
            Some(detail) => Err(TransportError::Service {
                status: status.as_u16(),
                detail,
            }),
            None => Err(TransportError::Status {
                status: status.as_u16(),
            }),
        }
    }
}

/// Pull the service's `detail` message out of an error body.
///
/// Only a non-empty string counts; structured validation details and
/// non-JSON bodies yield `None`.
pub fn extract_detail(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = json.get("detail")?.as_str()?;
    if detail.is_empty() {
        None
    } else {
        Some(detail.to_string())
    }
}
