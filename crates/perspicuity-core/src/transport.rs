//! Transport abstraction between the controller and the answer service.
//!
//! The [`Transport`] trait is the single seam the controller talks through.
//! The HTTP implementation lives in the `perspicuity` app crate; tests use
//! scripted in-memory transports.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{QueryRequest, QueryResult};

/// Every way a single exchange with the answer service can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response was received (connect failure, reset, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Non-success response carrying a service-provided detail message.
    #[error("service error {status}: {detail}")]
    Service { status: u16, detail: String },

    /// Non-success response without a usable detail message.
    #[error("service returned status {status}")]
    Status { status: u16 },

    /// Success response whose body is not a valid query result.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// The service-provided message, if the service sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            TransportError::Service { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// HTTP status of the failed response, if a response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Service { status, .. } | TransportError::Status { status } => {
                Some(*status)
            }
            TransportError::Network(_) | TransportError::Decode(_) => None,
        }
    }
}

/// One request/response exchange with the answer service.
///
/// Implementations never retry, keep no state between calls, and report
/// every failure as a [`TransportError`] value.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and wait for the service's answer.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, TransportError> {
        (**self).query(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, TransportError> {
        (**self).query(request).await
    }
}
