//! Core data models used throughout Perspicuity.
//!
//! These types represent the query that leaves the client, the answer and
//! sources that come back, and the lifecycle state the controller exposes
//! to the rendering layer.

use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

/// Number of supporting sources requested when nothing else is configured.
pub const DEFAULT_CONTEXT_RESULTS: u32 = 5;

/// Message shown for every failure that carries no service-provided detail.
///
/// Existing consumers match on this exact text.
pub const FALLBACK_ERROR_MESSAGE: &str = "An error occurred while processing your request";

/// A validated, trimmed, non-empty query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Trim `raw` and accept it if anything is left.
    ///
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request body sent to the answer service.
///
/// Serializes to exactly `{"text": ..., "context_results": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub context_results: u32,
}

impl QueryRequest {
    pub fn new(query: &Query, context_results: u32) -> Self {
        Self {
            text: query.as_str().to_string(),
            context_results,
        }
    }
}

/// One supporting citation backing an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Outcome of the service's web search stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Sources were found and passed to the answer model.
    Success,
    /// The search stage was throttled; the answer was generated without sources.
    RateLimited,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

/// A generated answer plus its relevance-ranked sources.
///
/// `search_results` keeps the order the service returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub search_results: Vec<SourceResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_status: Option<SearchStatus>,
}

/// Normalized, human-readable failure description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The generic failure used when the service gave no detail.
    pub fn fallback() -> Self {
        Self::new(FALLBACK_ERROR_MESSAGE)
    }
}

impl From<&TransportError> for ErrorInfo {
    /// A service detail passes through verbatim; everything else collapses
    /// to [`FALLBACK_ERROR_MESSAGE`].
    fn from(err: &TransportError) -> Self {
        match err.detail() {
            Some(detail) => Self::new(detail),
            None => Self::fallback(),
        }
    }
}

/// The controller's lifecycle state. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryState {
    #[default]
    Idle,
    Submitting(Query),
    Success(QueryResult),
    Failure(ErrorInfo),
}

impl QueryState {
    /// Short lowercase name of the active variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryState::Idle => "idle",
            QueryState::Submitting(_) => "submitting",
            QueryState::Success(_) => "success",
            QueryState::Failure(_) => "failure",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, QueryState::Idle)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, QueryState::Submitting(_))
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            QueryState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            QueryState::Failure(error) => Some(error),
            _ => None,
        }
    }
}
