//! # Perspicuity Core
//!
//! Runtime-agnostic logic for Perspicuity: the query data model, the
//! transport trait, and the query lifecycle controller.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. The
//! `perspicuity` app crate supplies the HTTP transport and the terminal
//! front end.

pub mod controller;
pub mod models;
pub mod transport;

pub use controller::{QueryController, Resolution, SubscriptionId, Ticket};
pub use models::{
    ErrorInfo, Query, QueryRequest, QueryResult, QueryState, SearchStatus, SourceResult,
    DEFAULT_CONTEXT_RESULTS, FALLBACK_ERROR_MESSAGE,
};
pub use transport::{Transport, TransportError};
