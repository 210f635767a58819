//! # Perspicuity
//!
//! A terminal client for a retrieval-augmented answer service.
//!
//! A query is sent to the service, which searches the web, asks a language
//! model to answer with the search results as context, and returns the
//! answer together with the ranked sources it used. Perspicuity renders
//! both.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────────┐   ┌───────────────┐   ┌────────────┐
//! │ psp ask  │──▶│ QueryController │──▶│ HttpTransport │──▶│   answer   │
//! │ psp repl │◀──│  (state machine)│◀──│   (reqwest)   │◀──│   service  │
//! └──────────┘   └─────────────────┘   └───────────────┘   └────────────┘
//!   render         perspicuity-core        transport
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! psp ask "What is a borrow checker?"
//! psp ask --json "What is a borrow checker?"
//! psp repl
//! psp --base-url http://answers.internal:8000 ask "..."
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and CLI overrides |
//! | [`transport`] | HTTP transport to the answer service |
//! | [`render`] | Terminal and JSON views of the query state |
//! | [`ask`] | One-shot query command |
//! | [`repl`] | Interactive query session |

pub mod ask;
pub mod config;
pub mod render;
pub mod repl;
pub mod transport;
