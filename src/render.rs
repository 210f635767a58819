//! Terminal rendering of the query lifecycle.
//!
//! Each [`QueryState`] maps to one view:
//!
//! | State | View | Stream |
//! |-------|------|--------|
//! | `Idle` | nothing | none |
//! | `Submitting` | `Searching: <query>` | stderr |
//! | `Success` | answer, then numbered sources in service order | stdout |
//! | `Failure` | `Error: <message>` | stderr |
//!
//! Status lines go to stderr so stdout only ever carries answers, which
//! keeps `psp ask ... > answer.txt` useful.

use perspicuity_core::{QueryResult, QueryState, SearchStatus};
use serde_json::{json, Value};

/// A rendered view and the stream it belongs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Stdout(String),
    Stderr(String),
}

pub fn render_state(state: &QueryState) -> Option<View> {
    match state {
        QueryState::Idle => None,
        QueryState::Submitting(query) => Some(View::Stderr(format!("Searching: {}", query))),
        QueryState::Success(result) => Some(View::Stdout(render_result(result))),
        QueryState::Failure(error) => Some(View::Stderr(format!("Error: {}", error.message))),
    }
}

/// Render an answer followed by its sources.
///
/// The answer is printed verbatim, then a blank line before the source
/// list. Sources keep the order the service ranked them in.
pub fn render_result(result: &QueryResult) -> String {
    let mut out = result.answer.clone();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("\nSources\n");

    if result.search_results.is_empty() {
        match result.search_status {
            Some(SearchStatus::RateLimited) => out.push_str(
                "Web search was rate limited; the answer was generated without sources.\n",
            ),
            _ => out.push_str("No sources.\n"),
        }
        return out;
    }

    for (i, source) in result.search_results.iter().enumerate() {
        out.push_str(&format!("[{}] {}\n", i + 1, source.title));
        out.push_str(&format!("    {}\n", source.link));
        if !source.snippet.is_empty() {
            out.push_str(&format!("    {}\n", source.snippet));
        }
    }
    out
}

/// JSON form of a settled state: the result itself, or
/// `{"error": {"message": ...}}`. `None` for unsettled states.
pub fn render_json(state: &QueryState) -> Option<Value> {
    match state {
        QueryState::Success(result) => serde_json::to_value(result).ok(),
        QueryState::Failure(error) => Some(json!({ "error": { "message": error.message } })),
        QueryState::Idle | QueryState::Submitting(_) => None,
    }
}

/// Write the view for `state` to its stream.
pub fn print_state(state: &QueryState) {
    match render_state(state) {
        Some(View::Stdout(text)) => print!("{}", text),
        Some(View::Stderr(text)) => eprintln!("{}", text),
        None => {}
    }
}
