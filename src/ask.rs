//! One-shot `psp ask`.

use anyhow::Result;
use perspicuity_core::{QueryController, QueryState, Transport};
use tracing::debug;

use crate::config::Config;
use crate::render;
use crate::transport::HttpTransport;

/// Submit `text` once through `controller` and return the settled state.
///
/// Blank input sends nothing and returns the state unchanged.
pub async fn ask<T: Transport>(controller: &QueryController<T>, text: &str) -> QueryState {
    if controller.submit(text).await.is_none() {
        debug!("blank query; nothing sent");
    }
    controller.state()
}

/// CLI entry point: joins `words`, asks once, and prints the outcome.
///
/// Exits with status 1 when the query fails.
pub async fn run_ask(config: &Config, words: &[String], json: bool) -> Result<()> {
    let transport = HttpTransport::new(config)?;
    let controller = QueryController::new(transport, config.query.context_results);

    if !json {
        controller.subscribe(|state| {
            if state.is_submitting() {
                render::print_state(state);
            }
        });
    }

    let state = ask(&controller, &words.join(" ")).await;

    if json {
        if let Some(value) = render::render_json(&state) {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    } else {
        render::print_state(&state);
    }

    if state.error().is_some() {
        std::process::exit(1);
    }

    Ok(())
}
