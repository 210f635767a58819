//! Interactive `psp repl`.
//!
//! Every non-blank input line is a new submission. A line entered while an
//! earlier query is still in flight supersedes it: the older response is
//! dropped when it arrives. `:q`, `:quit`, `:exit`, or end of input ends
//! the session once in-flight requests have settled.

use anyhow::{Context, Result};
use perspicuity_core::{QueryController, Transport};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::warn;

use crate::config::Config;
use crate::render;
use crate::transport::HttpTransport;

fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), ":q" | ":quit" | ":exit")
}

/// Feed each line of `input` to `controller` until an exit command or EOF.
///
/// Resolutions run on spawned tasks so reading continues while a request
/// is in flight. Lines that are not valid UTF-8 are skipped. Every spawned
/// resolution is awaited before returning, including when reading fails.
/// Returns the number of submissions that were sent.
pub async fn run_session<T, R>(controller: &QueryController<T>, mut input: R) -> Result<usize>
where
    T: Transport + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut in_flight = JoinSet::new();
    let mut submitted = 0;
    let mut buf = Vec::new();

    let read = loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!("skipping input line that is not valid UTF-8");
            continue;
        };
        if is_exit_command(line) {
            break Ok(());
        }
        let Some(ticket) = controller.begin(line) else {
            continue;
        };
        submitted += 1;
        let controller = controller.clone();
        in_flight.spawn(async move { controller.resolve(ticket).await });
    };

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "query task did not complete");
        }
    }

    read.context("failed to read input")?;
    Ok(submitted)
}

/// CLI entry point: runs a session on stdin, rendering every transition.
pub async fn run_repl(config: &Config) -> Result<()> {
    let transport = HttpTransport::new(config)?;
    let controller = QueryController::new(transport, config.query.context_results);
    controller.subscribe(render::print_state);

    eprintln!(
        "Ask anything. Sending to {} (:q to quit)",
        config.endpoint()
    );

    run_session(&controller, BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}
