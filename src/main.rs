//! # Perspicuity CLI (`psp`)
//!
//! The `psp` binary sends questions to the answer service and renders the
//! answer with its supporting sources.
//!
//! ## Usage
//!
//! ```bash
//! psp [--config ./config/psp.toml] [--base-url URL] [--context-results N] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `psp ask <text>...` | Ask one question and print the answer |
//! | `psp repl` | Ask questions interactively, one per line |
//! | `psp config` | Print the effective configuration |
//!
//! ## Examples
//!
//! ```bash
//! # Ask a single question
//! psp ask "How do lifetimes work?"
//!
//! # Machine-readable output
//! psp ask --json "How do lifetimes work?"
//!
//! # Point at a different service and ask for more sources
//! psp --base-url http://10.0.0.5:8000 --context-results 8 repl
//! ```

use clap::{Parser, Subcommand};
use perspicuity::config::{self, Overrides};
use perspicuity::{ask, repl};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Perspicuity CLI: ask an answer service and read the sources it cites.
#[derive(Parser)]
#[command(
    name = "psp",
    about = "Perspicuity: ask questions, get answers with cited sources",
    version,
    long_about = "Perspicuity sends each question to a retrieval-augmented answer service \
    and prints the generated answer followed by the ranked web sources it was based on."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/psp.toml` when that file exists; otherwise
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `[service].base_url`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override `[query].context_results`.
    #[arg(long, global = true)]
    context_results: Option<u32>,

    /// Log requests and state transitions to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ask a single question.
    ///
    /// All words are joined with spaces into one query. A blank query sends
    /// nothing. Exits with status 1 if the service reports an error or
    /// cannot be reached.
    Ask {
        /// The question.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print the result (or error) as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Ask questions interactively.
    ///
    /// Reads one question per line from stdin. A new question replaces one
    /// that is still waiting for its answer. Type `:q` or send EOF to quit.
    Repl,

    /// Print the effective configuration as TOML.
    Config,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,perspicuity=debug,perspicuity_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = Overrides {
        base_url: cli.base_url,
        context_results: cli.context_results,
    };
    let cfg = config::resolve_config(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Commands::Ask { text, json } => {
            ask::run_ask(&cfg, &text, json).await?;
        }
        Commands::Repl => {
            repl::run_repl(&cfg).await?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}
