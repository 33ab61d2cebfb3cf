//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// viajero-rs: travel-advisory assistant core.
///
/// A CLI shell around the hybrid agent orchestrator and the semantic
/// retrieval pipeline.
#[derive(Parser, Debug)]
#[command(name = "viajero-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a JSON catalog seed for the in-memory store.
    #[arg(short, long, env = "VIAJERO_DATA_PATH")]
    pub data: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with the assistant.
    ///
    /// With a query argument, answers once and exits. Without one,
    /// reads queries from stdin until EOF.
    #[command(after_help = r#"Examples:
  viajero-rs chat "¿Qué hoteles hay en Tulum?"       # One-shot question
  viajero-rs --data seed.json chat                    # Interactive session
  viajero-rs chat --off "hola"                        # Limited mode, no tools
  viajero-rs chat --no-parallel "hotel y tours"       # Force the sequential path
"#)]
    Chat {
        /// The question to ask. Omit for an interactive session.
        query: Option<String>,

        /// Channel token for conversation scoping.
        #[arg(long)]
        channel: Option<String>,

        /// Thread token for conversation scoping.
        #[arg(long)]
        thread: Option<String>,

        /// Run in limited mode (no knowledge-base tools).
        #[arg(long)]
        off: bool,

        /// Disable the parallel specialist path for this session.
        #[arg(long)]
        no_parallel: bool,

        /// Display name used for personalization.
        #[arg(long, default_value = "Usuario")]
        name: String,
    },

    /// Show which travel domains a query maps to.
    ///
    /// Runs the keyword detector only; no model calls are made.
    Detect {
        /// Query text to classify.
        query: String,
    },

    /// Print the resolved configuration.
    Config,
}
