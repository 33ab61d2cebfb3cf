//! CLI layer for viajero-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! chatting, inspecting domain detection, and printing configuration.

pub mod commands;
pub mod parser;

pub use commands::execute;
pub use parser::{Cli, Commands};
