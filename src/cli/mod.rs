//! CLI layer for research-rs.
//!
//! Provides the command-line interface using clap, with commands for
//! running and planning research sessions, serving them over WebSocket,
//! and browsing saved reports.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "store")]
pub use parser::ReportsCommands;
pub use parser::{Cli, Commands};
