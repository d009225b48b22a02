//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::research::SpeedHint;

/// research-rs: iterative deep-research engine.
///
/// Plans a breadth × depth tree of web searches for a question, extracts
/// findings round by round, and writes a markdown report.
#[derive(Parser, Debug)]
#[command(name = "research-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the report database.
    ///
    /// Defaults to `.research/reports.db` in the current directory.
    #[arg(short, long, env = "RESEARCH_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a research session and print the report.
    ///
    /// Progress lines go to stderr and the report to stdout. With
    /// `--format json` every progress snapshot is printed as one JSON line.
    #[command(after_help = r#"Examples:
  research-rs research "best rust web frameworks"
  research-rs research "rust async runtimes" --speed fast
  research-rs research "home espresso machines" --clarify "Budget?=under 500 USD"
  research-rs research "sqlite vs postgres" --save
  research-rs --format json research "wasm runtimes" | jq -c '.progress'
"#)]
    Research {
        /// The research question.
        query: String,

        /// Clarification answer as `QUESTION=ANSWER` (repeatable).
        #[arg(short, long = "clarify", value_name = "Q=A", value_parser = parse_clarification)]
        clarifications: Vec<(String, String)>,

        /// Preferred session speed (fast, balanced, thorough).
        #[arg(short, long)]
        speed: Option<SpeedHint>,

        /// Save the finished report to the report database.
        #[arg(long)]
        save: bool,

        /// Directory containing prompt template files.
        #[arg(long, env = "RESEARCH_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },

    /// Show the breadth, depth, and model tier a question would get.
    #[command(after_help = r#"Examples:
  research-rs plan "history of the printing press"
  research-rs plan "top 10 sci-fi novels" --speed thorough
"#)]
    Plan {
        /// The research question.
        query: String,

        /// Preferred session speed (fast, balanced, thorough).
        #[arg(short, long)]
        speed: Option<SpeedHint>,

        /// Directory containing prompt template files.
        #[arg(long, env = "RESEARCH_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },

    /// Write the default prompt templates to a directory.
    ///
    /// Existing files are left untouched.
    #[command(after_help = r#"Examples:
  research-rs init-prompts                       # ~/.config/research-rs/prompts
  research-rs init-prompts --dir ./prompts
"#)]
    InitPrompts {
        /// Target directory.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Serve research sessions over WebSocket.
    #[cfg(feature = "server")]
    #[command(after_help = r#"Examples:
  research-rs serve                      # 127.0.0.1:8080
  research-rs serve --host 0.0.0.0 --port 9000
"#)]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind.
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Save every completed report to the report database.
        #[arg(long)]
        save: bool,
    },

    /// Saved report operations (list, show).
    #[cfg(feature = "store")]
    #[command(subcommand)]
    Reports(ReportsCommands),
}

/// Saved report subcommands.
#[cfg(feature = "store")]
#[derive(Subcommand, Debug)]
pub enum ReportsCommands {
    /// List saved reports, newest first.
    List,

    /// Print one saved report.
    Show {
        /// Report id.
        id: i64,
    },
}

/// Parses a `QUESTION=ANSWER` clarification.
fn parse_clarification(s: &str) -> Result<(String, String), String> {
    let (question, answer) = s
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=ANSWER, got '{s}'"))?;
    let question = question.trim();
    if question.is_empty() {
        return Err("clarification question cannot be empty".to_string());
    }
    Ok((question.to_string(), answer.trim().to_string()))
}

impl Cli {
    /// Returns the report database path, applying the default.
    #[cfg(feature = "store")]
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        crate::store::ReportStore::resolve_path(self.db_path.as_deref())
    }
}
