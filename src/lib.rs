//! # research-rs
//!
//! Iterative deep-research engine. A question goes in; a markdown report
//! comes out, built from web search results gathered over a planned
//! breadth × depth tree of queries.
//!
//! ## Modules
//!
//! - [`research`]: planning, search workers, query expansion, token
//!   budgeting, report synthesis, and the orchestrator that drives them
//! - [`store`]: SQLite persistence for finished reports (feature `store`)
//! - [`server`]: WebSocket progress server (feature `server`)
//! - [`cli`]: command-line interface
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use research_rs::research::{
//!     CollectingSink, Orchestrator, ResearchConfig, ResearchRequest, create_provider,
//!     create_search_provider,
//! };
//!
//! # async fn run() -> research_rs::Result<()> {
//! let config = ResearchConfig::from_env()?;
//! let orchestrator = Orchestrator::new(
//!     create_provider(&config)?,
//!     create_search_provider(&config)?,
//!     &config,
//! );
//! let sink = CollectingSink::new();
//! let request = ResearchRequest::new("best rust web frameworks");
//! let terminal = orchestrator.run_research(&request, &sink, None).await;
//! println!("{}", terminal.report.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod research;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "store")]
pub mod store;

pub use error::{CommandError, Error, ResearchError, Result, StorageError};
pub use research::{
    Orchestrator, ProgressSink, ProgressSnapshot, ResearchConfig, ResearchRequest, ResearchStatus,
};
#[cfg(feature = "store")]
pub use store::ReportStore;
