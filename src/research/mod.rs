//! Iterative deep-research pipeline.
//!
//! Turns a question into a markdown report by planning a breadth×depth
//! search, extracting findings from web results round by round, and
//! synthesizing the findings at the end. Progress is streamed as complete
//! snapshots through a [`ProgressSink`].
//!
//! # Architecture
//!
//! ```text
//! ResearchRequest → Orchestrator
//!   ├── ParameterPlanner (breadth, depth)
//!   ├── for each round (≤ breadth queries, sequential)
//!   │   ├── SearchWorker → SearchProvider + extraction LLM call
//!   │   └── QueryExpander → next round's queries
//!   ├── ReportSynthesizer
//!   │   ├── ModelSelector (tier)
//!   │   ├── TokenBudget (trim to tier budget)
//!   │   └── outline → report
//!   └── CompletionHook → terminal snapshot
//! ```
//!
//! Every stage degrades instead of failing: planners and selectors fall
//! back to defaults, extraction failures become findings, and a failed
//! report becomes a sentinel report body.

pub mod budget;
pub mod client;
pub mod config;
pub mod decode;
pub mod expander;
pub mod message;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod request;
pub mod synthesizer;
pub mod tier;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use budget::TokenBudget;
pub use client::{create_provider, create_search_provider};
pub use config::{ResearchConfig, ResearchConfigBuilder};
pub use decode::Decoded;
pub use expander::QueryExpander;
pub use message::{ChatMessage, ChatRequest, ChatResponse, ResponseSchema, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use planner::ParameterPlanner;
pub use progress::{
    ChannelSink, CollectingSink, CompletionHook, ProgressSink, ProgressSnapshot, ResearchStatus,
};
pub use prompt::PromptSet;
pub use provider::{LlmProvider, SearchHit, SearchOptions, SearchProvider, SearchResponse};
pub use request::{ResearchParameters, ResearchRequest, SpeedHint};
pub use synthesizer::{REPORT_ERROR, ReportSynthesizer, is_ranking_query};
pub use tier::{ModelSelector, ModelTier, TierSet, TierSpec};
pub use worker::{Extraction, SearchWorker};
