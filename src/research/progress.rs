//! Progress snapshots and the collaborators that receive them.
//!
//! A [`ProgressSnapshot`] is a complete, self-contained view of a session.
//! Sessions push snapshots, in order, into a [`ProgressSink`] and hand the
//! finished report to an optional [`CompletionHook`].

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ResearchError;

/// Session status on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResearchStatus {
    /// Accepted but not started. Never emitted by the orchestrator.
    Waiting,
    /// Rounds are running.
    InProgress,
    /// The report is ready.
    Completed,
    /// The session ended with an error.
    Error,
}

impl ResearchStatus {
    /// Returns `true` for `COMPLETED` and `ERROR`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One progress emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Session status.
    pub status: ResearchStatus,
    /// Query about to run, while in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_query: Option<String>,
    /// Findings gathered so far.
    pub learnings: Vec<String>,
    /// Queries started so far.
    pub progress: u32,
    /// `breadth * depth` for the session.
    pub total_progress: u32,
    /// Error message for `ERROR` snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final markdown report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Source URLs gathered so far.
    pub visited_urls: Vec<String>,
}

impl ProgressSnapshot {
    /// An `IN_PROGRESS` snapshot.
    #[must_use]
    pub fn in_progress(
        current_query: &str,
        learnings: &[String],
        visited_urls: &[String],
        progress: u32,
        total_progress: u32,
    ) -> Self {
        Self {
            status: ResearchStatus::InProgress,
            current_query: Some(current_query.to_string()),
            learnings: learnings.to_vec(),
            progress,
            total_progress,
            error: None,
            report: None,
            visited_urls: visited_urls.to_vec(),
        }
    }

    /// The terminal `COMPLETED` snapshot.
    #[must_use]
    pub const fn completed(
        report: String,
        learnings: Vec<String>,
        visited_urls: Vec<String>,
        total_progress: u32,
    ) -> Self {
        Self {
            status: ResearchStatus::Completed,
            current_query: None,
            learnings,
            progress: total_progress,
            total_progress,
            error: None,
            report: Some(report),
            visited_urls,
        }
    }

    /// A terminal `ERROR` snapshot for a session that could not finish.
    ///
    /// Progress is reset to `0 / 1`; gathered learnings and URLs are kept.
    #[must_use]
    pub const fn failed(message: String, learnings: Vec<String>, visited_urls: Vec<String>) -> Self {
        Self {
            status: ResearchStatus::Error,
            current_query: None,
            learnings,
            progress: 0,
            total_progress: 1,
            error: Some(message),
            report: None,
            visited_urls,
        }
    }

    /// Turns a `COMPLETED` snapshot into an `ERROR` one, keeping the report.
    #[must_use]
    pub fn with_error(mut self, message: String) -> Self {
        self.status = ResearchStatus::Error;
        self.error = Some(message);
        self
    }

    /// Returns `true` for `COMPLETED` and `ERROR` snapshots.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Ordered receiver of progress snapshots.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Delivers one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Sink`] when the consumer is gone.
    async fn send(&self, snapshot: ProgressSnapshot) -> Result<(), ResearchError>;
}

/// Receives the final report and URLs once synthesis is done.
#[async_trait]
pub trait CompletionHook: Send + Sync {
    /// Handles the finished report.
    ///
    /// # Errors
    ///
    /// Any error is reported to the session's sink as an `ERROR` snapshot.
    async fn on_complete(&self, report: &str, urls: &[String]) -> Result<(), ResearchError>;
}

/// Forwards snapshots into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressSnapshot>,
}

impl ChannelSink {
    /// Wraps a sender.
    #[must_use]
    pub const fn new(tx: mpsc::Sender<ProgressSnapshot>) -> Self {
        Self { tx }
    }

    /// Creates a bounded channel and its sink.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressSnapshot>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn send(&self, snapshot: ProgressSnapshot) -> Result<(), ResearchError> {
        self.tx.send(snapshot).await.map_err(|_| ResearchError::Sink {
            message: "progress receiver dropped".to_string(),
        })
    }
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshots received so far.
    #[must_use]
    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProgressSink for CollectingSink {
    async fn send(&self, snapshot: ProgressSnapshot) -> Result<(), ResearchError> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
        Ok(())
    }
}
