//! Error types for research-rs.
//!
//! [`ResearchError`] covers everything the research pipeline can hit when
//! talking to external providers. Most of these never cross the
//! `run_research` boundary: the pipeline degrades them into sentinel text
//! or an ERROR progress snapshot. [`Error`] is the crate-wide error used by
//! the CLI and the report store.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Research pipeline or provider failure.
    #[error(transparent)]
    Research(#[from] ResearchError),

    /// Report storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by providers and pipeline stages.
#[derive(Debug, Error)]
pub enum ResearchError {
    /// No LLM API key was configured.
    #[error("API key missing: set OPENAI_API_KEY or RESEARCH_API_KEY")]
    ApiKeyMissing,

    /// No search API key was configured.
    #[error("search API key missing: set FIRECRAWL_API_KEY or RESEARCH_SEARCH_API_KEY")]
    SearchKeyMissing,

    /// Provider name has no implementation.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// The configured provider name.
        name: String,
    },

    /// An API request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error description.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The search request could not be completed.
    #[error("search failed: {message}")]
    Search {
        /// Error description.
        message: String,
    },

    /// A provider returned a body that does not match the expected shape.
    #[error("invalid provider response: {message}")]
    InvalidResponse {
        /// What was wrong with the body.
        message: String,
    },

    /// Model output could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// Error description.
        message: String,
        /// Raw response content.
        content: String,
    },

    /// An operation exceeded its time bound.
    #[error("{operation} timed out after {secs}s")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Bound in seconds.
        secs: u64,
    },

    /// The session was cancelled by its caller.
    #[error("Research cancelled")]
    Cancelled,

    /// A progress snapshot could not be delivered.
    #[error("progress delivery failed: {message}")]
    Sink {
        /// Error description.
        message: String,
    },

    /// The completion hook reported a failure.
    #[error("completion hook failed: {message}")]
    Hook {
        /// Error description.
        message: String,
    },

    /// Any other pipeline failure.
    #[error("{message}")]
    Orchestration {
        /// Error description.
        message: String,
    },
}

/// Errors from the SQLite report store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(String),

    /// No report with the given id.
    #[error("report not found: {id}")]
    ReportNotFound {
        /// Requested report id.
        id: i64,
    },
}

#[cfg(feature = "store")]
impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Errors from CLI command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command failed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// An argument was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be formatted.
    #[error("output format error: {0}")]
    OutputFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResearchError::Timeout {
            operation: "search",
            secs: 30,
        };
        assert_eq!(err.to_string(), "search timed out after 30s");
        assert_eq!(ResearchError::Cancelled.to_string(), "Research cancelled");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ResearchError::ApiKeyMissing.into();
        assert!(matches!(err, Error::Research(ResearchError::ApiKeyMissing)));

        let err: Error = StorageError::ReportNotFound { id: 7 }.into();
        assert_eq!(err.to_string(), "report not found: 7");
    }
}
