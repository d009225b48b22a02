//! Research request and planned session parameters.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::ResearchError;

/// Maximum accepted query length in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Valid breadth range.
pub const BREADTH_RANGE: (u32, u32) = (2, 10);
/// Valid depth range.
pub const DEPTH_RANGE: (u32, u32) = (1, 5);

/// User preference for how long a session should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedHint {
    /// Favor a short session.
    Fast,
    /// No strong preference.
    Balanced,
    /// Favor coverage over time.
    Thorough,
}

impl SpeedHint {
    /// Parses a hint name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Some(Self::Fast),
            "balanced" => Some(Self::Balanced),
            "thorough" => Some(Self::Thorough),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }

    pub(crate) const fn guidance(self) -> &'static str {
        match self {
            Self::Fast => "keep breadth and depth near the low end of their ranges",
            Self::Balanced => "pick breadth and depth proportionate to the question",
            Self::Thorough => "lean towards more queries per round and more rounds",
        }
    }
}

impl std::str::FromStr for SpeedHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown speed '{s}' (fast, balanced, thorough)"))
    }
}

/// One research question with optional context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// The question to research.
    pub query: String,
    /// Answers to clarifying questions, keyed by question.
    #[serde(default)]
    pub clarifications: BTreeMap<String, String>,
    /// Optional speed preference.
    #[serde(default)]
    pub speed: Option<SpeedHint>,
}

impl ResearchRequest {
    /// Creates a request with no clarifications or speed hint.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            clarifications: BTreeMap::new(),
            speed: None,
        }
    }

    /// Adds a clarification answer.
    #[must_use]
    pub fn clarify(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.clarifications.insert(question.into(), answer.into());
        self
    }

    /// Sets the speed hint.
    #[must_use]
    pub const fn with_speed(mut self, speed: SpeedHint) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Returns the query followed by each clarification as a `Q:`/`A:` pair.
    #[must_use]
    pub fn full_query(&self) -> String {
        let mut full = self.query.trim().to_string();
        for (question, answer) in &self.clarifications {
            let _ = write!(full, "\nQ: {question}\nA: {answer}");
        }
        full
    }

    /// Rejects empty and oversized queries.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Orchestration`] describing the problem.
    pub fn validate(&self) -> Result<(), ResearchError> {
        if self.query.trim().is_empty() {
            return Err(ResearchError::Orchestration {
                message: "Query cannot be empty".to_string(),
            });
        }
        if self.query.len() > MAX_QUERY_LEN {
            return Err(ResearchError::Orchestration {
                message: format!(
                    "Query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                    self.query.len()
                ),
            });
        }
        Ok(())
    }
}

/// Breadth and depth of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchParameters {
    /// Queries processed per round.
    pub breadth: u32,
    /// Number of rounds.
    pub depth: u32,
}

impl Default for ResearchParameters {
    fn default() -> Self {
        Self {
            breadth: 4,
            depth: 2,
        }
    }
}

impl ResearchParameters {
    /// Rounds and clamps raw planner values into their valid ranges.
    ///
    /// Returns `None` when either value is not finite.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_raw(breadth: f64, depth: f64) -> Option<Self> {
        let clamp = |v: f64, (lo, hi): (u32, u32)| -> Option<u32> {
            v.is_finite()
                .then(|| v.round().clamp(f64::from(lo), f64::from(hi)) as u32)
        };
        Some(Self {
            breadth: clamp(breadth, BREADTH_RANGE)?,
            depth: clamp(depth, DEPTH_RANGE)?,
        })
    }

    /// Total number of query slots, `breadth * depth`.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.breadth * self.depth
    }
}
