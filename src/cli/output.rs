//! Output formatting for CLI commands.
//!
//! Every command renders into a `String`; `main` decides where it goes.

use std::fmt::Write as _;

use serde::Serialize;

use crate::research::{ModelTier, ProgressSnapshot, ResearchParameters, ResearchStatus};
#[cfg(feature = "store")]
use crate::store::{ReportSummary, StoredReport};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON; streamed commands emit one object per line.
    Json,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "ndjson" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes a value as pretty JSON followed by a newline.
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        match serde_json::to_string_pretty(value) {
            Ok(json) => format!("{json}\n"),
            Err(e) => format!("{{\"error\": \"{e}\"}}\n"),
        }
    }
}

/// Renders one snapshot as a single progress line for stderr.
#[must_use]
pub fn format_progress_line(snapshot: &ProgressSnapshot) -> String {
    match snapshot.status {
        ResearchStatus::InProgress => format!(
            "[{}/{}] {} ({} findings, {} sources)",
            snapshot.progress,
            snapshot.total_progress,
            snapshot.current_query.as_deref().unwrap_or(""),
            snapshot.learnings.len(),
            snapshot.visited_urls.len(),
        ),
        ResearchStatus::Completed => format!(
            "[{}/{}] completed with {} findings from {} sources",
            snapshot.progress,
            snapshot.total_progress,
            snapshot.learnings.len(),
            snapshot.visited_urls.len(),
        ),
        ResearchStatus::Error => format!(
            "error: {}",
            snapshot.error.as_deref().unwrap_or("unknown error")
        ),
        ResearchStatus::Waiting => "waiting".to_string(),
    }
}

/// Formats the output of `plan`.
#[must_use]
pub fn format_plan(
    query: &str,
    params: ResearchParameters,
    tier: ModelTier,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format!(
            "Query:   {query}\nBreadth: {}\nDepth:   {}\nQueries: {}\nTier:    {}\n",
            params.breadth,
            params.depth,
            params.total(),
            tier.as_str(),
        ),
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "query": query,
            "breadth": params.breadth,
            "depth": params.depth,
            "totalProgress": params.total(),
            "tier": tier.as_str(),
        })),
    }
}

/// Formats the report listing.
#[cfg(feature = "store")]
#[must_use]
pub fn format_report_list(reports: &[ReportSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if reports.is_empty() {
                return "No saved reports.\n".to_string();
            }
            let mut output = String::new();
            let _ = writeln!(output, "{:>5}  {:<20}  {:>7}  QUERY", "ID", "CREATED", "SOURCES");
            for report in reports {
                let _ = writeln!(
                    output,
                    "{:>5}  {:<20}  {:>7}  {}",
                    report.id,
                    report.created_at,
                    report.url_count,
                    truncate_line(&report.query, 60),
                );
            }
            output
        }
        OutputFormat::Json => format.to_json(reports),
    }
}

/// Formats one stored report.
#[cfg(feature = "store")]
#[must_use]
pub fn format_report(report: &StoredReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = format!(
                "# Report {} ({})\n\nQuery: {}\n\n{}\n",
                report.id,
                report.created_at,
                report.query,
                report.report.trim_end(),
            );
            if !report.urls.is_empty() {
                output.push_str("\nSources:\n");
                for url in &report.urls {
                    let _ = writeln!(output, "- {url}");
                }
            }
            output
        }
        OutputFormat::Json => format.to_json(report),
    }
}

/// First line of `s`, shortened to `max` characters.
fn truncate_line(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or("");
    if line.chars().count() <= max {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("NDJSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_progress_line() {
        let snapshot = ProgressSnapshot::in_progress(
            "rust web frameworks",
            &["axum is popular".to_string()],
            &[],
            1,
            8,
        );
        assert_eq!(
            format_progress_line(&snapshot),
            "[1/8] rust web frameworks (1 findings, 0 sources)"
        );

        let failed = ProgressSnapshot::failed("Research cancelled".to_string(), Vec::new(), Vec::new());
        assert_eq!(format_progress_line(&failed), "error: Research cancelled");
    }

    #[test]
    fn test_plan_text_and_json() {
        let params = ResearchParameters { breadth: 3, depth: 2 };
        let text = format_plan("q", params, ModelTier::Deep, OutputFormat::Text);
        assert!(text.contains("Breadth: 3"));
        assert!(text.contains("Queries: 6"));
        assert!(text.contains("Tier:    deep"));

        let json = format_plan("q", params, ModelTier::Fast, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(value["totalProgress"], 6);
        assert_eq!(value["tier"], "fast");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("short", 10), "short");
        assert_eq!(truncate_line("first\nsecond", 10), "first");
        assert_eq!(truncate_line("abcdefghijkl", 8), "abcde...");
    }

    #[cfg(feature = "store")]
    #[test]
    fn test_report_list_empty() {
        assert_eq!(format_report_list(&[], OutputFormat::Text), "No saved reports.\n");
        assert_eq!(format_report_list(&[], OutputFormat::Json), "[]\n");
    }
}
