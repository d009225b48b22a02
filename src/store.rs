//! SQLite persistence for finished reports.
//!
//! [`ReportStore`] keeps one row per completed session. Its
//! [`hook`](ReportStore::hook) adapts the store into a
//! [`CompletionHook`] so the orchestrator can persist reports without
//! knowing about storage.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::{ResearchError, StorageError};
use crate::research::progress::CompletionHook;

/// Default database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".research/reports.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS reports (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    query       TEXT NOT NULL,
    report      TEXT NOT NULL,
    urls        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at);
";

/// A persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredReport {
    /// Row id.
    pub id: i64,
    /// The research question.
    pub query: String,
    /// Markdown report.
    pub report: String,
    /// Source URLs in visit order.
    pub urls: Vec<String>,
    /// UTC timestamp, RFC 3339.
    pub created_at: String,
}

/// Listing entry without the report body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Row id.
    pub id: i64,
    /// The research question.
    pub query: String,
    /// Number of source URLs.
    pub url_count: usize,
    /// UTC timestamp, RFC 3339.
    pub created_at: String,
}

/// SQLite-backed report store.
pub struct ReportStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ReportStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Database(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "opened report store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Resolves the database path: explicit → `RESEARCH_DB_PATH` → default.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("RESEARCH_DB_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }

    /// Database file path, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Saves a report and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn save(&self, query: &str, report: &str, urls: &[String]) -> Result<i64, StorageError> {
        let urls = serde_json::to_string(urls).map_err(|e| StorageError::Database(e.to_string()))?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO reports (query, report, urls) VALUES (?1, ?2, ?3)",
            params![query, report, urls],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, query, "saved report");
        Ok(id)
    }

    /// Loads one report.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReportNotFound`] for an unknown id.
    pub fn get(&self, id: i64) -> Result<StoredReport, StorageError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let row = conn
            .query_row(
                "SELECT id, query, report, urls, created_at FROM reports WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let (id, query, report, urls, created_at) =
            row.ok_or(StorageError::ReportNotFound { id })?;
        Ok(StoredReport {
            id,
            query,
            report,
            urls: decode_urls(&urls),
            created_at,
        })
    }

    /// Lists reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] on SQLite failure.
    pub fn list(&self) -> Result<Vec<ReportSummary>, StorageError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT id, query, urls, created_at FROM reports ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ReportSummary {
                id: row.get(0)?,
                query: row.get(1)?,
                url_count: decode_urls(&row.get::<_, String>(2)?).len(),
                created_at: row.get(3)?,
            })
        })?;
        let reports = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    /// Returns a completion hook that saves reports under `query`.
    #[must_use]
    pub fn hook(self: &Arc<Self>, query: impl Into<String>) -> ReportHook {
        ReportHook {
            store: Arc::clone(self),
            query: query.into(),
        }
    }
}

impl std::fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn decode_urls(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Completion hook persisting into a [`ReportStore`].
#[derive(Debug, Clone)]
pub struct ReportHook {
    store: Arc<ReportStore>,
    query: String,
}

#[async_trait]
impl CompletionHook for ReportHook {
    async fn on_complete(&self, report: &str, urls: &[String]) -> Result<(), ResearchError> {
        let store = Arc::clone(&self.store);
        let query = self.query.clone();
        let report = report.to_string();
        let urls = urls.to_vec();

        // SQLite writes block; keep them off the async worker threads.
        let id = tokio::task::spawn_blocking(move || store.save(&query, &report, &urls))
            .await
            .map_err(|e| ResearchError::Hook {
                message: format!("report save task failed: {e}"),
            })?
            .map_err(|e| ResearchError::Hook {
                message: e.to_string(),
            })?;
        tracing::info!(id, "report saved");
        Ok(())
    }
}
