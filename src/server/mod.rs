//! WebSocket progress server.
//!
//! Exposes research sessions over a persistent socket so progress
//! snapshots reach the client in order.
//!
//! # Routes
//!
//! - `GET /health` returns `ok`.
//! - `GET /ws` upgrades to a WebSocket. The client sends one
//!   [`ResearchRequest`](crate::research::ResearchRequest) as a JSON text
//!   frame; the server streams every
//!   [`ProgressSnapshot`](crate::research::ProgressSnapshot) back as JSON
//!   text frames and closes after the terminal one.

pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tokio_util::sync::CancellationToken;

use crate::research::Orchestrator;
#[cfg(feature = "store")]
use crate::store::ReportStore;

/// Shared state for all connections.
#[derive(Clone)]
pub struct ServerState {
    pub(crate) orchestrator: Arc<Orchestrator>,
    #[cfg(feature = "store")]
    pub(crate) store: Option<Arc<ReportStore>>,
    pub(crate) shutdown: CancellationToken,
}

impl ServerState {
    /// Creates state around a shared orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            #[cfg(feature = "store")]
            store: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Persists every completed report into `store`.
    #[cfg(feature = "store")]
    #[must_use]
    pub fn with_store(mut self, store: Arc<ReportStore>) -> Self {
        self.store = Some(store);
        self
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

/// Builds the HTTP router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Serves until Ctrl-C.
///
/// On shutdown, running sessions are cancelled at their next check and
/// finish with an `ERROR` snapshot.
///
/// # Errors
///
/// Returns an error if the server fails to bind or encounters a runtime error.
pub async fn serve(state: ServerState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "research server listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
