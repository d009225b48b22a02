//! WebSocket session handler.
//!
//! Client -> Server (first text frame, JSON):
//! ```json
//! {"query": "best rust web frameworks", "clarifications": {"for what?": "APIs"}, "speed": "fast"}
//! ```
//!
//! Server -> Client: one JSON text frame per progress snapshot, ending with
//! a `COMPLETED` or `ERROR` snapshot, then a close frame.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use super::ServerState;
use crate::research::{ChannelSink, CompletionHook, ProgressSnapshot, ResearchRequest};

/// Snapshots buffered between the session and the socket writer.
const SNAPSHOT_BUFFER: usize = 32;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one research session over an upgraded socket.
///
/// A writer task forwards snapshots from the session's channel to the
/// socket. A reader task watches for the client going away and cancels
/// the session when it does.
async fn handle_socket(socket: WebSocket, state: ServerState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let request = match read_request(&mut ws_receiver).await {
        Some(Ok(request)) => request,
        Some(Err(message)) => {
            tracing::warn!(%message, "rejected WebSocket research request");
            let snapshot = ProgressSnapshot::failed(message, Vec::new(), Vec::new());
            let _ = send_snapshot(&mut ws_sender, &snapshot).await;
            let _ = ws_sender.send(Message::Close(None)).await;
            return;
        }
        None => return,
    };

    let cancel = state.shutdown.child_token();
    let (sink, mut rx) = ChannelSink::channel(SNAPSHOT_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            if send_snapshot(&mut ws_sender, &snapshot).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    let disconnect = cancel.clone();
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
        disconnect.cancel();
    });

    #[cfg(feature = "store")]
    let hook = state
        .store
        .as_ref()
        .map(|store| store.hook(request.query.trim()));
    #[cfg(feature = "store")]
    let hook_ref = hook.as_ref().map(|h| h as &dyn CompletionHook);
    #[cfg(not(feature = "store"))]
    let hook_ref: Option<&dyn CompletionHook> = None;

    let terminal = state
        .orchestrator
        .run_research_until(&request, &sink, hook_ref, &cancel)
        .await;
    tracing::debug!(status = ?terminal.status, "WebSocket session finished");

    drop(sink);
    let _ = writer.await;
    reader.abort();
}

/// Waits for the first text frame and decodes it as a request.
///
/// Returns `None` if the client closes first.
async fn read_request(
    receiver: &mut SplitStream<WebSocket>,
) -> Option<Result<ResearchRequest, String>> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                return Some(
                    serde_json::from_str::<ResearchRequest>(text.as_str())
                        .map_err(|e| format!("Invalid research request: {e}")),
                );
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    snapshot: &ProgressSnapshot,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(snapshot).unwrap_or_default();
    sender.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as ClientMessage;

    use super::super::router;
    use super::*;
    use crate::research::testing::{ScriptedLlm, ScriptedSearch, Stage};
    use crate::research::{Orchestrator, PromptSet, ResearchConfig, ResearchStatus, TokenBudget};

    fn state() -> ServerState {
        let config = ResearchConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let llm = Arc::new(ScriptedLlm::routed(|stage, _| match stage {
            Stage::Planner => Ok(r#"{"breadth": 2, "depth": 1}"#.to_string()),
            Stage::Selector => Ok(r#"{"tier": "fast"}"#.to_string()),
            Stage::Report | Stage::RankedReport => Ok("# Report".to_string()),
            _ => Ok("- finding".to_string()),
        }));
        let budget = Arc::new(TokenBudget::without_tokenizer(config.tiers.clone()));
        let orchestrator = Orchestrator::with_components(
            llm,
            Arc::new(ScriptedSearch::echo()),
            &config,
            &PromptSet::defaults(),
            budget,
        );
        ServerState::new(Arc::new(orchestrator))
    }

    async fn spawn_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|_| unreachable!());
        let addr = listener.local_addr().unwrap_or_else(|_| unreachable!());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(state())).await;
        });
        addr
    }

    async fn exchange(addr: std::net::SocketAddr, frame: &str) -> Vec<ProgressSnapshot> {
        let (mut socket, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap_or_else(|_| unreachable!());
        socket
            .send(ClientMessage::Text(frame.to_string().into()))
            .await
            .unwrap_or_else(|_| unreachable!());

        let mut snapshots = Vec::new();
        while let Some(Ok(msg)) = socket.next().await {
            match msg {
                ClientMessage::Text(text) => snapshots.push(
                    serde_json::from_str(text.as_str()).unwrap_or_else(|_| unreachable!()),
                ),
                ClientMessage::Close(_) => break,
                _ => {}
            }
        }
        snapshots
    }

    #[tokio::test]
    async fn test_ws_streams_session() {
        let addr = spawn_server().await;
        let snapshots = exchange(addr, r#"{"query": "capital of France"}"#).await;

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].status, ResearchStatus::InProgress);
        assert_eq!(snapshots[1].progress, 1);
        let terminal = &snapshots[2];
        assert_eq!(terminal.status, ResearchStatus::Completed);
        assert_eq!(terminal.report.as_deref(), Some("# Report"));
        assert_eq!(terminal.total_progress, 2);
    }

    #[tokio::test]
    async fn test_ws_malformed_request() {
        let addr = spawn_server().await;
        let snapshots = exchange(addr, "not json").await;

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].status, ResearchStatus::Error);
        assert!(
            snapshots[0]
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("Invalid research request"))
        );
    }

    #[tokio::test]
    async fn test_health() {
        let addr = spawn_server().await;
        let body = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap_or_else(|_| unreachable!())
            .text()
            .await
            .unwrap_or_default();
        assert_eq!(body, "ok");
    }
}
