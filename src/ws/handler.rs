//! WebSocket upgrade handler and per-connection session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{
    validate_match_config, MatchCancel, MatchEngine, MatchEvent, MatchHandle, MatchNotifier,
};
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ErrorCode, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMsg>();

    // Writer task: session + match events -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut session = Session::new(session_id, state, out_tx);
    session.send(ServerMsg::Welcome {
        session_id,
        server_time: unix_millis(),
    });

    // Reader loop: WebSocket -> session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => session.handle_text(&text),
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // The match winds down on its own once cancelled
    drop(session.close());
    writer_handle.abort();

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

/// Forwards match events to the owning session, tagged with the match id
struct SessionNotifier {
    match_id: Uuid,
    tx: mpsc::UnboundedSender<ServerMsg>,
}

impl MatchNotifier for SessionNotifier {
    fn notify(&self, event: MatchEvent) {
        let _ = self.tx.send(ServerMsg::MatchEvent {
            match_id: self.match_id,
            event,
        });
    }
}

struct ActiveMatch {
    id: Uuid,
    cancel: MatchCancel,
    task: JoinHandle<()>,
}

impl ActiveMatch {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// One connected client. Runs at most one match at a time.
struct Session {
    id: Uuid,
    state: AppState,
    out: mpsc::UnboundedSender<ServerMsg>,
    limiter: SessionRateLimiter,
    active: Option<ActiveMatch>,
}

impl Session {
    fn new(id: Uuid, state: AppState, out: mpsc::UnboundedSender<ServerMsg>) -> Self {
        Self {
            id,
            state,
            out,
            limiter: SessionRateLimiter::new(),
            active: None,
        }
    }

    fn send(&self, msg: ServerMsg) {
        let _ = self.out.send(msg);
    }

    fn handle_text(&mut self, text: &str) {
        if !self.limiter.check_message() {
            warn!(session_id = %self.id, "Rate limited session message");
            self.send(ServerMsg::error(
                ErrorCode::RateLimited,
                "too many messages, slow down",
            ));
            return;
        }

        match serde_json::from_str::<ClientMsg>(text) {
            Ok(ClientMsg::Ping { t }) => self.send(ServerMsg::Pong { t }),
            Ok(ClientMsg::StartMatch { config }) => self.start_match(config),
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Failed to parse client message");
                self.send(ServerMsg::error(ErrorCode::MalformedMessage, e.to_string()));
            }
        }
    }

    fn start_match(&mut self, payload: Value) {
        if let Some(active) = self.active.as_ref().filter(|m| m.is_running()) {
            self.send(ServerMsg::error(
                ErrorCode::MatchAlreadyRunning,
                format!("match {} is still running", active.id),
            ));
            return;
        }

        let config = match validate_match_config(&payload) {
            Ok(config) => config,
            Err(e) => {
                info!(session_id = %self.id, error = %e, "Rejected match configuration");
                self.send(ServerMsg::Error {
                    code: ErrorCode::InvalidMatchConfiguration,
                    message: e.to_string(),
                    details: serde_json::to_value(e.violations()).ok(),
                });
                return;
            }
        };

        let match_id = Uuid::new_v4();
        let notifier = SessionNotifier {
            match_id,
            tx: self.out.clone(),
        };
        let mut engine =
            MatchEngine::new(config, self.state.transport.clone(), notifier).with_id(match_id);
        let cancel = engine.cancel_handle();

        self.state.match_registry.insert(MatchHandle {
            id: match_id,
            session_id: self.id,
            started_at: unix_millis(),
            progress: engine.progress(),
            cancel: cancel.clone(),
        });

        self.send(ServerMsg::MatchAccepted {
            match_id,
            seed: engine.seed(),
        });

        let registry = self.state.match_registry.clone();
        let session_id = self.id;
        let task = tokio::spawn(async move {
            match engine.start().await {
                Ok(result) => {
                    debug!(session_id = %session_id, match_id = %match_id, outcome = ?result.outcome, "Match task finished");
                }
                Err(e) => {
                    warn!(session_id = %session_id, match_id = %match_id, error = %e, "Match did not finish");
                }
            }
            registry.remove(&match_id);
        });

        self.active = Some(ActiveMatch {
            id: match_id,
            cancel,
            task,
        });
    }

    /// Stop the running match at its next tick boundary. Returns its task.
    fn close(&mut self) -> Option<JoinHandle<()>> {
        let active = self.active.take()?;
        if active.is_running() {
            info!(session_id = %self.id, match_id = %active.id, "Cancelling match of closed session");
            active.cancel.cancel();
        }
        Some(active.task)
    }
}
