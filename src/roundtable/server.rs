//! HTTP and WebSocket transport over [`AnalysisService`].
//!
//! Only compiled with the `server` feature.
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /start_analysis` | form field `company_name`; returns `{"session_id": ...}` |
//! | `GET /check_session/{session_id}` | polling fallback: status, subject, summary once complete |
//! | `GET /debug/sessions` | sanitized session listing, 403 unless debug routes are on |
//! | `GET /ws/{session_id}` | WebSocket: a `session_data` frame, then the session's events |
//!
//! Every WebSocket frame is a JSON text frame shaped `{"event": ..., "data": {...}}`.

use crate::client_wrapper::{ClientWrapper, SendError};
use crate::roundtable::config::RoundtableConfig;
use crate::roundtable::error::RoundtableError;
use crate::roundtable::event::EventBus;
use crate::roundtable::orchestration::AnalysisService;
use crate::roundtable::search::SearchProvider;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    service: AnalysisService,
    bus: Arc<EventBus>,
    debug_routes: bool,
}

impl AppState {
    /// `service` must publish to `bus`, otherwise WebSocket clients see no events.
    pub fn new(service: AnalysisService, bus: Arc<EventBus>) -> Self {
        Self {
            service,
            bus,
            debug_routes: false,
        }
    }

    /// Build a service whose events go to a fresh bus sized from `config`.
    pub fn wired(
        client: Arc<dyn ClientWrapper>,
        search: Arc<dyn SearchProvider>,
        config: RoundtableConfig,
    ) -> Self {
        let bus = Arc::new(EventBus::new(config.event_buffer));
        let service = AnalysisService::new(client, search)
            .with_config(config)
            .with_event_handler(bus.clone());
        Self::new(service, bus)
    }

    pub fn with_debug_routes(mut self, enabled: bool) -> Self {
        self.debug_routes = enabled;
        self
    }

    pub fn service(&self) -> &AnalysisService {
        &self.service
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}

#[derive(Debug, Deserialize)]
struct StartForm {
    #[serde(default)]
    company_name: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start_analysis", post(start_analysis))
        .route("/check_session/{session_id}", get(check_session))
        .route("/debug/sessions", get(debug_sessions))
        .route("/ws/{session_id}", get(session_socket))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), SendError> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Roundtable server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn start_analysis(State(state): State<AppState>, Form(form): Form<StartForm>) -> Response {
    let subject = form.company_name.unwrap_or_default();
    match state.service.start_analysis(&subject) {
        Ok(handle) => {
            (StatusCode::OK, Json(json!({"session_id": handle.session_id()}))).into_response()
        }
        Err(RoundtableError::InvalidRequest(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Company name is required"})),
        )
            .into_response(),
        Err(err) => {
            log::error!("Error starting analysis: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to start analysis. Please try again."})),
            )
                .into_response()
        }
    }
}

async fn check_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.service.check_session(&session_id) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(RoundtableError::SessionNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Session not found", "status": "error"})),
        )
            .into_response(),
        Err(err) => {
            log::error!("Error checking session status: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to check session status", "status": "error"})),
            )
                .into_response()
        }
    }
}

async fn debug_sessions(State(state): State<AppState>) -> Response {
    if !state.debug_routes {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Debug endpoints only available in debug mode"})),
        )
            .into_response();
    }
    let sessions = state.service.list_sessions();
    (
        StatusCode::OK,
        Json(json!({
            "active_sessions_count": sessions.len(),
            "sessions": sessions,
        })),
    )
        .into_response()
}

async fn session_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| stream_session(socket, state, session_id))
}

async fn stream_session(mut socket: WebSocket, state: AppState, session_id: String) {
    log::info!("Client connected for session {}", session_id);
    // subscribe before the snapshot so nothing falls between the two
    let mut events = state.bus.subscribe_session(session_id.clone());

    let snapshot = match state.service.session_data(&session_id) {
        Ok(session) => json!({"event": "session_data", "data": session}),
        Err(_) => {
            log::warn!("Requested data for nonexistent session: {}", session_id);
            let _ = send_json(
                &mut socket,
                &json!({"event": "error", "data": {"error": "Session not found or expired"}}),
            )
            .await;
            return;
        }
    };
    if send_json(&mut socket, &snapshot).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
            event = events.recv() => match event {
                Ok(Some(event)) => {
                    let frame = match serde_json::to_value(&event) {
                        Ok(frame) => frame,
                        Err(err) => {
                            log::error!("Could not serialize {} event: {}", event.name(), err);
                            continue;
                        }
                    };
                    if send_json(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(skipped) => {
                    log::warn!("Session {} subscriber lagged, {} events dropped", session_id, skipped);
                }
            },
        }
    }
    log::info!("Client disconnected from session {}", session_id);
}

async fn send_json(socket: &mut WebSocket, value: &Value) -> Result<(), axum::Error> {
    socket
        .send(WsMessage::Text(value.to_string().into()))
        .await
}
