// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the claude-relay authors

//! The HTTP + WebSocket surface: a thin layer translating
//! REST/WS requests into calls on the Index, Manager, and Bridge, and
//! `ApiError`s into the wire envelope / WS close codes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use relay_adapters::MultiplexerAdapter;
use relay_core::{is_uuid_shaped, strip_tab_prefix, tab_name, ApiError, MultiplexerStatus, SessionId, SessionMetadata};
use serde::{Deserialize, Serialize};

use crate::bridge::TerminalBridge;
use crate::config::Config;
use crate::control::{parse_control_message, ControlMessage};
use crate::index::SessionIndex;
use crate::manager::MultiplexerManager;

/// A session may be attached at most once per this window.
const ATTACH_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(5);

pub struct AppState<A: MultiplexerAdapter> {
    pub index: Mutex<SessionIndex>,
    pub manager: MultiplexerManager<A>,
    pub bridge: Arc<TerminalBridge>,
    pub config: Config,
    pub tab_prefix: String,
    pub started_at: Instant,
    attach_limiter: Mutex<HashMap<SessionId, Instant>>,
}

impl<A: MultiplexerAdapter> AppState<A> {
    pub fn new(index: SessionIndex, manager: MultiplexerManager<A>, bridge: Arc<TerminalBridge>, config: Config, tab_prefix: String) -> Self {
        Self {
            index: Mutex::new(index),
            manager,
            bridge,
            config,
            tab_prefix,
            started_at: Instant::now(),
            attach_limiter: Mutex::new(HashMap::new()),
        }
    }
}

/// Build the full router: `/api/status` and `/terminal/:id` handle their
/// own auth; every other route sits behind the bearer-token middleware.
pub fn router<A: MultiplexerAdapter>(state: Arc<AppState<A>>) -> Router {
    let protected = Router::new()
        .route("/api/sessions", get(list_sessions::<A>))
        .route("/api/sessions/:id", get(get_session::<A>))
        .route("/api/projects", get(list_projects::<A>))
        .route("/api/sessions/:id/attach", post(attach_session::<A>))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware::<A>));

    Router::new()
        .route("/api/status", get(status::<A>))
        .route("/terminal/:id", get(terminal_ws::<A>))
        .merge(protected)
        .with_state(state)
}

/// Equal-length-first, constant-time-over-the-compared-bytes PSK check:
/// unequal-length comparisons are rejected without byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|s| s.to_string())
}

struct ApiErrorRejection(ApiError);

impl From<ApiError> for ApiErrorRejection {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiErrorRejection {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.envelope())).into_response()
    }
}

async fn auth_middleware<A: MultiplexerAdapter>(State(state): State<Arc<AppState<A>>>, req: Request, next: Next) -> Response {
    match extract_bearer(req.headers()) {
        Some(token) if constant_time_eq(token.as_bytes(), state.config.auth_psk.as_bytes()) => next.run(req).await,
        _ => ApiErrorRejection(ApiError::Unauthorized).into_response(),
    }
}

fn compute_status<A: MultiplexerAdapter>(id: &SessionId, tab_names: &HashSet<String>, state: &AppState<A>) -> MultiplexerStatus {
    if state.bridge.has_active(id) {
        MultiplexerStatus::Active
    } else if tab_names.contains(&tab_name(&state.tab_prefix, id)) {
        MultiplexerStatus::Detached
    } else {
        MultiplexerStatus::None
    }
}

async fn current_tab_names<A: MultiplexerAdapter>(state: &AppState<A>) -> Result<HashSet<String>, ApiError> {
    let tabs = state.manager.list_all().await?;
    Ok(tabs.into_iter().map(|t| t.name).collect())
}

#[derive(Debug, Serialize)]
struct StatusTab {
    id: String,
    attached: bool,
    created: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    version: &'static str,
    cli_version: String,
    active_sessions: usize,
    tabs: Vec<StatusTab>,
    uptime_seconds: u64,
}

async fn status<A: MultiplexerAdapter>(State(state): State<Arc<AppState<A>>>) -> Result<Json<StatusResponse>, ApiErrorRejection> {
    let ours = state.manager.list_ours().await.map_err(ApiErrorRejection::from)?;
    let tabs = ours
        .into_iter()
        .map(|t| StatusTab {
            id: strip_tab_prefix(&state.tab_prefix, &t.name)
                .map(|id| id.as_str().to_string())
                .unwrap_or(t.name),
            attached: t.attached,
            created: t.created,
        })
        .collect();

    let cli_version = state
        .index
        .lock()
        .all()
        .into_iter()
        .max_by_key(|m| m.timestamp)
        .map(|m| m.cli_version)
        .unwrap_or_default();

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        cli_version,
        active_sessions: state.bridge.active_count(),
        tabs,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

async fn list_sessions<A: MultiplexerAdapter>(State(state): State<Arc<AppState<A>>>) -> Result<Json<Vec<SessionMetadata>>, ApiErrorRejection> {
    let tab_names = current_tab_names(&state).await?;
    let mut index = state.index.lock();
    let ids: Vec<SessionId> = index.all().into_iter().map(|m| m.id).collect();
    for id in &ids {
        let status = compute_status(id, &tab_names, &state);
        index.set_multiplexer_status(id, status);
    }
    let mut entries = index.all();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(Json(entries))
}

#[derive(Debug, Serialize)]
struct SessionDetail {
    #[serde(flatten)]
    metadata: SessionMetadata,
    has_active_connection: bool,
}

async fn get_session<A: MultiplexerAdapter>(
    State(state): State<Arc<AppState<A>>>,
    Path(id_str): Path<String>,
) -> Result<Json<SessionDetail>, ApiErrorRejection> {
    if !is_uuid_shaped(&id_str) {
        return Err(ApiErrorRejection::from(ApiError::InvalidSessionId));
    }
    let id = SessionId::new(id_str);
    let tab_names = current_tab_names(&state).await?;
    let status = compute_status(&id, &tab_names, &state);

    let mut index = state.index.lock();
    index.set_multiplexer_status(&id, status);
    let metadata = index.get(&id).cloned().ok_or(ApiError::NotFound)?;
    drop(index);

    Ok(Json(SessionDetail {
        metadata,
        has_active_connection: state.bridge.has_active(&id),
    }))
}

async fn list_projects<A: MultiplexerAdapter>(State(state): State<Arc<AppState<A>>>) -> Json<Vec<crate::index::ProjectSummary>> {
    Json(state.index.lock().by_project())
}

#[derive(Debug, Serialize)]
struct AttachResponse {
    ws_url: String,
    tab_name: String,
    existed: bool,
}

async fn attach_session<A: MultiplexerAdapter>(
    State(state): State<Arc<AppState<A>>>,
    Path(id_str): Path<String>,
) -> Result<Json<AttachResponse>, ApiErrorRejection> {
    let id = SessionId::new(id_str);

    {
        let mut limiter = state.attach_limiter.lock();
        let now = Instant::now();
        if let Some(last) = limiter.get(&id) {
            if now.duration_since(*last) < ATTACH_RATE_LIMIT_WINDOW {
                return Err(ApiErrorRejection::from(ApiError::RateLimited));
            }
        }
        limiter.insert(id.clone(), now);
    }

    let outcome = state.manager.attach(&id).await?;
    Ok(Json(AttachResponse {
        ws_url: format!("/terminal/{}", id.as_str()),
        tab_name: outcome.tab_name,
        existed: outcome.existed,
    }))
}

#[derive(Debug, Deserialize)]
struct TerminalQuery {
    cols: Option<u16>,
    rows: Option<u16>,
    token: Option<String>,
}

/// Adapts an axum `WebSocket` to `bridge::TerminalSocket`.
struct AxumTerminalSocket {
    sink: tokio::sync::Mutex<futures_util::stream::SplitSink<WebSocket, Message>>,
    open: std::sync::atomic::AtomicBool,
    pending: std::sync::atomic::AtomicUsize,
}

#[async_trait::async_trait]
impl crate::bridge::TerminalSocket for AxumTerminalSocket {
    async fn send_binary(&self, data: Vec<u8>) {
        use std::sync::atomic::Ordering;
        let len = data.len();
        self.pending.fetch_add(len, Ordering::SeqCst);
        let sent = self.sink.lock().await.send(Message::Binary(data)).await;
        self.pending.fetch_sub(len, Ordering::SeqCst);
        if sent.is_err() {
            self.open.store(false, Ordering::SeqCst);
        }
    }

    async fn send_ping(&self) {
        use std::sync::atomic::Ordering;
        if self.sink.lock().await.send(Message::Ping(Vec::new())).await.is_err() {
            self.open.store(false, Ordering::SeqCst);
        }
    }

    async fn close(&self, code: u16, reason: String) {
        use std::sync::atomic::Ordering;
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };
        let _ = self.sink.lock().await.send(Message::Close(Some(frame))).await;
    }

    fn pending_write_bytes(&self) -> usize {
        self.pending.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn is_open(&self) -> bool {
        self.open.load(std::sync::atomic::Ordering::SeqCst)
    }
}

async fn terminal_ws<A: MultiplexerAdapter>(
    State(state): State<Arc<AppState<A>>>,
    Path(id_str): Path<String>,
    Query(query): Query<TerminalQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_terminal_socket(state, id_str, query, headers, socket))
}

async fn handle_terminal_socket<A: MultiplexerAdapter>(
    state: Arc<AppState<A>>,
    id_str: String,
    query: TerminalQuery,
    headers: HeaderMap,
    socket: WebSocket,
) {
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    let (sink, mut stream) = socket.split();
    let terminal_socket = Arc::new(AxumTerminalSocket {
        sink: tokio::sync::Mutex::new(sink),
        open: AtomicBool::new(true),
        pending: AtomicUsize::new(0),
    });

    let token = query.token.clone().or_else(|| extract_bearer(&headers));
    let authorized = token
        .map(|t| constant_time_eq(t.as_bytes(), state.config.auth_psk.as_bytes()))
        .unwrap_or(false);
    if !authorized {
        terminal_socket.close(ApiError::Unauthorized.ws_close_code(), ApiError::Unauthorized.to_string()).await;
        return;
    }
    if !is_uuid_shaped(&id_str) {
        terminal_socket
            .close(ApiError::InvalidSessionId.ws_close_code(), ApiError::InvalidSessionId.to_string())
            .await;
        return;
    }

    let id = SessionId::new(id_str);
    let cols = query.cols.unwrap_or(state.config.tmux_default_cols);
    let rows = query.rows.unwrap_or(state.config.tmux_default_rows);
    let tab = tab_name(&state.tab_prefix, &id);

    state
        .bridge
        .attach(id.clone(), &tab, terminal_socket as Arc<dyn crate::bridge::TerminalSocket>, cols, rows)
        .await;

    while let Some(frame) = stream.next().await {
        let Ok(message) = frame else { break };
        match message {
            Message::Binary(bytes) => state.bridge.write_input(&id, &bytes),
            Message::Text(text) => {
                if let Some(ControlMessage::Resize { cols, rows }) = parse_control_message(&text) {
                    state.bridge.resize(&id, cols, rows);
                }
            }
            Message::Pong(_) => state.bridge.on_pong(&id),
            Message::Close(_) => break,
            Message::Ping(_) => {}
        }
    }
    state.bridge.close(&id).await;
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
