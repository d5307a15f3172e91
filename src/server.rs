//! HTTP/WebSocket surface: router construction, the `/ws` upgrade handler
//! with its pre-upgrade admission validation, and the ambient `/health`
//! and `/users` endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::registry::validate_name;
use crate::session;
use crate::state::GatewayState;

pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade_handler))
        .route("/health", get(health_handler))
        .route("/users", get(users_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    connections: usize,
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        connections: state.connected_count(),
    })
}

#[derive(Serialize)]
struct UserSummary {
    username: String,
    status: u8,
}

async fn users_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let users: Vec<UserSummary> = state
        .core
        .read()
        .registry
        .snapshot()
        .into_iter()
        .map(|(username, status)| UserSummary {
            username,
            status: status.to_byte(),
        })
        .collect();
    Json(users)
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let name = params.get("name").cloned().unwrap_or_default();

    if validate_name(&name).is_err() {
        return (axum::http::StatusCode::BAD_REQUEST, "invalid name").into_response();
    }

    // Admission happens here, synchronously, before the 101 response is
    // sent — not inside the post-upgrade task — so a second request for
    // the same name arriving immediately after is reliably rejected
    // rather than racing the first connection's own registration.
    let (out_tx, out_rx) = tokio::sync::mpsc::unbounded_channel();
    if let Err(err) = session::on_open(&state, &name, Some(addr.ip()), out_tx.clone()) {
        tracing::warn!(user = %name, error = %err, "rejected connection");
        return (axum::http::StatusCode::BAD_REQUEST, "user already connected").into_response();
    }
    tracing::info!(user = %name, remote_ip = %addr.ip(), "user connected");

    ws.on_upgrade(move |socket| handle_connection(socket, state, name, out_tx, out_rx))
        .into_response()
}

async fn handle_connection(
    socket: axum::extract::ws::WebSocket,
    state: Arc<GatewayState>,
    username: String,
    conn: crate::registry::ConnHandle,
    out_rx: tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
) {
    let mut inbound = crate::ws::spawn_pump(socket, out_rx);

    while let Some(frame) = inbound.recv().await {
        if let Some(reply) = session::on_message(&state, &conn, &frame) {
            let _ = conn.send(reply);
        }
    }

    session::on_close(&state, &username);
    tracing::info!(user = %username, "user disconnected");
}
