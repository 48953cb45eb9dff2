// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/WS surface (§6). The full REST API is out of scope by
//! design; this exists to demonstrate the auth middleware boundary and
//! upgrade `/ws` into a hub subscriber session, and to give integration
//! tests something to drive end to end.

use crate::app::App;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use ccp_auth::Capability;
use ccp_core::ErrorResponse;
use ccp_hub::{ClientFrame, ServerFrame, OUTBOUND_QUEUE_DEPTH};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

pub fn build_router(app: Arc<App>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn ws_upgrade(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let principal = match authenticate(&app, &headers).await {
        Ok(p) => p,
        Err(response) => return response,
    };
    if !principal.can(Capability::Subscribe) {
        return error_response(ccp_core::CoreError::Forbidden);
    }
    ws.on_upgrade(move |socket| handle_socket(app, socket))
}

async fn authenticate(
    app: &Arc<App>,
    headers: &HeaderMap,
) -> Result<ccp_auth::Principal, Response> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(bearer) = bearer else {
        return Err(error_response(ccp_core::CoreError::Unauthenticated));
    };
    app.authenticator.authenticate(bearer).await.map_err(error_response)
}

fn error_response(err: ccp_core::CoreError) -> Response {
    let body = ErrorResponse::from(&err);
    let status = StatusCode::from_u16(err.code().status_class()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

/// Per-connection loop: register with the hub, forward outbound frames to
/// the socket, forward inbound client frames to the hub. Exits on socket
/// close from either side, always unregistering from the hub.
async fn handle_socket(app: Arc<App>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerFrame>(OUTBOUND_QUEUE_DEPTH);

    let id = match app.hub.register(outbound_tx).await {
        Ok(id) => id,
        Err(err) => {
            warn!(%err, "websocket rejected at hub registration");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let Ok(text) = serde_json::to_string(&frame) else { continue };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(ClientFrame::Subscribe { interests }) => app.hub.set_interests(id, interests),
                Ok(ClientFrame::Pong { .. }) => app.hub.record_pong(id),
                Err(err) => {
                    debug!(%err, "malformed client frame");
                    app.hub.record_violation(id).await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    app.hub.unregister(id).await;
    writer.abort();
}
