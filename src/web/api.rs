use axum::{
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use super::AppState;
use crate::types::Frequency;

// === Dashboard Data ===

pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.view().await)
}

// === Controls ===

pub async fn post_toggle(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.handle_start_stop().await {
        Ok(running) => (
            StatusCode::OK,
            Json(json!({ "running": running, "view": state.view().await })),
        )
            .into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

#[derive(Deserialize)]
pub struct FrequencyRequest {
    pub frequency: Frequency,
}

pub async fn post_frequency(
    State(state): State<AppState>,
    Json(req): Json<FrequencyRequest>,
) -> impl IntoResponse {
    state.controller.set_frequency(req.frequency).await;
    info!("Frequency set to {}", req.frequency);
    Json(json!({ "frequency": req.frequency }))
}

/// Re-polls status and signals. Failures surface as notices in the view.
pub async fn post_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let controller = &state.controller;
    let (running, signals) = tokio::join!(controller.check_if_running(), controller.fetch_signals());
    debug!("Refresh: running={:?} signals={:?}", running.is_ok(), signals.is_ok());
    Json(state.view().await)
}

// === Notifications ===

pub async fn get_notifications(State(state): State<AppState>) -> impl IntoResponse {
    let notifications = state.controller.notifications().get_all().await;
    Json(json!({ "notifications": notifications }))
}

#[derive(Deserialize)]
pub struct AcknowledgeRequest {
    pub id: String,
}

pub async fn post_acknowledge_notification(
    State(state): State<AppState>,
    Json(req): Json<AcknowledgeRequest>,
) -> impl IntoResponse {
    if state.controller.notifications().acknowledge(&req.id).await {
        (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown notification {}", req.id) })),
        )
            .into_response()
    }
}

pub async fn post_acknowledge_all(State(state): State<AppState>) -> impl IntoResponse {
    let count = state.controller.notifications().acknowledge_all().await;
    Json(json!({ "acknowledged": count }))
}

// === Health Check ===

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mounted: bool,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        mounted: state.controller.is_mounted().await,
    })
}

// === WebSocket ===

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.controller.state().subscribe();

    info!("Dashboard client connected");

    let initial = json!({
        "type": "Initial",
        "data": state.view().await,
    });
    if let Ok(json_str) = serde_json::to_string(&initial) {
        let _ = sender.send(Message::Text(json_str)).await;
    }

    // Forward state events to the page
    let send_task = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Ping(_)) => {
                debug!("Received ping");
            }
            Ok(Message::Close(_)) => {
                info!("Dashboard client disconnected");
                break;
            }
            Err(e) => {
                error!("Dashboard socket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
}
