use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use super::{api, render_page, AppState, Layout};

const VIEWPORT_HEADERS: [&str; 2] = ["sec-ch-viewport-width", "viewport-width"];

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Dashboard page
        .route("/", get(serve_dashboard))
        // API endpoints
        .route("/api/health", get(api::health_check))
        .route("/api/state", get(api::get_state))
        // Control endpoints
        .route("/api/control/toggle", post(api::post_toggle))
        .route("/api/frequency", post(api::post_frequency))
        .route("/api/refresh", post(api::post_refresh))
        // Notification endpoints
        .route("/api/notifications", get(api::get_notifications))
        .route("/api/notifications/acknowledge", post(api::post_acknowledge_notification))
        .route("/api/notifications/acknowledge-all", post(api::post_acknowledge_all))
        // WebSocket
        .route("/ws", get(api::websocket_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_dashboard_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Dashboard server starting on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub width: Option<u32>,
}

/// `?width=` wins over client-hint headers; with neither the desktop
/// layout is served.
pub fn layout_for_request(query: &PageQuery, headers: &HeaderMap) -> Layout {
    let hinted = || {
        VIEWPORT_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|w| w.is_finite() && *w >= 0.0)
                .map(|w| w as u32)
        })
    };

    query
        .width
        .or_else(hinted)
        .map(Layout::for_width)
        .unwrap_or(Layout::Desktop)
}

async fn serve_dashboard(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let layout = layout_for_request(&query, &headers);
    let view = state.view().await;

    match render_page(layout, &view) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render dashboard").into_response()
        }
    }
}
