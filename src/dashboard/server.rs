//! HTTP status API, Prometheus endpoint and live alert WebSocket

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::modules::status::{WatcherStats, WatcherStatus};
use crate::utils::alerts::Alert;
use crate::utils::{AlertDispatcher, MetricsService};

/// Query params for list endpoints
#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<usize>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    uptime: f64,
    watchers: WatcherFlags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherFlags {
    lp_share: bool,
    position_nft: bool,
}

/// Stats response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    lp_share: WatcherStats,
    position_nft: WatcherStats,
}

/// WebSocket message types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "init")]
    Init {
        stats: StatsResponse,
        recent_alerts: Vec<Alert>,
    },
    #[serde(rename = "alert")]
    Alert(Alert),
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub lp_share: Arc<WatcherStatus>,
    pub position_nft: Arc<WatcherStatus>,
    pub alerts: Arc<AlertDispatcher>,
    pub metrics: Arc<MetricsService>,
    pub start_time: std::time::Instant,
}

impl AppState {
    fn stats(&self) -> StatsResponse {
        StatsResponse {
            lp_share: self.lp_share.get_stats(),
            position_nft: self.position_nft.get_stats(),
        }
    }
}

/// Dashboard server
pub struct DashboardServer {
    port: u16,
    state: AppState,
}

impl DashboardServer {
    pub fn new(
        port: u16,
        lp_share: Arc<WatcherStatus>,
        position_nft: Arc<WatcherStatus>,
        alerts: Arc<AlertDispatcher>,
        metrics: Arc<MetricsService>,
    ) -> Self {
        let state = AppState {
            lp_share,
            position_nft,
            alerts,
            metrics,
            start_time: std::time::Instant::now(),
        };

        Self { port, state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/stats", get(get_stats))
            .route("/api/alerts", get(get_alerts))
            .route("/metrics", get(get_metrics))
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Serve until the process exits
    pub async fn start(&self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        crate::log_success!("DASHBOARD", "Status API running at http://localhost:{}", self.port);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

// ============================================
// HANDLERS
// ============================================

async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.stats())
}

async fn get_alerts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Alert>> {
    let limit = params.limit.unwrap_or(50);
    Json(state.alerts.get_recent_alerts(limit))
}

async fn get_metrics(State(state): State<AppState>) -> Response {
    // Refresh gauges from live status before encoding
    state
        .metrics
        .set_watcher_status(crate::modules::lp_share_watcher::WATCHER, state.lp_share.is_running());
    state.metrics.set_watcher_status(
        crate::modules::position_nft_watcher::WATCHER,
        state.position_nft.is_running(),
    );

    match state.metrics.get_metrics() {
        Ok(metrics) => (
            [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            metrics,
        )
            .into_response(),
        Err(e) => {
            error!(target: "DASHBOARD", "Metrics encoding failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime: state.start_time.elapsed().as_secs_f64(),
        watchers: WatcherFlags {
            lp_share: state.lp_share.is_running(),
            position_nft: state.position_nft.is_running(),
        },
    })
}

async fn readiness_check(State(state): State<AppState>) -> Response {
    let ready = state.lp_share.is_running() && state.position_nft.is_running();

    if ready {
        Json(serde_json::json!({"ready": true})).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({"ready": false}))).into_response()
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    info!(target: "DASHBOARD", "WebSocket client connected");

    // Send initial state
    let init_msg = WsMessage::Init {
        stats: state.stats(),
        recent_alerts: state.alerts.get_recent_alerts(20),
    };

    if let Ok(json) = serde_json::to_string(&init_msg) {
        let _ = sender.send(Message::Text(json)).await;
    }

    let mut alert_rx = state.alerts.subscribe();

    // Forward alerts to websocket
    let send_task = tokio::spawn(async move {
        while let Ok(alert) = alert_rx.recv().await {
            let msg = WsMessage::Alert(alert);
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Drain client frames until it closes
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    // Whichever side finishes first ends the session
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(target: "DASHBOARD", "WebSocket client disconnected");
}
