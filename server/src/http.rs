//! HTTP API for the session bonus
//!
//! Exposes the ledger-backed grant collaborator so clients running the
//! session timer can ask for their bonus, plus read-only balance endpoints.

use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use runeward_core::{GrantCollaborator, SessionBonusResponse, UserId};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

const DEFAULT_GRANTS_LIMIT: i64 = 20;
const MAX_GRANTS_LIMIT: i64 = 100;

// ─── Router ────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handle_status))
        .route("/api/session-bonus", post(handle_session_bonus))
        .route("/api/runes/{user_id}", get(handle_balance))
        .route("/api/runes/{user_id}/grants", get(handle_grants))
        .with_state(state)
}

// ─── Handlers ──────────────────────────────────────────────────────

/// GET /api/status
async fn handle_status() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "app": "Runeward",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BonusBody {
    user_id: String,
}

/// POST /api/session-bonus (check and grant)
async fn handle_session_bonus(
    State(state): State<AppState>,
    body: Result<Json<BonusBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SessionBonusResponse::failure(rejection.body_text())),
            )
                .into_response();
        }
    };

    let user_id = match UserId::new(body.user_id) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SessionBonusResponse::failure(e.to_string())),
            )
                .into_response();
        }
    };

    match state.grantor.check_and_award(&user_id).await {
        Ok(outcome) => (StatusCode::OK, Json(SessionBonusResponse::from(&outcome))).into_response(),
        Err(e) => {
            error!("Session bonus failed for {}: {}", user_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SessionBonusResponse::failure("Internal error")),
            )
                .into_response()
        }
    }
}

/// GET /api/runes/{user_id}
async fn handle_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = UserId::new(user_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let balance = state.grantor.balance(&user_id).await.map_err(|e| {
        error!("Balance lookup failed for {}: {}", user_id, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    balance.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
struct GrantsQuery {
    limit: Option<i64>,
}

/// GET /api/runes/{user_id}/grants?limit=N
async fn handle_grants(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<GrantsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = UserId::new(user_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_GRANTS_LIMIT)
        .clamp(1, MAX_GRANTS_LIMIT);

    let grants = state
        .grantor
        .recent_grants(&user_id, limit)
        .await
        .map_err(|e| {
            error!("Grant history lookup failed for {}: {}", user_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(grants))
}

// ─── Server lifecycle ──────────────────────────────────────────────

/// Handle to a running HTTP server
pub struct HttpServerHandle {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HttpServerHandle {
    /// Bind and start serving in the background
    pub async fn start(state: AppState, bind: SocketAddr) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = build_router(state);

        info!("Runeward API listening on {}", addr);

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let mut rx = shutdown_rx;
                    while !*rx.borrow() {
                        if rx.changed().await.is_err() {
                            break;
                        }
                    }
                })
                .await
                .unwrap_or_else(|e| error!("Runeward API error: {}", e));
        });

        Ok(Self {
            addr,
            shutdown_tx,
            task,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        info!("Runeward API shutdown signal sent");
        let _ = self.task.await;
    }
}
