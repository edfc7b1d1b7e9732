//! # HTTP Control Plane
//!
//! Builds the axum router that carries the node's RPC surface. The method
//! semantics live in `forge_protocol::rpc`; this layer only decodes the
//! HTTP envelope, hands the request to dispatch with the current instant,
//! and translates the reply back into a status code and JSON body.
//!
//! ## Endpoints
//!
//! | Method | Path       | Description                         |
//! |--------|------------|-------------------------------------|
//! | POST   | `/rpc`     | The six-method RPC gateway          |
//! | GET    | `/health`  | Liveness probe                      |
//! | GET    | `/metrics` | Prometheus text exposition          |
//!
//! Non-POST requests to `/rpc` get the router's 405 automatically.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use forge_protocol::node::Node;
use forge_protocol::rpc::{dispatch, RpcRequest, RpcResponse};

use crate::metrics::SharedMetrics;

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The running node: mempool, chain, and config.
    pub node: Arc<Node>,
    /// Prometheus metric handles.
    pub metrics: SharedMetrics,
}

/// Builds the full axum [`Router`] with all routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /health` — 200 if the process is alive. Liveness only; it does not
/// inspect the production loop.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /metrics` — Prometheus text exposition.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.render())
}

/// `POST /rpc` — decodes the envelope and defers to protocol dispatch.
///
/// A body that is not valid JSON (or not an envelope) answers 400 with the
/// error in the response envelope, matching the wire contract.
async fn rpc_handler(
    State(state): State<AppState>,
    body: Result<Json<RpcRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match body {
        Ok(json) => json,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RpcResponse::error("invalid JSON request")),
            );
        }
    };

    let reply = dispatch(&state.node, request, Utc::now());
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body))
}
