//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] exposes the liveness endpoints directly and funnels
//! every other request through the stage [`Pipeline`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/healthz` `/livez` `/readyz` | Liveness checks — always `200 OK`. |
//! | `ANY`  | `/*` | Processed by the gateway pipeline. |

use crate::config::GatewaySettings;
use crate::pipeline::Pipeline;
use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use hx_gateway_core::{GatewayRequest, GatewayResponse, HttpMethod};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Shared state injected into the fallback handler.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    max_body_bytes: usize,
}

/// High-level gateway server wrapping the pipeline in an axum service.
pub struct GatewayServer {
    port: u16,
    max_body_bytes: usize,
}

impl GatewayServer {
    /// Create a server from runtime settings.
    pub fn new(settings: &GatewaySettings) -> Self {
        Self {
            port: settings.port,
            max_body_bytes: settings.max_body_bytes,
        }
    }

    /// Build the axum [`Router`] around the given pipeline.
    pub fn build_app(&self, pipeline: Arc<Pipeline>) -> Router {
        let state = AppState {
            pipeline,
            max_body_bytes: self.max_body_bytes,
        };

        Router::new()
            .route("/healthz", get(health_handler))
            .route("/livez", get(health_handler))
            .route("/readyz", get(health_handler))
            .fallback(pipeline_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind to `0.0.0.0:{port}` and serve until the process exits.
    pub async fn start(self, pipeline: Pipeline) -> std::io::Result<()> {
        let app = self.build_app(Arc::new(pipeline));
        let addr = format!("0.0.0.0:{}", self.port);
        info!(addr = %addr, "HX API Gateway starting");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}

/// `GET /healthz` (and friends) — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// Catch-all — converts the raw request into a [`GatewayRequest`] and runs
/// the pipeline.
async fn pipeline_handler(State(state): State<AppState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();

    let Some(method) = HttpMethod::from_str_ci(parts.method.as_str()) else {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": format!("method '{}' is not supported", parts.method) })),
        )
            .into_response();
    };

    // Read the transport body exactly once; every stage works from this
    // cached copy.
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(b) => b,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": "request body too large" })),
            )
                .into_response();
        }
    };

    let request_id = Uuid::new_v4().to_string();
    let mut gateway_req = GatewayRequest::new(&request_id, parts.uri.path(), method)
        .with_body(body.to_vec());
    if let Some(q) = parts.uri.query() {
        gateway_req = gateway_req.with_query(q);
    }
    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            gateway_req = gateway_req.with_header(name.as_str(), v);
        }
    }
    if let Some(ConnectInfo(peer)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        gateway_req = gateway_req.with_peer_addr(*peer);
    }

    build_axum_response(state.pipeline.process(gateway_req).await)
}

fn build_axum_response(resp: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &resp.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(resp.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
