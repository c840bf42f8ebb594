//! # Health Check Server
//!
//! - `GET /healthcheck` - 200 `{"status":"ok"}`, 503 while in maintenance
//! - `POST /healthcheck/down` - enter maintenance mode
//! - `POST /healthcheck/up` - leave maintenance mode
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ControllerError;
use crate::metrics::REGISTRY;

#[derive(Debug, Default)]
pub struct HealthState {
    maintenance: AtomicBool,
}

impl HealthState {
    pub fn in_maintenance(&self) -> bool {
        self.maintenance.load(Ordering::Relaxed)
    }
}

pub fn router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck_handler))
        .route("/healthcheck/down", post(down_handler))
        .route("/healthcheck/up", post(up_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(address: SocketAddr, state: Arc<HealthState>) -> Result<(), ControllerError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| ControllerError::Watch(format!("binding health check server to {address}: {e}")))?;

    info!("Health check server listening on {}", address);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| ControllerError::Watch(format!("health check server: {e}")))
}

async fn healthcheck_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.in_maintenance() {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "maintenance"})))
    } else {
        (StatusCode::OK, Json(json!({"status": "ok"})))
    }
}

async fn down_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    state.maintenance.store(true, Ordering::Relaxed);
    info!("Entering maintenance mode");
    StatusCode::OK
}

async fn up_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    state.maintenance.store(false, Ordering::Relaxed);
    info!("Leaving maintenance mode");
    StatusCode::OK
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn call(state: &Arc<HealthState>, method: Method, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router(Arc::clone(state)).oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_maintenance_toggle() {
        let state = Arc::new(HealthState::default());

        assert_eq!(call(&state, Method::GET, "/healthcheck").await, StatusCode::OK);

        assert_eq!(call(&state, Method::POST, "/healthcheck/down").await, StatusCode::OK);
        assert!(state.in_maintenance());
        assert_eq!(
            call(&state, Method::GET, "/healthcheck").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        assert_eq!(call(&state, Method::POST, "/healthcheck/up").await, StatusCode::OK);
        assert_eq!(call(&state, Method::GET, "/healthcheck").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = Arc::new(HealthState::default());
        assert_eq!(call(&state, Method::GET, "/metrics").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_toggle_requires_post() {
        let state = Arc::new(HealthState::default());
        assert_eq!(
            call(&state, Method::GET, "/healthcheck/down").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert!(!state.in_maintenance());
    }
}
