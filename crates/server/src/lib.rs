//! HTTP surface dispatching requests to the monitoring forwarding router.
#![allow(clippy::uninlined_format_args)]

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use eyre::Result;
use monitoring::{Ctx, Response};
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

/// Health endpoint
pub mod health;
/// Process shutdown signal
pub mod shutdown;

pub use shutdown::ShutdownSignal;

/// Version prefix for all API routes.
pub const API_VERSION: &str = "v1";

/// Shared state for request handlers.
#[derive(Debug, Clone)]
pub struct GatewayState {
    router: monitoring::Router,
    ctx: Arc<Ctx>,
}

impl GatewayState {
    /// Create state dispatching through `router` with `ctx` for every call.
    pub fn new(router: monitoring::Router, ctx: Ctx) -> Self {
        Self { router, ctx: Arc::new(ctx) }
    }
}

/// Body of the operation listing.
#[derive(Debug, Serialize)]
pub struct OperationsResponse {
    /// Registered operation names, sorted.
    pub operations: Vec<&'static str>,
}

/// List the registered operations.
pub async fn list_operations(State(state): State<GatewayState>) -> Json<OperationsResponse> {
    Json(OperationsResponse { operations: state.router.operations().collect() })
}

/// Run `operation` with the request body as its parameter payload.
///
/// Registered operations always answer 200 with the envelope, whatever the
/// outcome of the forwarded call. Unknown names answer 404.
pub async fn dispatch(
    State(state): State<GatewayState>,
    Path(operation): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<Response>) {
    match state.router.dispatch(&state.ctx, &operation, &body).await {
        Ok(resp) => (StatusCode::OK, Json(resp)),
        Err(e) => (StatusCode::NOT_FOUND, Json(Response::err(e.to_string()))),
    }
}

/// Build the HTTP router with tracing.
pub fn router(state: GatewayState) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let monitoring_routes = Router::new()
        .route("/monitoring", get(list_operations))
        .route("/monitoring/:operation", post(dispatch))
        .with_state(state);

    Router::new()
        .route("/health", get(health::handler))
        .nest(&format!("/{API_VERSION}"), monitoring_routes)
        .layer(trace)
}

/// Serve the gateway on `addr` until `shutdown` resolves.
pub async fn run<F>(addr: SocketAddr, state: GatewayState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    info!("Starting status gateway on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown).await?;
    info!("Status gateway stopped");
    Ok(())
}
