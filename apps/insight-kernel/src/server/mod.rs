// [[RARO]]/apps/insight-kernel/src/server/mod.rs
// Purpose: Route table for the insight kernel.
// Architecture: API Layer
// Dependencies: Axum, Tower-HTTP

pub mod handlers;

use axum::{
    http::Method,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ledger::RunLedger;

pub fn router(ledger: Arc<RunLedger>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/runs", post(handlers::create_run))
        .route("/runs/:run_id", delete(handlers::delete_run))
        .route("/runs/:run_id/events", post(handlers::append_events))
        .route("/runs/:run_id/status", put(handlers::set_status))
        .route("/runs/:run_id/snapshot", get(handlers::get_snapshot))
        .route("/insight/detect", post(handlers::detect_shape))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ledger)
}
