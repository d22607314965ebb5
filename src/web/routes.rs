use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::api::root))
        .route("/health", get(handlers::api::health))
        .route("/api/query", post(handlers::api::query))
}
