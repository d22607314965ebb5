// HTTP front: three JSON routes over the shared pipeline, with CORS for the
// browser frontend and request tracing.
pub mod handlers;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::WebConfig;
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.web.cors_origins);

    routes::api_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Listed origins only; methods and headers are mirrored so credentials stay allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub async fn run_server(config: &WebConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(Arc::clone(&state));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let uptime = chrono::Utc::now() - state.startup_time;
    info!("Server stopped after {} s", uptime.num_seconds());
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Could not listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
