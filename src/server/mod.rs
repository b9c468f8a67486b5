//! HTTP service exposing the cutout pipeline
//!
//! Two routes, permissive CORS, and a rejection handler that turns warp's
//! rejections into the same JSON error shape the handlers use.

pub mod handlers;

use crate::{
    config::ServerConfig,
    error::{CutoutError, Result},
    processor::CutoutProcessor,
};
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Reply};

/// Request headers accepted in CORS preflights
pub const CORS_ALLOWED_HEADERS: [&str; 10] = [
    "accept",
    "accept-language",
    "authorization",
    "cache-control",
    "content-language",
    "content-type",
    "origin",
    "pragma",
    "x-request-id",
    "x-requested-with",
];

/// State shared by every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub processor: CutoutProcessor,
}

impl AppState {
    /// Bundle a validated server configuration with a processor
    ///
    /// # Errors
    /// Returns `CutoutError::InvalidConfig` if the server configuration is invalid
    pub fn new(config: ServerConfig, processor: CutoutProcessor) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, processor })
    }
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

/// All routes with CORS and rejection handling applied
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(CORS_ALLOWED_HEADERS);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(Arc::clone(&state)))
        .and_then(handlers::health);

    let remove_background = warp::path("remove-background")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(Arc::clone(&state)))
        .and(warp::multipart::form().max_length(state.config.max_request_bytes))
        .and_then(handlers::remove_background);

    let messages = Arc::new(state.config.messages.clone());

    health
        .or(remove_background)
        .with(cors)
        .recover(move |rejection| handlers::handle_rejection(rejection, Arc::clone(&messages)))
}

/// Bind and serve until Ctrl-C
///
/// # Errors
/// - Invalid host/port
/// - The address cannot be bound
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.socket_addr()?;
    let service_name = state.config.service_name.clone();
    let remover = state.processor.remover_name().to_string();
    let max_dimension = state.processor.config().max_dimension;
    let state = Arc::new(state);

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                },
            }
        })
        .map_err(|e| {
            CutoutError::Io(std::io::Error::other(format!(
                "Failed to bind {}: {}",
                addr, e
            )))
        })?;

    tracing::info!(
        service = %service_name,
        address = %bound,
        remover = %remover,
        max_dimension,
        "Listening: GET /health, POST /remove-background"
    );
    server.await;
    tracing::info!("Server stopped");

    Ok(())
}
