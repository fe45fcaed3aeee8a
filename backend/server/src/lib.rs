//! # GabConcours API
//!
//! Candidate facing endpoints for the numbering and progress pieces of the exam
//! registration platform.
//!
//! ## Routes
//! - `POST /registrations`: validate, allocate a NUPCAN, seed progress, send the confirmation
//! - `GET /progress/{nupcan}`: progression record plus completion percentage, 404 if none
//! - `POST /progress/{nupcan}/stages/{stage}`: mark a stage complete
//! - `GET /progress/{nupcan}/access/{stage}`: whether the client may open that step
//!
//! ## Failure policy
//! - Allocation conflicts answer 503 with `Retry-After`, the client retries the request
//! - Progress lookups never error out, unreadable records look like "not started"
//! - A failed confirmation email never undoes a registration
//!
//! Counter resets are deliberately absent here, see the `process` maintenance binary.
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod notifier;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    access_handler, complete_stage_handler, health_handler, progress_handler,
    registration_handler,
};
use state::State;

pub fn router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/registrations", post(registration_handler))
        .route("/progress/{nupcan}", get(progress_handler))
        .route("/progress/{nupcan}/stages/{stage}", post(complete_stage_handler))
        .route("/progress/{nupcan}/access/{stage}", get(access_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(&config).await?;

    info!("Starting server...");
    let app = router(state);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
