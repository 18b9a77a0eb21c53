//! Agent Shield Edge Server
//!
//! Serves a content directory with every request passing through the
//! shield's request filter, plus token-guarded operator routes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   AGENT SHIELD EDGE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  Operator │  │  Shield   │  │  Content                │ │
//! │  │  API      │  │  Filter   │  │  (ServeDir)             │ │
//! │  │  (token)  │  │           │  │                         │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ AgentShield │ ── sync / telemetry threads │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod middleware;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_shield_core::AgentShield;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging; core `log` records are bridged in by `init`
    let default_filter = if config.is_production() {
        "agent_shield_edge=info,agent_shield_core=info,tower_http=info"
    } else {
        "agent_shield_edge=debug,agent_shield_core=debug,tower_http=debug"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Agent Shield edge server starting...");
    tracing::info!("Content directory: {}", config.content_dir.display());
    if config.admin_token.is_none() {
        tracing::warn!("SHIELD_ADMIN_TOKEN not set, operator routes are disabled");
    }

    // Catalog load and startup sync do blocking I/O
    let shield = tokio::task::spawn_blocking(|| {
        let shield = Arc::new(AgentShield::from_env());
        shield.start();
        shield
    })
    .await
    .context("Failed to start the shield")?;

    let state = AppState {
        shield: shield.clone(),
        config: config.clone(),
    };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Drain queued telemetry before exit
    tokio::task::spawn_blocking(move || shield.shutdown())
        .await
        .context("Failed to stop the shield")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub shield: Arc<AgentShield>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check));

    // Operator routes (admin token)
    let operator_routes = Router::new()
        .route("/api/v1/shield/sync", post(handlers::shield::sync))
        .route("/api/v1/shield/patterns/stats", get(handlers::shield::pattern_stats))
        .route("/api/v1/shield/settings", get(handlers::shield::settings))
        .route("/api/v1/shield/rules", put(handlers::shield::update_rules))
        .route("/api/v1/shield/cache", delete(handlers::shield::clear_cache))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin_token,
        ));

    // Everything else: static content behind the request filter
    let content_routes = Router::new()
        .fallback_service(ServeDir::new(&state.config.content_dir))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::filter::shield_filter,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(operator_routes)
        .merge(content_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
