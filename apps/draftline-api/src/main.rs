//! Draftline API - HTTP surface for the template drafting core
//!
//! Provides REST endpoints for:
//! - Template ingestion from raw document text
//! - Template listing and retrieval
//! - Query-to-template matching with a web-search fallback
//! - Draft lifecycle: create, collect answers, generate

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

mod config;
mod gemini;
mod handlers;
mod state;
mod websearch;

use config::ApiConfig;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("draftline_api=info".parse()?)
                .add_directive("draftline_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration and initialize application state
    let config = ApiConfig::from_env()?;
    info!("Initializing application state...");
    let state = Arc::new(AppState::new(&config)?);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Template endpoints
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route("/templates/:id", get(handlers::get_template))
        // Matching
        .route("/match", post(handlers::match_template))
        // Draft endpoints
        .route("/drafts", post(handlers::create_draft))
        .route("/drafts/:id", get(handlers::get_draft))
        .route("/drafts/:id/answers", post(handlers::update_answers))
        .route("/drafts/:id/generate", post(handlers::generate_draft))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
