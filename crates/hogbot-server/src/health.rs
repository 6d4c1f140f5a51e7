//! Liveness endpoints for the hosting platform's keep-alive checks.

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::net::TcpListener;

pub const INDEX_BODY: &str = "PostHog Discord Bot is running";

async fn health() -> &'static str {
    "OK"
}

async fn index() -> &'static str {
    INDEX_BODY
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(index))
}

/// Serve the liveness router until the listener fails
pub async fn serve(listener: TcpListener) -> Result<()> {
    axum::serve(listener, router())
        .await
        .context("Health server failed")
}
