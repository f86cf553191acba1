//! Dashboard HTTP server
//!
//! - `GET  /` - dashboard page
//! - `POST /connect` - store credentials in the session and refresh
//! - `POST /refresh` - fetch and digest the mailbox again
//! - `POST /disconnect` - forget credentials and digests
//! - `GET  /api/session` - session snapshot as JSON
//! - `GET  /api/mailboxes` - mailbox names
//! - `GET  /attachments/{uid}/{index}` - attachment download
//! - `GET  /health` - server status

mod handlers;
mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::ai::Summarizer;
use crate::app::AppState;
use crate::constants::MAX_FORM_BYTES;
use crate::mail::MailConnector;

pub fn router<C: MailConnector, S: Summarizer>(state: Arc<AppState<C, S>>) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard::<C, S>))
        .route("/connect", post(handlers::connect::<C, S>))
        .route("/refresh", post(handlers::refresh::<C, S>))
        .route("/disconnect", post(handlers::disconnect::<C, S>))
        .route("/api/session", get(handlers::session_json::<C, S>))
        .route("/api/mailboxes", get(handlers::mailboxes::<C, S>))
        .route("/attachments/{uid}/{index}", get(handlers::attachment::<C, S>))
        .route("/health", get(handlers::health::<C, S>))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .with_state(state)
}

/// Serve the dashboard until Ctrl-C.
pub async fn serve<C: MailConnector, S: Summarizer>(state: Arc<AppState<C, S>>) -> Result<()> {
    let addr = state.config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Dashboard listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
