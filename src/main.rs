//! flashdeck · flashcard generation backend
//!
//! - Axum HTTP API (`POST /api/chat`, `GET /api/v1/health`)
//! - OpenAI credential supplied per request (`X-OpenAI-Key`)
//! - Static SPA fallback (STATIC_DIR, default ./static)
//!
//! See `flashdeck::config` for the environment variables. Logging:
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT   : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use flashdeck::config::ServerConfig;
use flashdeck::routes::build_router;
use flashdeck::state::AppState;
use flashdeck::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = ServerConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  // Shared, read-only state: config, extractor, OpenAI client.
  let state = Arc::new(AppState::new(config)?);
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "flashdeck", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "flashdeck", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "flashdeck", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "flashdeck", "Shutdown signal received");
}
