//! Mock Interview · AI interview simulator backend
//!
//! - Axum HTTP API: streaming LLM proxy, question bank, contribution flow
//! - Incremental repair/parse of streamed structured output
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                     : u16 (default 3000)
//!   OPENAI_API_KEY           : default key; requests may pass their own `apiKey`
//!   OPENAI_BASE_URL          : default "https://api.openai.com/v1"
//!   OPENAI_MODEL             : default "gpt-4o-mini"
//!   OPENAI_IDLE_TIMEOUT_SECS : max silence between upstream chunks (default 60)
//!   QUESTION_BANK_PATH       : default "./data/questions.json"
//!   GITHUB_TOKEN/OWNER/REPO  : enable contributions through pull requests
//!   AGENT_CONFIG_PATH        : path to TOML config (prompt overrides)
//!   LOG_LEVEL                : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT               : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use mock_interview_backend::config::Settings;
use mock_interview_backend::routes::build_router;
use mock_interview_backend::state::AppState;
use mock_interview_backend::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));

  let state = Arc::new(AppState::new(settings)?);
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mock_interview_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "mock_interview_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "mock_interview_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "mock_interview_backend", "Shutdown signal received");
}
