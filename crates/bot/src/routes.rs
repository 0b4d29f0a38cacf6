//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health           - Liveness check
//! POST /slack/commands   - Slash-command webhook (signed by Slack)
//! ```

use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use tracing::{debug, instrument};

use crate::commands::{self, Reply, SlashCommand};
use crate::error::AppError;
use crate::state::AppState;

/// Create the bot's routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/slack/commands", post(handle_command))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the state store.
async fn health() -> &'static str {
    "ok"
}

/// Handle a slash-command webhook.
///
/// Verifies the Slack signature over the raw body before parsing anything.
#[instrument(skip(state, headers, body))]
async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Reply, AppError> {
    // Extract headers for signature verification
    let timestamp = headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get("X-Slack-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    state
        .slack()
        .verify_signature(timestamp, &body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    debug!("Slack signature verified");

    let request = SlashCommand::from_form(&body)?;
    Ok(commands::execute(&state, &request).await)
}
