//! Inbound route handlers.
//!
//! The FSHub webhook hands the raw body to the dispatch pipeline; JSON
//! decoding happens there so malformed bodies are audited too.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::pipeline::Pipeline;
use crate::web::AppState;

/// POST /fshub/v1/webhook — relay one FSHub event to Discord.
pub async fn fshub_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    async move {
        let (webhook_url, _) = state.effective_webhook().await;
        let pipeline = Pipeline::new(
            webhook_url.as_deref(),
            state.discord.as_ref(),
            state.db.as_ref(),
        );
        let report = pipeline.handle(&body).await;
        let status = report.http_status();
        let detail = report.detail().unwrap_or_else(|| "-".into());
        info!(
            event_type = ?report.event_type,
            correlation_id = ?report.correlation_id,
            status = status.as_u16(),
            detail = %detail,
            "webhook handled"
        );
        (status, Json(report.response_body()))
    }
    .instrument(info_span!("fshub_webhook", %request_id))
    .await
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
