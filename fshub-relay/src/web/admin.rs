//! Admin API — audit stats, recent logs, webhook setting, test trigger.
//!
//! Bearer-token protected when `admin_token` is configured; open otherwise.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::db::SETTING_DISCORD_WEBHOOK;
use crate::pipeline::Pipeline;
use crate::web::AppState;

pub const DEFAULT_LOG_LIMIT: i64 = 50;
pub const MAX_LOG_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LogParams {
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SettingsBody {
    discord_webhook_url: String,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = match &state.admin_token {
        Some(t) => t,
        None => return Ok(()),
    };

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Some(token) = auth_header.strip_prefix("Bearer ") {
        if tokens_match(token, expected) {
            return Ok(());
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "invalid or missing bearer token"})),
    ))
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn is_webhook_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /admin/stats — audit counters and the URL to paste into FSHub.
pub async fn api_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(e) = check_auth(&state, &headers) {
        return e.into_response();
    }

    let stats = state.db.stats().await;
    let (_, source) = state.effective_webhook().await;

    Json(json!({
        "webhooks_received": stats.webhooks_received,
        "discord_sent": stats.discord_sent,
        "discord_errors": stats.discord_errors,
        "webhooks_ignored": stats.webhooks_ignored,
        "tests_sent": stats.tests_sent,
        "inbound_url": state.inbound_url(),
        "webhook_source": source,
    }))
    .into_response()
}

/// GET /admin/logs?limit=N — most recent audit records first.
pub async fn api_logs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<LogParams>,
) -> impl IntoResponse {
    if let Err(e) = check_auth(&state, &headers) {
        return e.into_response();
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);
    let rows = state.db.recent(limit).await;
    Json(json!({"count": rows.len(), "logs": rows})).into_response()
}

/// GET /admin/settings
pub async fn api_settings_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(e) = check_auth(&state, &headers) {
        return e.into_response();
    }

    let (url, source) = state.effective_webhook().await;
    Json(json!({
        "discord_webhook_url": url.unwrap_or_default(),
        "source": source,
    }))
    .into_response()
}

/// PUT /admin/settings — store the Discord webhook. An empty value clears
/// the stored setting so the configured one applies again.
pub async fn api_settings_put(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SettingsBody>,
) -> impl IntoResponse {
    if let Err(e) = check_auth(&state, &headers) {
        return e.into_response();
    }

    let url = body.discord_webhook_url.trim();
    if !url.is_empty() && !is_webhook_url(url) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "discord_webhook_url must be an http(s) URL"})),
        )
            .into_response();
    }

    if let Err(e) = state.db.set_setting(SETTING_DISCORD_WEBHOOK, url).await {
        warn!(error = %e, "failed to store webhook setting");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e})),
        )
            .into_response();
    }

    info!(cleared = url.is_empty(), "Discord webhook setting updated");
    let (url, source) = state.effective_webhook().await;
    Json(json!({
        "discord_webhook_url": url.unwrap_or_default(),
        "source": source,
    }))
    .into_response()
}

/// POST /admin/test/:event_type — send the canned fixture for a type.
pub async fn api_test(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(event_type): Path<String>,
) -> impl IntoResponse {
    if let Err(e) = check_auth(&state, &headers) {
        return e.into_response();
    }

    let (webhook_url, _) = state.effective_webhook().await;
    let pipeline = Pipeline::new(
        webhook_url.as_deref(),
        state.discord.as_ref(),
        state.db.as_ref(),
    );
    Json(pipeline.run_test(&event_type).await).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
