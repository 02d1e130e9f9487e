//! Web server — axum router for the FSHub inbound endpoint and admin API.
//!
//! Shared state holds the audit store (each call opens its own SQLite
//! connection), the Discord client, and the configured webhook/token.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::db::{SqliteDb, SETTING_DISCORD_WEBHOOK};
use crate::delivery::Deliver;

pub mod admin;
pub mod routes;

/// Path FSHub posts to.
pub const WEBHOOK_PATH: &str = "/fshub/v1/webhook";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub db: Arc<SqliteDb>,
    pub discord: Arc<dyn Deliver>,
    /// Webhook from the config file / CLI, used when no stored setting exists.
    pub webhook_url: Option<String>,
    pub admin_token: Option<String>,
    /// Externally reachable base URL, used to print the inbound URL.
    pub public_url: String,
}

/// Where the effective webhook came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookSource {
    Settings,
    Config,
    None,
}

impl AppState {
    /// Stored setting when non-empty, else the configured value.
    pub async fn effective_webhook(&self) -> (Option<String>, WebhookSource) {
        let stored = self
            .db
            .get_setting(SETTING_DISCORD_WEBHOOK)
            .await
            .filter(|u| !u.trim().is_empty());
        if let Some(url) = stored {
            return (Some(url), WebhookSource::Settings);
        }
        match self.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => (Some(url.to_string()), WebhookSource::Config),
            _ => (None, WebhookSource::None),
        }
    }

    pub fn inbound_url(&self) -> String {
        format!("{}{WEBHOOK_PATH}", self.public_url.trim_end_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(routes::fshub_webhook))
        .route("/health", get(routes::health))
        // Admin API (bearer token when configured)
        .route("/admin/stats", get(admin::api_stats))
        .route("/admin/logs", get(admin::api_logs))
        .route(
            "/admin/settings",
            get(admin::api_settings_get).put(admin::api_settings_put),
        )
        .route("/admin/test/:event_type", post(admin::api_test))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the web server.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> std::io::Result<()> {
    if state.admin_token.is_none() {
        warn!("no admin token configured; /admin routes are open");
    }
    if state.effective_webhook().await.0.is_none() {
        warn!("no Discord webhook configured; events will be logged and rejected");
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(db = state.db.path(), "fshub-relay listening on http://{addr}");
    info!("FSHub webhook URL: {}", state.inbound_url());

    axum::serve(listener, build_router(state)).await
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::Database;
    use crate::pipeline::tests::FakeDiscord;

    pub const CONFIG_WEBHOOK: &str = "https://discord.test/api/webhooks/config";

    /// State over a fresh on-disk database and the given Discord double.
    pub fn test_state(
        discord: Arc<FakeDiscord>,
        webhook_url: Option<&str>,
        admin_token: Option<&str>,
    ) -> (Arc<AppState>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db").to_str().unwrap().to_string();
        drop(Database::open(&db_path).unwrap());

        let state = Arc::new(AppState {
            db: Arc::new(SqliteDb::new(db_path)),
            discord,
            webhook_url: webhook_url.map(String::from),
            admin_token: admin_token.map(String::from),
            public_url: "https://relay.example.org/".to_string(),
        });
        (state, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::pipeline::tests::FakeDiscord;

    #[tokio::test]
    async fn test_effective_webhook_prefers_setting() {
        let (state, _dir) = test_state(Arc::new(FakeDiscord::ok()), Some(CONFIG_WEBHOOK), None);
        assert_eq!(
            state.effective_webhook().await,
            (Some(CONFIG_WEBHOOK.to_string()), WebhookSource::Config)
        );

        state
            .db
            .set_setting(SETTING_DISCORD_WEBHOOK, "https://discord.test/stored")
            .await
            .unwrap();
        assert_eq!(
            state.effective_webhook().await,
            (
                Some("https://discord.test/stored".to_string()),
                WebhookSource::Settings
            )
        );

        // Blank setting falls back to config
        state
            .db
            .set_setting(SETTING_DISCORD_WEBHOOK, "  ")
            .await
            .unwrap();
        assert_eq!(state.effective_webhook().await.1, WebhookSource::Config);
    }

    #[tokio::test]
    async fn test_effective_webhook_none() {
        let (state, _dir) = test_state(Arc::new(FakeDiscord::ok()), Some(""), None);
        assert_eq!(state.effective_webhook().await, (None, WebhookSource::None));
    }

    #[test]
    fn test_inbound_url() {
        let (state, _dir) = test_state(Arc::new(FakeDiscord::ok()), None, None);
        assert_eq!(
            state.inbound_url(),
            "https://relay.example.org/fshub/v1/webhook"
        );
    }
}
