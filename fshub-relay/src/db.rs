//! SQLite persistence — WAL mode, audit log + settings.
//!
//! Schema: relay_logs (append-only processing records), settings
//! (key/value, currently only the Discord webhook URL).

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS relay_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    type TEXT NOT NULL,
    status TEXT NOT NULL,
    payload_id TEXT,
    log_message TEXT
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relay_logs_type_status ON relay_logs(type, status);
CREATE INDEX IF NOT EXISTS idx_relay_logs_timestamp ON relay_logs(timestamp);
"#;

/// Settings key holding the Discord webhook URL.
pub const SETTING_DISCORD_WEBHOOK: &str = "discord_webhook_url";

pub fn now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    WebhookReceived,
    DiscordSent,
    DiscordTestSent,
}

impl LogType {
    pub fn as_str(self) -> &'static str {
        match self {
            LogType::WebhookReceived => "webhook_received",
            LogType::DiscordSent => "discord_sent",
            LogType::DiscordTestSent => "discord_test_sent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Failed,
    Ignored,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Failed => "failed",
            LogStatus::Ignored => "ignored",
        }
    }
}

/// One processing step, as handed to an [`AuditSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub timestamp: f64,
    pub log_type: LogType,
    pub status: LogStatus,
    pub message: String,
    pub correlation_id: Option<String>,
}

impl AuditRecord {
    pub fn new(
        log_type: LogType,
        status: LogStatus,
        message: impl Into<String>,
        correlation_id: Option<&str>,
    ) -> Self {
        AuditRecord {
            timestamp: now(),
            log_type,
            status,
            message: message.into(),
            correlation_id: correlation_id.map(String::from),
        }
    }
}

/// A stored audit row.
#[derive(Debug, Clone, Serialize)]
pub struct LogRow {
    pub id: i64,
    pub timestamp: f64,
    pub log_type: String,
    pub status: String,
    pub payload_id: Option<String>,
    pub message: Option<String>,
}

/// Counters shown on the admin stats view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub webhooks_received: i64,
    pub discord_sent: i64,
    pub discord_errors: i64,
    pub webhooks_ignored: i64,
    pub tests_sent: i64,
}

// ---------------------------------------------------------------------------
// Audit sink
// ---------------------------------------------------------------------------

/// Append-only destination for processing records.
///
/// Implementations swallow their own failures; losing an audit row never
/// fails a webhook.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord);
}

// ---------------------------------------------------------------------------
// Database (sync)
// ---------------------------------------------------------------------------

/// SQLite database holding the audit log and settings.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> SqlResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = Path::new(path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Connection::open(path)?
        };

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Database { conn })
    }

    /// Open in-memory database (for testing).
    #[cfg(test)]
    pub fn open_memory() -> SqlResult<Self> {
        Self::open(":memory:")
    }

    // -----------------------------------------------------------------------
    // Audit log
    // -----------------------------------------------------------------------

    pub fn append(&self, record: &AuditRecord) -> SqlResult<i64> {
        self.conn.execute(
            "INSERT INTO relay_logs (timestamp, type, status, payload_id, log_message)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.timestamp,
                record.log_type.as_str(),
                record.status.as_str(),
                record.correlation_id,
                record.message,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent records first.
    pub fn recent(&self, limit: i64) -> SqlResult<Vec<LogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, type, status, payload_id, log_message
             FROM relay_logs ORDER BY id DESC LIMIT ?1",
        )?;

        let rows: Vec<LogRow> = stmt
            .query_map(params![limit], |r| {
                Ok(LogRow {
                    id: r.get(0)?,
                    timestamp: r.get(1)?,
                    log_type: r.get(2)?,
                    status: r.get(3)?,
                    payload_id: r.get(4)?,
                    message: r.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn count(&self, log_type: LogType, status: LogStatus) -> i64 {
        self.conn
            .query_row(
                "SELECT COUNT(id) FROM relay_logs WHERE type = ?1 AND status = ?2",
                params![log_type.as_str(), status.as_str()],
                |r| r.get(0),
            )
            .unwrap_or(0)
    }

    pub fn count_all(&self) -> i64 {
        self.conn
            .query_row("SELECT COUNT(*) FROM relay_logs", [], |r| r.get(0))
            .unwrap_or(0)
    }

    pub fn stats(&self) -> LogStats {
        LogStats {
            webhooks_received: self.count(LogType::WebhookReceived, LogStatus::Success),
            discord_sent: self.count(LogType::DiscordSent, LogStatus::Success),
            discord_errors: self.count(LogType::DiscordSent, LogStatus::Failed),
            webhooks_ignored: self.count(LogType::WebhookReceived, LogStatus::Ignored),
            tests_sent: self.count(LogType::DiscordTestSent, LogStatus::Success),
        }
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SqliteDb — async wrapper, one connection per call
// ---------------------------------------------------------------------------

/// Async handle over a database file. Each call opens its own connection
/// on a blocking thread.
pub struct SqliteDb {
    path: String,
}

impl SqliteDb {
    pub fn new(path: impl Into<String>) -> Self {
        SqliteDb { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T, String>
    where
        F: FnOnce(&Database) -> SqlResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let db = Database::open(&path).map_err(|e| e.to_string())?;
            f(&db).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.to_string())?
    }

    pub async fn stats(&self) -> LogStats {
        self.with_db(|db| Ok(db.stats())).await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to read audit stats");
            LogStats::default()
        })
    }

    pub async fn recent(&self, limit: i64) -> Vec<LogRow> {
        self.with_db(move |db| db.recent(limit))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to read audit log");
                Vec::new()
            })
    }

    pub async fn get_setting(&self, key: &str) -> Option<String> {
        let key = key.to_string();
        self.with_db(move |db| db.get_setting(&key))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to read setting");
                None
            })
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), String> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_db(move |db| db.set_setting(&key, &value)).await
    }
}

#[async_trait]
impl AuditSink for SqliteDb {
    async fn append(&self, record: AuditRecord) {
        if let Err(e) = self.with_db(move |db| db.append(&record)).await {
            warn!(error = %e, "failed to append audit record");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
