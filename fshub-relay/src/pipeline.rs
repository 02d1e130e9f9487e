//! Dispatch pipeline: classify, transform, deliver, log.
//!
//! Single pass per request. The webhook URL, the delivery client and the
//! audit sink are passed in through [`Pipeline`]; nothing here reads
//! process-wide state.

use chrono::Utc;
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use fshub_core::fixtures::sample_data;
use fshub_core::{
    classify, transform, transform_tag, Classification, DiscordMessage, EventType,
    NotificationDocument,
};

use crate::db::{AuditRecord, AuditSink, LogStatus, LogType};
use crate::delivery::{Deliver, DeliveryError};

/// Why a delivery did not happen or did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    MissingWebhook,
    Transport(String),
    Status { code: u16, body: String },
}

impl std::fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryFailure::MissingWebhook => f.write_str("missing webhook configuration"),
            DeliveryFailure::Transport(e) => write!(f, "{e}"),
            DeliveryFailure::Status { code, body } => {
                write!(f, "Discord error (Code: {code}): {body}")
            }
        }
    }
}

impl From<DeliveryError> for DeliveryFailure {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::Status { code, body } => DeliveryFailure::Status { code, body },
            other => DeliveryFailure::Transport(other.to_string()),
        }
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Ignored,
    Rejected(String),
    DeliverySucceeded(u16),
    DeliveryFailed(DeliveryFailure),
}

/// Everything the caller needs to answer the webhook sender.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outcome: ProcessingOutcome,
    pub event_type: Option<EventType>,
    pub correlation_id: Option<String>,
}

impl PipelineReport {
    /// Delivery failures other than a missing webhook still answer 200.
    pub fn http_status(&self) -> StatusCode {
        match &self.outcome {
            ProcessingOutcome::Rejected(_) => StatusCode::BAD_REQUEST,
            ProcessingOutcome::DeliveryFailed(DeliveryFailure::MissingWebhook) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::OK,
        }
    }

    /// Short outcome detail for the request log.
    pub fn detail(&self) -> Option<String> {
        match &self.outcome {
            ProcessingOutcome::Ignored => None,
            ProcessingOutcome::Rejected(reason) => Some(reason.clone()),
            ProcessingOutcome::DeliverySucceeded(code) => Some(format!("Discord replied {code}")),
            ProcessingOutcome::DeliveryFailed(failure) => Some(failure.to_string()),
        }
    }

    pub fn response_body(&self) -> Value {
        match &self.outcome {
            ProcessingOutcome::Rejected(_) => {
                json!({"status": "error", "message": "Invalid JSON"})
            }
            ProcessingOutcome::Ignored => json!({"status": "ignored"}),
            ProcessingOutcome::DeliveryFailed(DeliveryFailure::MissingWebhook) => json!({
                "status": "error",
                "message": "The Discord webhook is not configured.",
            }),
            _ => json!({"status": "ok"}),
        }
    }
}

/// Result of a synthetic test notification.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub test_sent: String,
    pub status: LogStatus,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Explicit context for one pipeline run.
pub struct Pipeline<'a> {
    pub webhook_url: Option<&'a str>,
    pub deliverer: &'a dyn Deliver,
    pub audit: &'a dyn AuditSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        webhook_url: Option<&'a str>,
        deliverer: &'a dyn Deliver,
        audit: &'a dyn AuditSink,
    ) -> Self {
        Pipeline {
            webhook_url,
            deliverer,
            audit,
        }
    }

    async fn log(&self, log_type: LogType, status: LogStatus, message: &str, cid: Option<&str>) {
        self.audit
            .append(AuditRecord::new(log_type, status, message, cid))
            .await;
    }

    fn configured_url(&self) -> Option<&'a str> {
        self.webhook_url.map(str::trim).filter(|u| !u.is_empty())
    }

    /// Send a rendered document. Does not log.
    async fn send(&self, doc: &NotificationDocument) -> Result<u16, DeliveryFailure> {
        let url = self.configured_url().ok_or(DeliveryFailure::MissingWebhook)?;
        let message = DiscordMessage::from(doc);
        Ok(self.deliverer.deliver(url, &message).await?)
    }

    /// Process one raw webhook body end to end.
    pub async fn handle(&self, raw: &[u8]) -> PipelineReport {
        let classification = classify(raw);
        let cid = classification.correlation_id().map(String::from);
        let cid_ref = cid.as_deref();

        self.log(
            LogType::WebhookReceived,
            LogStatus::Success,
            "Request received",
            cid_ref,
        )
        .await;

        let (event_type, event) = match classification {
            Classification::Rejected { reason } => {
                warn!(reason = %reason, "rejected webhook body");
                self.log(LogType::WebhookReceived, LogStatus::Failed, "Invalid JSON", cid_ref)
                    .await;
                return PipelineReport {
                    outcome: ProcessingOutcome::Rejected(reason),
                    event_type: None,
                    correlation_id: cid,
                };
            }
            Classification::Ignored { event } => {
                let tag = event.event_type.unwrap_or_default();
                debug!(event_type = %tag, "ignoring unsupported event");
                self.log(
                    LogType::WebhookReceived,
                    LogStatus::Ignored,
                    &format!("Ignored event type: {tag}"),
                    cid_ref,
                )
                .await;
                return PipelineReport {
                    outcome: ProcessingOutcome::Ignored,
                    event_type: None,
                    correlation_id: cid,
                };
            }
            Classification::Accepted { event_type, event } => (event_type, event),
        };

        let doc = transform(event_type, &event.data);

        let outcome = match self.send(&doc).await {
            Ok(code) => {
                info!(%event_type, correlation_id = ?cid_ref, code, "relayed to Discord");
                self.log(
                    LogType::DiscordSent,
                    LogStatus::Success,
                    &format!("Discord message sent (Code: {code})"),
                    cid_ref,
                )
                .await;
                ProcessingOutcome::DeliverySucceeded(code)
            }
            Err(failure) => {
                warn!(%event_type, correlation_id = ?cid_ref, error = %failure, "Discord delivery failed");
                let message = match &failure {
                    DeliveryFailure::MissingWebhook => "Missing Discord webhook".to_string(),
                    DeliveryFailure::Transport(e) => format!("Error sending to Discord: {e}"),
                    status @ DeliveryFailure::Status { .. } => status.to_string(),
                };
                self.log(LogType::DiscordSent, LogStatus::Failed, &message, cid_ref)
                    .await;
                ProcessingOutcome::DeliveryFailed(failure)
            }
        };

        PipelineReport {
            outcome,
            event_type: Some(event_type),
            correlation_id: cid,
        }
    }

    /// Render the canned fixture for `tag`, deliver it, and record one
    /// `discord_test_sent` entry.
    pub async fn run_test(&self, tag: &str) -> TestReport {
        let data = EventType::from_tag(tag)
            .map(sample_data)
            .unwrap_or_else(|| json!({}));
        let doc = transform_tag(tag, &data);

        let (status, message) = if !doc.is_deliverable() {
            (
                LogStatus::Failed,
                "Error: The test type is unknown or did not generate an embed.".to_string(),
            )
        } else {
            match self.send(&doc).await {
                Ok(_) => (LogStatus::Success, "Test successful".to_string()),
                Err(DeliveryFailure::MissingWebhook) => {
                    (LogStatus::Failed, "Missing Discord webhook".to_string())
                }
                Err(e) => (LogStatus::Failed, e.to_string()),
            }
        };

        info!(event_type = %tag, status = status.as_str(), "test notification");

        let cid = format!("TEST-{}", Utc::now().timestamp());
        self.log(
            LogType::DiscordTestSent,
            status,
            &format!("Discord notification test: {tag} ({message})"),
            Some(&cid),
        )
        .await;

        TestReport {
            test_sent: tag.to_string(),
            status,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    use fshub_core::fixtures::sample_envelope;

    use crate::delivery::DiscordClient;

    /// Records every audit entry in memory.
    #[derive(Default)]
    pub struct MemoryAudit {
        pub records: Mutex<Vec<AuditRecord>>,
    }

    impl MemoryAudit {
        pub fn entries(&self) -> Vec<(LogType, LogStatus, String)> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .map(|r| (r.log_type, r.status, r.message.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl AuditSink for MemoryAudit {
        async fn append(&self, record: AuditRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    /// Delivery double: records calls and answers with a fixed result.
    pub struct FakeDiscord {
        pub calls: Mutex<Vec<(String, Value)>>,
        pub reply: Result<u16, (u16, String)>,
    }

    impl FakeDiscord {
        pub fn ok() -> Self {
            FakeDiscord {
                calls: Mutex::new(Vec::new()),
                reply: Ok(204),
            }
        }

        pub fn status(code: u16, body: &str) -> Self {
            FakeDiscord {
                calls: Mutex::new(Vec::new()),
                reply: Err((code, body.to_string())),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Deliver for FakeDiscord {
        async fn deliver(&self, url: &str, message: &DiscordMessage) -> Result<u16, DeliveryError> {
            let json = serde_json::to_value(message).unwrap();
            self.calls.lock().unwrap().push((url.to_string(), json));
            match &self.reply {
                Ok(code) => Ok(*code),
                Err((code, body)) => Err(DeliveryError::Status {
                    code: *code,
                    body: body.clone(),
                }),
            }
        }
    }

    const URL: &str = "https://discord.test/api/webhooks/1/t";

    fn body(ty: EventType) -> Vec<u8> {
        serde_json::to_vec(&sample_envelope(ty)).unwrap()
    }

    #[tokio::test]
    async fn test_accepted_delivered() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        let pipeline = Pipeline::new(Some(URL), &discord, &audit);

        let report = pipeline.handle(&body(EventType::FlightCompleted)).await;

        assert_eq!(report.outcome, ProcessingOutcome::DeliverySucceeded(204));
        assert_eq!(report.detail().as_deref(), Some("Discord replied 204"));
        assert_eq!(report.event_type, Some(EventType::FlightCompleted));
        assert_eq!(report.http_status(), StatusCode::OK);
        assert_eq!(report.response_body(), json!({"status": "ok"}));

        let calls = discord.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, URL);
        assert_eq!(
            calls[0].1["embeds"][0]["footer"]["text"],
            "FSHub • flight.completed"
        );

        assert_eq!(
            audit.entries(),
            vec![
                (LogType::WebhookReceived, LogStatus::Success, "Request received".into()),
                (
                    LogType::DiscordSent,
                    LogStatus::Success,
                    "Discord message sent (Code: 204)".into()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_type_ignored_without_delivery() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        let pipeline = Pipeline::new(Some(URL), &discord, &audit);

        let raw = br#"{"_type":"some.unknown.event","_data":{"id":5}}"#;
        let report = pipeline.handle(raw).await;

        assert_eq!(report.outcome, ProcessingOutcome::Ignored);
        assert_eq!(report.http_status(), StatusCode::OK);
        assert_eq!(report.response_body(), json!({"status": "ignored"}));
        assert_eq!(discord.call_count(), 0);
        assert_eq!(
            audit.entries().last().cloned(),
            Some((
                LogType::WebhookReceived,
                LogStatus::Ignored,
                "Ignored event type: some.unknown.event".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_malformed_rejected() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        let pipeline = Pipeline::new(Some(URL), &discord, &audit);

        let report = pipeline.handle(b"\xff\xfe not json").await;

        assert!(matches!(report.outcome, ProcessingOutcome::Rejected(_)));
        assert_eq!(report.event_type, None);
        assert_eq!(report.detail().as_deref(), Some("invalid payload"));
        assert_eq!(report.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(report.response_body()["message"], "Invalid JSON");
        assert_eq!(discord.call_count(), 0);
        assert_eq!(
            audit.entries()[1],
            (LogType::WebhookReceived, LogStatus::Failed, "Invalid JSON".into())
        );
    }

    #[tokio::test]
    async fn test_missing_webhook_is_server_error() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        for url in [None, Some(""), Some("   ")] {
            let pipeline = Pipeline::new(url, &discord, &audit);
            let report = pipeline.handle(&body(EventType::FlightDeparted)).await;

            assert_eq!(
                report.outcome,
                ProcessingOutcome::DeliveryFailed(DeliveryFailure::MissingWebhook)
            );
            assert_eq!(report.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                report.response_body()["message"],
                "The Discord webhook is not configured."
            );
        }
        assert_eq!(discord.call_count(), 0);
        assert_eq!(
            audit.entries().last().cloned(),
            Some((
                LogType::DiscordSent,
                LogStatus::Failed,
                "Missing Discord webhook".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_downstream_failure_still_acknowledged() {
        let discord = FakeDiscord::status(400, "{\"embeds\":[\"0\"]}");
        let audit = MemoryAudit::default();
        let pipeline = Pipeline::new(Some(URL), &discord, &audit);

        let report = pipeline.handle(&body(EventType::AirlineAchievement)).await;

        assert!(matches!(
            report.outcome,
            ProcessingOutcome::DeliveryFailed(DeliveryFailure::Status { code: 400, .. })
        ));
        assert_eq!(report.http_status(), StatusCode::OK);
        assert_eq!(report.response_body(), json!({"status": "ok"}));
        assert_eq!(
            audit.entries().last().cloned(),
            Some((
                LogType::DiscordSent,
                LogStatus::Failed,
                "Discord error (Code: 400): {\"embeds\":[\"0\"]}".into()
            ))
        );
    }

    /// Local endpoint that answers only after `delay`.
    async fn slow_discord(delay: Duration) -> String {
        let app = axum::Router::new().route(
            "/hook",
            axum::routing::post(move || async move {
                tokio::time::sleep(delay).await;
                StatusCode::NO_CONTENT
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/hook")
    }

    #[tokio::test]
    async fn test_delivery_timeout_still_acknowledged() {
        let url = slow_discord(Duration::from_secs(5)).await;
        let discord = DiscordClient::with_timeout(Duration::from_millis(200)).unwrap();
        let audit = MemoryAudit::default();
        let pipeline = Pipeline::new(Some(url.as_str()), &discord, &audit);

        let report = pipeline.handle(&body(EventType::FlightCompleted)).await;

        assert!(matches!(
            report.outcome,
            ProcessingOutcome::DeliveryFailed(DeliveryFailure::Transport(_))
        ));
        assert_eq!(report.http_status(), StatusCode::OK);
        assert_eq!(report.response_body(), json!({"status": "ok"}));

        let (log_type, status, message) = audit.entries().pop().unwrap();
        assert_eq!(log_type, LogType::DiscordSent);
        assert_eq!(status, LogStatus::Failed);
        assert!(message.starts_with("Error sending to Discord: "), "{message}");
    }

    #[tokio::test]
    async fn test_connection_refused_still_acknowledged() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        drop(listener);

        let discord = DiscordClient::with_timeout(Duration::from_millis(500)).unwrap();
        let audit = MemoryAudit::default();
        let pipeline = Pipeline::new(Some(url.as_str()), &discord, &audit);

        let report = pipeline.handle(&body(EventType::FlightDeparted)).await;

        assert!(matches!(
            report.outcome,
            ProcessingOutcome::DeliveryFailed(DeliveryFailure::Transport(_))
        ));
        assert_eq!(report.http_status(), StatusCode::OK);
        let (_, status, message) = audit.entries().pop().unwrap();
        assert_eq!(status, LogStatus::Failed);
        assert!(message.starts_with("Error sending to Discord: "), "{message}");
    }

    #[tokio::test]
    async fn test_correlation_id_logged() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        let pipeline = Pipeline::new(Some(URL), &discord, &audit);

        let raw = br#"{"_type":"flight.completed","flight_id":"F-77","_data":{}}"#;
        let report = pipeline.handle(raw).await;

        assert_eq!(report.correlation_id.as_deref(), Some("F-77"));
        let records = audit.records.lock().unwrap();
        assert!(records
            .iter()
            .all(|r| r.correlation_id.as_deref() == Some("F-77")));
    }

    #[tokio::test]
    async fn test_departure_cruise_field_reaches_discord() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        let pipeline = Pipeline::new(Some(URL), &discord, &audit);
        pipeline.handle(&body(EventType::FlightDeparted)).await;

        let calls = discord.calls.lock().unwrap();
        let fields = calls[0].1["embeds"][0]["fields"].as_array().unwrap().clone();
        assert!(fields
            .iter()
            .any(|f| f["value"] == "FL370 (37000 ft)"));
    }

    #[tokio::test]
    async fn test_run_test_every_type() {
        for ty in EventType::ALL {
            let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
            let pipeline = Pipeline::new(Some(URL), &discord, &audit);

            let report = pipeline.run_test(ty.tag()).await;

            assert_eq!(report.status, LogStatus::Success, "{ty}");
            assert_eq!(report.message, "Test successful");
            assert_eq!(discord.call_count(), 1);
            assert_eq!(
                audit.entries(),
                vec![(
                    LogType::DiscordTestSent,
                    LogStatus::Success,
                    format!("Discord notification test: {} (Test successful)", ty.tag())
                )]
            );
            let rec = &audit.records.lock().unwrap()[0];
            assert!(rec.correlation_id.as_deref().unwrap().starts_with("TEST-"));
        }
    }

    #[tokio::test]
    async fn test_run_test_unknown_type() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        let pipeline = Pipeline::new(Some(URL), &discord, &audit);

        let report = pipeline.run_test("flight.teleported").await;

        assert_eq!(report.status, LogStatus::Failed);
        assert!(report.message.contains("unknown"));
        assert_eq!(discord.call_count(), 0);
        assert_eq!(audit.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_run_test_missing_webhook() {
        let (discord, audit) = (FakeDiscord::ok(), MemoryAudit::default());
        let pipeline = Pipeline::new(None, &discord, &audit);

        let report = pipeline.run_test("screenshots.uploaded").await;

        assert_eq!(report.status, LogStatus::Failed);
        assert_eq!(report.message, "Missing Discord webhook");
        assert_eq!(discord.call_count(), 0);
    }
}
