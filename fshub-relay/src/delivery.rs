//! Discord delivery — POST a rendered message to a webhook URL.
//!
//! One attempt per message, bounded by [`DELIVERY_TIMEOUT`]. No retry,
//! no queue.

use std::time::Duration;

use async_trait::async_trait;
use fshub_core::DiscordMessage;
use thiserror::Error;

/// Upper bound on a single delivery attempt.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Discord error (Code: {code}): {body}")]
    Status { code: u16, body: String },
}

/// Sends a Discord message somewhere. Returns the HTTP status on success.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, url: &str, message: &DiscordMessage) -> Result<u16, DeliveryError>;
}

/// Discord webhook client.
#[derive(Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
}

impl DiscordClient {
    pub fn new() -> Result<Self, DeliveryError> {
        Self::with_timeout(DELIVERY_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(DiscordClient { client })
    }
}

#[async_trait]
impl Deliver for DiscordClient {
    async fn deliver(&self, url: &str, message: &DiscordMessage) -> Result<u16, DeliveryError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(message)
            .send()
            .await?;

        let code = response.status().as_u16();
        if response.status().is_success() {
            return Ok(code);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status { code, body })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
