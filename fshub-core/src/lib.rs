//! fshub-core: Pure classification + formatting library for FSHub webhooks.
//!
//! No async, no I/O beyond the config file — just the mapping from FSHub
//! event JSON to Discord embeds. The `fshub-relay` server wraps this with
//! HTTP, delivery and the audit log.

pub mod classify;
pub mod config;
pub mod embed;
pub mod extract;
pub mod fixtures;
pub mod transform;
pub mod types;

// Re-export commonly used types at crate root
pub use classify::{classify, classify_event, decode, Classification, InboundEvent};
pub use embed::{DiscordMessage, EmbedBuilder, NotificationDocument, NotificationField};
pub use transform::{transform, transform_tag};
pub use types::*;
