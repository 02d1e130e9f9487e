//! Event classifier — decode an inbound webhook body and decide whether it
//! is rejected, ignored, or routed to a transformer.
//!
//! FSHub posts `{"_type": "...", "_data": {...}}`. When the `_data` key is
//! absent the top-level object is used as the data payload; a null `_data`
//! is an empty payload.

use serde_json::Value;

use crate::extract::{first_present, get, truthy_text};
use crate::types::{EventType, RelayError, Result};

/// A decoded webhook body.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// The `_type` tag, if the body carried one.
    pub event_type: Option<String>,
    /// Event data: `_data` when present, else the whole body.
    pub data: Value,
    /// Best-effort identifier from `flight_id` or `id`.
    pub correlation_id: Option<String>,
}

/// Disposition of an inbound body.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Rejected { reason: String },
    Ignored { event: InboundEvent },
    Accepted {
        event_type: EventType,
        event: InboundEvent,
    },
}

impl Classification {
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Classification::Rejected { .. } => None,
            Classification::Ignored { event } | Classification::Accepted { event, .. } => {
                event.correlation_id.as_deref()
            }
        }
    }
}

/// Decode raw bytes into an [`InboundEvent`].
///
/// Anything other than a non-empty JSON object is an invalid payload.
pub fn decode(raw: &[u8]) -> Result<InboundEvent> {
    let body: Value = serde_json::from_slice(raw)
        .map_err(|e| RelayError::InvalidPayload(e.to_string()))?;

    let is_empty_object = body.as_object().map(|o| o.is_empty()).unwrap_or(true);
    if is_empty_object {
        return Err(RelayError::InvalidPayload(
            "expected a non-empty JSON object".into(),
        ));
    }

    let event_type = get(&body, &["_type"]).and_then(|v| v.as_str()).map(String::from);
    let correlation_id = correlation_id(&body);
    // An explicit `"_data": null` is an empty payload, not a missing key.
    let data = match body.get("_data") {
        Some(Value::Null) => Value::Object(Default::default()),
        Some(d) => d.clone(),
        None => body,
    };

    Ok(InboundEvent {
        event_type,
        data,
        correlation_id,
    })
}

/// Top-level `flight_id`/`id` first, then the same keys inside `_data`
/// (or its first element when `_data` is a list).
fn correlation_id(body: &Value) -> Option<String> {
    let from = |v: &Value| truthy_text(first_present([get(v, &["flight_id"]), get(v, &["id"])]));

    from(body).or_else(|| {
        let data = get(body, &["_data"])?;
        match data {
            Value::Array(items) => items.first().and_then(from),
            other => from(other),
        }
    })
}

/// Classify a raw webhook body. Never fails: malformed input is `Rejected`.
pub fn classify(raw: &[u8]) -> Classification {
    match decode(raw) {
        Ok(event) => classify_event(event),
        Err(_) => Classification::Rejected {
            reason: "invalid payload".into(),
        },
    }
}

/// Classify an already-decoded event by its type tag.
pub fn classify_event(event: InboundEvent) -> Classification {
    match event.event_type.as_deref().and_then(EventType::from_tag) {
        Some(event_type) => Classification::Accepted { event_type, event },
        None => Classification::Ignored { event },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
