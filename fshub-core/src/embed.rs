//! Notification documents and their Discord wire form.
//!
//! Transformers describe a message through [`EmbedBuilder`]; the builder
//! fixes the color and footer from the event type and keeps fields in the
//! order they were pushed. [`DiscordMessage`] is the JSON body posted to a
//! Discord webhook.

use serde::Serialize;

use crate::extract::NOT_AVAILABLE;
use crate::types::{footer_text, EventType};

/// Label of a section-break field. Discord rejects empty names, so a
/// zero-width space stands in for "no label".
pub const SECTION_LABEL: &str = "\u{200B}";

/// Sent as plain content when no transformer produced an embed.
pub const UNHANDLED_CONTENT: &str = "Unhandled event";

// Discord embed limits (characters).
const MAX_TITLE: usize = 256;
const MAX_DESCRIPTION: usize = 4096;
const MAX_FIELD_NAME: usize = 256;
const MAX_FIELD_VALUE: usize = 1024;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One `(label, value, inline)` row of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationField {
    #[serde(rename = "name")]
    pub label: String,
    pub value: String,
    pub inline: bool,
}

impl NotificationField {
    /// True for the bold, unlabeled rows that split a field list into groups.
    pub fn is_section_break(&self) -> bool {
        self.label == SECTION_LABEL && !self.inline
    }
}

/// Transformer output, independent of the Discord wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDocument {
    pub event_tag: String,
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<NotificationField>,
    pub footer_text: String,
    pub image_url: Option<String>,
}

impl NotificationDocument {
    /// Placeholder for a tag no transformer handles. Has no fields, so it
    /// is never deliverable.
    pub fn unhandled(tag: &str) -> Self {
        NotificationDocument {
            event_tag: tag.to_string(),
            title: UNHANDLED_CONTENT.to_string(),
            description: None,
            color: 0,
            fields: Vec::new(),
            footer_text: footer_text(tag),
            image_url: None,
        }
    }

    pub fn is_deliverable(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Value of the first field with this label.
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    /// Titles of the section-break rows, in order.
    pub fn sections(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_section_break())
            .map(|f| f.value.trim_matches('*'))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`NotificationDocument`] for one event type.
pub struct EmbedBuilder {
    event_type: EventType,
    title: String,
    description: Option<String>,
    fields: Vec<NotificationField>,
    image_url: Option<String>,
}

impl EmbedBuilder {
    pub fn new(event_type: EventType, title: impl Into<String>) -> Self {
        EmbedBuilder {
            event_type,
            title: title.into(),
            description: None,
            fields: Vec::new(),
            image_url: None,
        }
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        let description = description.into();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    pub fn image(&mut self, url: Option<String>) -> &mut Self {
        self.image_url = url;
        self
    }

    pub fn field(&mut self, label: &str, value: impl Into<String>, inline: bool) -> &mut Self {
        let mut value = value.into();
        if value.is_empty() {
            value = NOT_AVAILABLE.to_string();
        }
        self.fields.push(NotificationField {
            label: clamp(label, MAX_FIELD_NAME),
            value: clamp(&value, MAX_FIELD_VALUE),
            inline,
        });
        self
    }

    /// Inline field (rendered side by side).
    pub fn inline(&mut self, label: &str, value: impl Into<String>) -> &mut Self {
        self.field(label, value, true)
    }

    /// Full-width field.
    pub fn block(&mut self, label: &str, value: impl Into<String>) -> &mut Self {
        self.field(label, value, false)
    }

    /// Section break with a bold title.
    pub fn section(&mut self, title: &str) -> &mut Self {
        self.field(SECTION_LABEL, format!("**{title}**"), false)
    }

    pub fn build(self) -> NotificationDocument {
        let tag = self.event_type.tag();
        NotificationDocument {
            event_tag: tag.to_string(),
            title: clamp(&self.title, MAX_TITLE),
            description: self.description.map(|d| clamp(&d, MAX_DESCRIPTION)),
            color: self.event_type.color(),
            fields: self.fields,
            footer_text: footer_text(tag),
            image_url: self.image_url,
        }
    }
}

/// Hard cut at `max` characters, marking the cut with an ellipsis.
fn clamp(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

// ---------------------------------------------------------------------------
// Discord wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DiscordMessage {
    Embeds { embeds: Vec<Embed> },
    Content { content: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<NotificationField>,
    pub footer: Footer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Footer {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Image {
    pub url: String,
}

impl From<&NotificationDocument> for DiscordMessage {
    fn from(doc: &NotificationDocument) -> Self {
        if !doc.is_deliverable() {
            return DiscordMessage::Content {
                content: UNHANDLED_CONTENT.to_string(),
            };
        }
        DiscordMessage::Embeds {
            embeds: vec![Embed {
                title: doc.title.clone(),
                description: doc.description.clone(),
                color: doc.color,
                fields: doc.fields.clone(),
                footer: Footer {
                    text: doc.footer_text.clone(),
                },
                image: doc.image_url.clone().map(|url| Image { url }),
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
