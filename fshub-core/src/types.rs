//! Shared types, error enum, and the supported FSHub event tags.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by fshub-core.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const TAG_FLIGHT_DEPARTED: &str = "flight.departed";
pub const TAG_FLIGHT_COMPLETED: &str = "flight.completed";
pub const TAG_AIRLINE_ACHIEVEMENT: &str = "airline.achievement";
pub const TAG_SCREENSHOTS_UPLOADED: &str = "screenshots.uploaded";

/// The closed set of FSHub events relayed to Discord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    FlightDeparted,
    FlightCompleted,
    AirlineAchievement,
    ScreenshotsUploaded,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::FlightDeparted,
        EventType::FlightCompleted,
        EventType::AirlineAchievement,
        EventType::ScreenshotsUploaded,
    ];

    /// Parse an FSHub `_type` tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            TAG_FLIGHT_DEPARTED => Some(EventType::FlightDeparted),
            TAG_FLIGHT_COMPLETED => Some(EventType::FlightCompleted),
            TAG_AIRLINE_ACHIEVEMENT => Some(EventType::AirlineAchievement),
            TAG_SCREENSHOTS_UPLOADED => Some(EventType::ScreenshotsUploaded),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            EventType::FlightDeparted => TAG_FLIGHT_DEPARTED,
            EventType::FlightCompleted => TAG_FLIGHT_COMPLETED,
            EventType::AirlineAchievement => TAG_AIRLINE_ACHIEVEMENT,
            EventType::ScreenshotsUploaded => TAG_SCREENSHOTS_UPLOADED,
        }
    }

    /// Embed color (24-bit RGB) used for every notification of this type.
    pub fn color(self) -> u32 {
        match self {
            EventType::FlightDeparted => 0x1d9bf0,
            EventType::FlightCompleted => 0x3aa655,
            EventType::AirlineAchievement => 0xffcc00,
            EventType::ScreenshotsUploaded => 0x87ceeb,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Footer text shown under every embed: `FSHub • <event_type>`.
pub fn footer_text(tag: &str) -> String {
    format!("FSHub • {tag}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for ty in EventType::ALL {
            assert_eq!(EventType::from_tag(ty.tag()), Some(ty));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(EventType::from_tag("some.unknown.event"), None);
        assert_eq!(EventType::from_tag(""), None);
        assert_eq!(EventType::from_tag("FLIGHT.DEPARTED"), None);
    }

    #[test]
    fn test_colors_distinct() {
        let mut colors: Vec<u32> = EventType::ALL.iter().map(|t| t.color()).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), 4);
        assert!(colors.iter().all(|c| *c <= 0xFFFFFF));
    }

    #[test]
    fn test_footer_text() {
        assert_eq!(
            footer_text(EventType::FlightDeparted.tag()),
            "FSHub • flight.departed"
        );
    }
}
