//! Canned event data for test notifications.
//!
//! The data is fictional. Departure and arrival share a common flight
//! record; achievement and screenshot events carry their own shapes.

use chrono::Utc;
use serde_json::{json, Value};

use crate::types::EventType;

fn base_flight() -> Value {
    json!({
        "id": "TEST-12345",
        "user": {"name": "Test Pilot"},
        "aircraft": {
            "icao": "B738",
            "user_conf": {"tail": "F-TEST"}
        },
        "plan": {
            "callsign": "AFU1234",
            "flight_no": "AFU1234",
            "departure": "LFPG",
            "arrival": "KJFK",
            "route": "NIZAR UT420 GIPNO NATU",
            "cruise_lvl": 370,
            "icao_dep": "LFPG",
            "icao_arr": "KJFK"
        },
        "distance": {"nm": 3100, "km": 5741},
        "fuel_burnt": 15500
    })
}

/// Shallow merge: keys of `extra` replace keys of `base`.
fn merged(mut base: Value, extra: Value) -> Value {
    if let (Some(b), Value::Object(e)) = (base.as_object_mut(), extra) {
        for (k, v) in e {
            b.insert(k, v);
        }
    }
    base
}

/// Sample `_data` payload for an event type.
pub fn sample_data(event_type: EventType) -> Value {
    match event_type {
        EventType::FlightDeparted => merged(
            base_flight(),
            json!({
                "airport": {
                    "icao": "LFPG",
                    "name": "Paris/CDG",
                    "locale": {"city": "Paris", "country": "France"}
                },
                "weight": {"fuel": 18000, "zfw": 60000},
                "heading": {"true": 350},
                "wind": {"speed": 15, "direction": 300},
                "schedule": {"time": "10:30Z", "status": "Taxiing"},
                "speed_tas": 150
            }),
        ),
        EventType::FlightCompleted => merged(
            base_flight(),
            json!({
                "departure": {"airport": {"name": "Paris/CDG"}},
                "arrival": {
                    "airport": {"name": "New York/JFK"},
                    "landing_rate": -155,
                    "pitch": 2.5,
                    "bank": -0.5,
                    "wind": {"speed": 10, "direction": 270}
                },
                "schedule_status": "Arrived on time"
            }),
        ),
        EventType::AirlineAchievement => json!({
            "achievement": {
                "id": 23195,
                "title": "Visit Columbus!",
                "slug": "281-visit-columbus",
                "description": "A test achievement for documentation purposes!"
            },
            "flight": {
                "id": 2707468,
                "user": {
                    "id": 2,
                    "name": "Test Pilot",
                    "profile": {"avatar_url": "https://g.fshubcdn.com/avatars/u_2_80.png"}
                },
                "aircraft": {
                    "icao": "BE36",
                    "icao_name": "Beechcraft G36 Bonanza",
                    "user_conf": {"tail": "F-TEST"}
                },
                "plan": {
                    "callsign": "YON112",
                    "cruise_lvl": 60,
                    "route": "KMCN DCT KCSG",
                    "icao_dep": "KMCN",
                    "icao_arr": "KCSG"
                },
                "departure": {"airport": {"icao": "KMCN", "name": "Middle Georgia Regl"}},
                "arrival": {
                    "airport": {"icao": "KCSG", "name": "Columbus Metro"},
                    "landing_rate": -81,
                    "pitch": -3,
                    "bank": 0
                }
            },
            "airline": {
                "id": 281,
                "name": "Yondair",
                "profile": {"abbreviation": "YON"}
            }
        }),
        EventType::ScreenshotsUploaded => json!([{
            "flight_id": "TEST-12345",
            "screenshot_url": "https://picsum.photos/800/600",
            "lat": 48.72,
            "lng": 2.37,
            "datetime": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
        }]),
    }
}

/// Full webhook envelope (`_type` + `_data`) for an event type.
pub fn sample_envelope(event_type: EventType) -> Value {
    json!({
        "_type": event_type.tag(),
        "_data": sample_data(event_type),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_departure_merges_base() {
        let d = sample_data(EventType::FlightDeparted);
        assert_eq!(d["plan"]["cruise_lvl"], 370);
        assert_eq!(d["airport"]["icao"], "LFPG");
        assert_eq!(d["user"]["name"], "Test Pilot");
    }

    #[test]
    fn test_screenshot_is_list() {
        let d = sample_data(EventType::ScreenshotsUploaded);
        assert_eq!(d.as_array().map(|a| a.len()), Some(1));
    }

    #[test]
    fn test_envelope_tag() {
        for ty in EventType::ALL {
            let env = sample_envelope(ty);
            assert_eq!(env["_type"], ty.tag());
            assert!(!env["_data"].is_null());
        }
    }
}
