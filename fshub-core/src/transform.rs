//! Transformers — one pure function per FSHub event type, each turning
//! event data into a [`NotificationDocument`].
//!
//! None of these can fail. Missing values render as `"N/A"`; optional
//! link fields are dropped when no id resolves.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::embed::{EmbedBuilder, NotificationDocument};
use crate::extract::*;
use crate::types::EventType;

const FSHUB_BASE_URL: &str = "https://fshub.io";

/// Achievement descriptions are cut to this many characters.
pub const ACHIEVEMENT_DESCRIPTION_MAX: usize = 160;

/// Field labels as shown in Discord.
pub mod label {
    pub const PILOT: &str = "👨‍✈️ Pilot";
    pub const AIRCRAFT: &str = "✈️ Aircraft";
    pub const REGISTRATION: &str = "🔢 Registration";
    pub const CALLSIGN: &str = "📡 Callsign";
    pub const DEPARTURE: &str = "🛫 Departure";
    /// Departure ICAO code on the departure embed.
    pub const DEPARTURE_CODE: &str = "📍 Departure";
    pub const DESTINATION: &str = "🎯 Destination";
    pub const ARRIVAL: &str = "🛬 Arrival";
    pub const CRUISE_ALTITUDE: &str = "🏔️ Cruise altitude";
    pub const CRUISE_ALTITUDE_ARRIVAL: &str = "🛫 Cruise altitude";
    pub const TAS: &str = "⚡ TAS";
    pub const HEADING: &str = "🧭 Heading";
    pub const WIND: &str = "💨 Wind";
    pub const FUEL: &str = "⛽ Fuel";
    pub const ZFW: &str = "⚖️ ZFW";
    pub const SCHEDULE: &str = "🕒 Schedule";
    pub const FLIGHT_REPORT: &str = "🔗 Flight report";
    pub const DISTANCE: &str = "🧭 Distance";
    pub const FUEL_BURNED: &str = "🔥 Fuel burned";
    pub const PLANNED_ROUTE: &str = "🗺️ Planned route";
    pub const LANDING_RATE: &str = "🛬 Landing rate";
    pub const LANDING_QUALITY: &str = "🎯 Landing quality";
    pub const PITCH: &str = "↕️ Pitch";
    pub const BANK: &str = "🔄️ Bank";
    pub const STATUS: &str = "📅 Status";
    pub const DESCRIPTION: &str = "📖 Description";
    pub const VIEW_ACHIEVEMENT: &str = "🔗 View achievement";
    pub const CONGRATULATIONS: &str = "🎉 Congratulations";
    pub const TIME: &str = "🕒 Time";
    pub const COORDINATES: &str = "🧭 Coordinates";
    pub const FLIGHT_LINK: &str = "🔗 Flight link";
}

/// Section-break titles.
pub mod section {
    pub const ROUTE: &str = "🗺️ Route & Flight level";
    pub const NAVIGATION: &str = "✈️ Navigation data";
    pub const WEIGHTS: &str = "📦 Weights";
    pub const FLIGHT_INFO: &str = "💺 Flight information";
    pub const FLIGHT_DATA: &str = "✈️ Flight data";
    pub const LANDING: &str = "🛬 Landing & Weather";
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Build the document for a supported event type.
pub fn transform(event_type: EventType, data: &Value) -> NotificationDocument {
    match event_type {
        EventType::FlightDeparted => departure(data),
        EventType::FlightCompleted => flight_report(data),
        EventType::AirlineAchievement => achievement(data),
        EventType::ScreenshotsUploaded => screenshot(data),
    }
}

/// Build the document for a raw tag. Unknown tags yield a document with
/// no fields, which is not deliverable.
pub fn transform_tag(tag: &str, data: &Value) -> NotificationDocument {
    match EventType::from_tag(tag) {
        Some(ty) => transform(ty, data),
        None => NotificationDocument::unhandled(tag),
    }
}

pub fn flight_report_url(flight_id: &str) -> String {
    format!("{FSHUB_BASE_URL}/flight/{flight_id}/report")
}

pub fn achievement_url(id: &str, slug: &str) -> String {
    format!("{FSHUB_BASE_URL}/achievement/{id}-{slug}/overview")
}

// ---------------------------------------------------------------------------
// flight.departed
// ---------------------------------------------------------------------------

pub fn departure(d: &Value) -> NotificationDocument {
    let user = get(d, &["user"]);
    let aircraft = get(d, &["aircraft"]);
    let plan = get(d, &["plan"]);
    let airport = get(d, &["airport"]);
    let schedule = get(d, &["schedule"]);

    let pilot = text_or(get_in(user, &["name"]), "A pilot");
    let airport_name = first_text(
        [get_in(airport, &["name"]), get_in(plan, &["departure"])],
        "an airport",
    );

    let mut embed = EmbedBuilder::new(
        EventType::FlightDeparted,
        format!("🛫 {pilot} just departed from **{airport_name}**"),
    );

    let airport_known = get_in(airport, &["icao"]).is_some() || get_in(airport, &["name"]).is_some();
    if airport_known {
        embed.description(format_airport(airport));
    }

    embed
        .inline(label::PILOT, safe_string(get_in(user, &["name"])))
        .inline(label::AIRCRAFT, safe_string(get_in(aircraft, &["icao"])))
        .inline(
            label::REGISTRATION,
            safe_string(get_in(aircraft, &["user_conf", "tail"])),
        );

    embed
        .section(section::ROUTE)
        .inline(
            label::DEPARTURE_CODE,
            first_text(
                [get_in(plan, &["departure"]), get_in(airport, &["icao"])],
                NOT_AVAILABLE,
            ),
        )
        .inline(label::DESTINATION, safe_string(get_in(plan, &["arrival"])))
        .inline(
            label::CRUISE_ALTITUDE,
            flight_level(get_in(plan, &["cruise_lvl"])),
        );

    embed
        .section(section::NAVIGATION)
        .inline(label::TAS, with_unit(get(d, &["speed_tas"]), " kt"))
        .inline(label::HEADING, with_unit(get(d, &["heading", "true"]), "°"))
        .inline(label::WIND, format_wind(get(d, &["wind"])));

    let time = safe_string(get_in(schedule, &["time"]));
    let status = safe_string(get_in(schedule, &["status"]));

    embed
        .section(section::WEIGHTS)
        .inline(label::FUEL, with_unit(get(d, &["weight", "fuel"]), " kg"))
        .inline(label::ZFW, with_unit(get(d, &["weight", "zfw"]), " kg"))
        .block(label::SCHEDULE, format!("{time} • {status}"));

    embed.build()
}

// ---------------------------------------------------------------------------
// flight.completed
// ---------------------------------------------------------------------------

pub fn flight_report(d: &Value) -> NotificationDocument {
    let user = get(d, &["user"]);
    let aircraft = get(d, &["aircraft"]);
    let plan = get(d, &["plan"]);
    let departure = get(d, &["departure"]);
    let arrival = get(d, &["arrival"]);
    let distance = get(d, &["distance"]);

    let pilot = text_or(get_in(user, &["name"]), "A pilot");
    let airport_name = first_text(
        [
            get_in(arrival, &["airport", "name"]),
            get_in(plan, &["icao_arr"]),
        ],
        "an airport",
    );

    let mut embed = EmbedBuilder::new(
        EventType::FlightCompleted,
        format!("🛬 {pilot} just landed at **{airport_name}**"),
    );

    if let Some(id) = truthy_text(first_present([get(d, &["flight_id"]), get(d, &["id"])])) {
        embed.block(
            label::FLIGHT_REPORT,
            format!("[View flight]({})", flight_report_url(&id)),
        );
    }

    embed
        .section(section::FLIGHT_INFO)
        .inline(label::PILOT, safe_string(get_in(user, &["name"])))
        .inline(label::AIRCRAFT, safe_string(get_in(aircraft, &["icao"])))
        .inline(
            label::REGISTRATION,
            safe_string(get_in(aircraft, &["user_conf", "tail"])),
        )
        .inline(
            label::CALLSIGN,
            first_text(
                [get_in(plan, &["flight_no"]), get_in(plan, &["callsign"])],
                NOT_AVAILABLE,
            ),
        )
        .inline(
            label::DEPARTURE,
            airport_pair(
                get_in(plan, &["icao_dep"]),
                get_in(departure, &["airport", "name"]),
            ),
        )
        .inline(
            label::ARRIVAL,
            airport_pair(
                get_in(plan, &["icao_arr"]),
                get_in(arrival, &["airport", "name"]),
            ),
        );

    let route = match truthy_text(get_in(plan, &["route"])) {
        Some(r) => format!("`{r}`"),
        None => NOT_AVAILABLE.to_string(),
    };

    embed
        .section(section::FLIGHT_DATA)
        .inline(
            label::CRUISE_ALTITUDE_ARRIVAL,
            flight_level(get_in(plan, &["cruise_lvl"])),
        )
        .inline(label::DISTANCE, format_distance(distance))
        .inline(label::FUEL_BURNED, with_unit(get(d, &["fuel_burnt"]), " kg"))
        .block(label::PLANNED_ROUTE, route);

    let landing_rate = get_in(arrival, &["landing_rate"]);

    embed
        .section(section::LANDING)
        .inline(label::LANDING_RATE, with_unit(landing_rate, " fpm"))
        .inline(
            label::LANDING_QUALITY,
            classify_landing_rate(optional_number(landing_rate)),
        )
        .inline(label::PITCH, with_unit(get_in(arrival, &["pitch"]), "°"))
        .inline(label::BANK, with_unit(get_in(arrival, &["bank"]), "°"))
        .inline(label::WIND, format_wind(get_in(arrival, &["wind"])))
        .inline(label::STATUS, safe_string(get(d, &["schedule_status"])));

    embed.build()
}

/// `ICAO – Name`, else whichever is known, else `"N/A"`.
fn airport_pair(icao: Option<&Value>, name: Option<&Value>) -> String {
    match (truthy_text(icao), truthy_text(name)) {
        (Some(i), Some(n)) => format!("{i} – {n}"),
        (Some(i), None) => i,
        (None, Some(n)) => n,
        (None, None) => NOT_AVAILABLE.to_string(),
    }
}

/// `3100 NM (5741 km)`; the km part is optional, nm is required.
fn format_distance(distance: Option<&Value>) -> String {
    let Some(nm) = get_in(distance, &["nm"]).and_then(scalar_text) else {
        return NOT_AVAILABLE.to_string();
    };
    match get_in(distance, &["km"]).and_then(scalar_text) {
        Some(km) => format!("{nm} NM ({km} km)"),
        None => format!("{nm} NM"),
    }
}

// ---------------------------------------------------------------------------
// airline.achievement
// ---------------------------------------------------------------------------

pub fn achievement(d: &Value) -> NotificationDocument {
    let ach = get(d, &["achievement"]);

    let pilot = first_text(
        [get(d, &["flight", "user", "name"]), get(d, &["user", "name"])],
        NOT_AVAILABLE,
    );
    let title = safe_string(get_in(ach, &["title"]));
    let description = truncate_at_word_boundary(
        &safe_string(get_in(ach, &["description"])),
        ACHIEVEMENT_DESCRIPTION_MAX,
    );

    let mut embed = EmbedBuilder::new(
        EventType::AirlineAchievement,
        format!("🏅 **{pilot} unlocked the achievement “{title}”!**"),
    );

    embed.block(label::DESCRIPTION, description);

    let id = truthy_text(get_in(ach, &["id"]));
    let slug = truthy_text(get_in(ach, &["slug"]));
    if let (Some(id), Some(slug)) = (id, slug) {
        embed.block(
            label::VIEW_ACHIEVEMENT,
            format!("[Open on FsHub]({})", achievement_url(&id, &slug)),
        );
    }

    embed.block(label::CONGRATULATIONS, format!("Well done **{pilot}**! 🎊"));

    embed.build()
}

// ---------------------------------------------------------------------------
// screenshots.uploaded
// ---------------------------------------------------------------------------

pub fn screenshot(d: &Value) -> NotificationDocument {
    let empty = Value::Object(Default::default());
    let s = match d {
        Value::Array(items) => items.first().unwrap_or(&empty),
        other => other,
    };

    let time = truthy_text(get(s, &["datetime"]))
        .and_then(|t| parse_datetime(&t))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let lat = get(s, &["lat"]).and_then(scalar_text);
    let lng = get(s, &["lng"]).and_then(scalar_text);
    let coords = match (lat, lng) {
        (Some(lat), Some(lng)) => format!("{lat}, {lng}"),
        _ => NOT_AVAILABLE.to_string(),
    };

    let mut embed = EmbedBuilder::new(
        EventType::ScreenshotsUploaded,
        "📸 New screenshots have been uploaded",
    );

    embed
        .inline(label::TIME, time)
        .inline(label::COORDINATES, coords);

    if let Some(id) = truthy_text(get(s, &["flight_id"])) {
        embed.block(
            label::FLIGHT_LINK,
            format!("[View flight]({})", flight_report_url(&id)),
        );
    }

    embed.image(truthy_text(get(s, &["screenshot_url"])));

    embed.build()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse the loose datetime strings FSHub and test payloads use.
/// Zoned values are converted to UTC; naive values are taken as UTC.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = text.parse().ok()?;
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
