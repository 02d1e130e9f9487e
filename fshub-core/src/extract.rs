//! Safe access into loosely-typed FSHub JSON.
//!
//! Every accessor returns `Option` or a rendered fallback; nothing here
//! panics or errors on missing, null, or oddly-typed input. Missing leaf
//! values render as [`NOT_AVAILABLE`].

use serde_json::Value;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Placeholder for any value the event did not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Appended to text cut by [`truncate_at_word_boundary`].
pub const ELLIPSIS: char = '…';

const FEET_PER_FLIGHT_LEVEL: f64 = 100.0;

// Landing rate buckets, fpm. Upper bound exclusive.
const LANDING_ULTRA_SMOOTH: f64 = -120.0;
const LANDING_SOFT: f64 = -220.0;
const LANDING_NORMAL: f64 = -350.0;
const LANDING_FIRM: f64 = -500.0;

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Walk `path` through nested objects. JSON `null` counts as absent.
pub fn get<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Like [`get`] but starting from an optional value.
pub fn get_in<'a>(value: Option<&'a Value>, path: &[&str]) -> Option<&'a Value> {
    value.and_then(|v| get(v, path))
}

/// First candidate that is present (null-coalescing chain).
pub fn first_present<'a, const N: usize>(candidates: [Option<&'a Value>; N]) -> Option<&'a Value> {
    candidates.into_iter().flatten().next()
}

/// Text of the first candidate with a non-empty scalar value, else `fallback`.
pub fn first_text<const N: usize>(candidates: [Option<&Value>; N], fallback: &str) -> String {
    candidates
        .into_iter()
        .flatten()
        .filter_map(scalar_text)
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Loose truthiness: null, `false`, `0`, `""`, `"0"`, and empty
/// arrays/objects are all false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Render a scalar as display text. Arrays, objects and null yield `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(n.to_string())
            } else {
                n.as_f64().map(format_number)
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Text for a truthy scalar, `None` otherwise.
pub fn truthy_text(value: Option<&Value>) -> Option<String> {
    value.filter(|v| is_truthy(v)).and_then(scalar_text)
}

/// Value coerced to text if present and non-empty, else `"N/A"`.
pub fn safe_string(value: Option<&Value>) -> String {
    value
        .and_then(scalar_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Like [`safe_string`] with a caller-chosen fallback.
pub fn text_or(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(scalar_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Numeric value of a number or numeric string.
pub fn optional_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Format a number without a trailing `.0` for whole values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Cut `text` to `max_len` characters without leaving a partial word,
/// then append an ellipsis. Short text and `"N/A"` are returned as-is.
pub fn truncate_at_word_boundary(text: &str, max_len: usize) -> String {
    if text == NOT_AVAILABLE || text.chars().count() <= max_len {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_len).collect();
    let mut kept = match cut.rfind(char::is_whitespace) {
        Some(idx) => cut[..idx].trim_end().to_string(),
        None => cut,
    };
    kept.push(ELLIPSIS);
    kept
}

/// Landing quality label for a touchdown rate in fpm.
pub fn classify_landing_rate(rate: Option<f64>) -> &'static str {
    let Some(r) = rate else {
        return NOT_AVAILABLE;
    };
    if r > LANDING_ULTRA_SMOOTH {
        "Ultra smooth"
    } else if r > LANDING_SOFT {
        "Soft"
    } else if r > LANDING_NORMAL {
        "Normal"
    } else if r > LANDING_FIRM {
        "Firm"
    } else {
        "Hard landing"
    }
}

/// `ICAO – Name (City, Country)`; the locale suffix is dropped when both
/// parts are missing.
pub fn format_airport(airport: Option<&Value>) -> String {
    let icao = safe_string(get_in(airport, &["icao"]));
    let name = safe_string(get_in(airport, &["name"]));

    let city = truthy_text(get_in(airport, &["locale", "city"]));
    let country = truthy_text(get_in(airport, &["locale", "country"]));

    let suffix = match (city, country) {
        (Some(c), Some(k)) => format!(" ({c}, {k})"),
        (Some(c), None) => format!(" ({c})"),
        (None, Some(k)) => format!(" ({k})"),
        (None, None) => String::new(),
    };

    format!("{icao} – {name}{suffix}")
}

/// `FL370 (37000 ft)` from a cruise level. Accepts `370`, `"370"` and `"FL370"`.
pub fn flight_level(level: Option<&Value>) -> String {
    let numeric = optional_number(level).or_else(|| {
        let text = level.and_then(scalar_text)?;
        let stripped = text.trim();
        let stripped = stripped
            .strip_prefix("FL")
            .or_else(|| stripped.strip_prefix("fl"))?;
        stripped.trim().parse::<f64>().ok().filter(|f| f.is_finite())
    });

    match numeric {
        Some(fl) => format!(
            "FL{} ({} ft)",
            format_number(fl),
            format_number(fl * FEET_PER_FLIGHT_LEVEL)
        ),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `<value><unit>` or `"N/A"`.
pub fn with_unit(value: Option<&Value>, unit: &str) -> String {
    match value.and_then(scalar_text).filter(|s| !s.is_empty()) {
        Some(text) => format!("{text}{unit}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `15 kt @ 300°` from a `{speed, direction}` object. Needs at least a speed.
pub fn format_wind(wind: Option<&Value>) -> String {
    let Some(speed) = get_in(wind, &["speed"]).and_then(scalar_text) else {
        return NOT_AVAILABLE.to_string();
    };
    let direction = safe_string(get_in(wind, &["direction"]));
    format!("{speed} kt @ {direction}°")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested() {
        let v = json!({"a": {"b": {"c": 1}}, "n": null});
        assert_eq!(get(&v, &["a", "b", "c"]), Some(&json!(1)));
        assert!(get(&v, &["a", "x"]).is_none());
        assert!(get(&v, &["n"]).is_none());
        // Walking through a non-object stops cleanly
        assert!(get(&v, &["a", "b", "c", "d"]).is_none());
    }

    #[test]
    fn test_first_present() {
        let v = json!({"flight_no": "", "callsign": "AFU1"});
        let picked = first_present([get(&v, &["missing"]), get(&v, &["callsign"])]);
        assert_eq!(picked, Some(&json!("AFU1")));
        // Empty string is present, so it wins over later candidates
        let picked = first_present([get(&v, &["flight_no"]), get(&v, &["callsign"])]);
        assert_eq!(picked, Some(&json!("")));
    }

    #[test]
    fn test_first_text_skips_empty() {
        let v = json!({"flight_no": "", "callsign": "AFU1"});
        let text = first_text([get(&v, &["flight_no"]), get(&v, &["callsign"])], "N/A");
        assert_eq!(text, "AFU1");
        assert_eq!(first_text([get(&v, &["nope"])], "an airport"), "an airport");
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("TEST-1")));
        assert!(is_truthy(&json!(2707468)));
    }

    #[test]
    fn test_safe_string() {
        assert_eq!(safe_string(Some(&json!("B738"))), "B738");
        assert_eq!(safe_string(Some(&json!(370))), "370");
        assert_eq!(safe_string(Some(&json!(2.5))), "2.5");
        assert_eq!(safe_string(Some(&json!(""))), "N/A");
        assert_eq!(safe_string(Some(&json!({"a": 1}))), "N/A");
        assert_eq!(safe_string(None), "N/A");
    }

    #[test]
    fn test_optional_number() {
        assert_eq!(optional_number(Some(&json!(-155))), Some(-155.0));
        assert_eq!(optional_number(Some(&json!(" -81 "))), Some(-81.0));
        assert_eq!(optional_number(Some(&json!("soft"))), None);
        assert_eq!(optional_number(Some(&json!(true))), None);
        assert_eq!(optional_number(None), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(37000.0), "37000");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(48.72), "48.72");
    }

    #[test]
    fn test_truncate_short_unchanged() {
        let text = "A test achievement for documentation purposes!!!!!";
        assert_eq!(text.len(), 50);
        assert_eq!(truncate_at_word_boundary(text, 160), text);
        assert_eq!(truncate_at_word_boundary("N/A", 2), "N/A");
    }

    #[test]
    fn test_truncate_at_word_boundary() {
        let text = "A test achievement for documentation purposes, with extra trailing words \
                    to exceed one hundred sixty characters of total length for certain";
        let out = truncate_at_word_boundary(text, 100);
        assert!(out.ends_with('…'));
        let body = out.trim_end_matches('…');
        assert!(body.chars().count() <= 100);
        // Cut lands on a whole word of the original
        assert!(text.starts_with(body));
        let next = text[body.len()..].chars().next();
        assert_eq!(next, Some(' '));
        assert!(!body.ends_with(' '));
    }

    #[test]
    fn test_truncate_long_description() {
        let word = "flight ";
        let text = word.repeat(40);
        let out = truncate_at_word_boundary(text.trim_end(), 160);
        assert!(out.ends_with("flight…"));
        assert!(out.chars().count() <= 161);
    }

    #[test]
    fn test_truncate_no_whitespace() {
        let text = "x".repeat(20);
        let out = truncate_at_word_boundary(&text, 10);
        assert_eq!(out, format!("{}…", "x".repeat(10)));
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "é".repeat(30);
        let out = truncate_at_word_boundary(&text, 10);
        assert_eq!(out.chars().count(), 11);
    }

    #[test]
    fn test_classify_landing_rate() {
        assert_eq!(classify_landing_rate(Some(-119.0)), "Ultra smooth");
        assert_eq!(classify_landing_rate(Some(-120.0)), "Soft");
        assert_eq!(classify_landing_rate(Some(-219.0)), "Soft");
        assert_eq!(classify_landing_rate(Some(-220.0)), "Normal");
        assert_eq!(classify_landing_rate(Some(-350.0)), "Firm");
        assert_eq!(classify_landing_rate(Some(-499.0)), "Firm");
        assert_eq!(classify_landing_rate(Some(-500.0)), "Hard landing");
        assert_eq!(classify_landing_rate(Some(-501.0)), "Hard landing");
        assert_eq!(classify_landing_rate(None), "N/A");
    }

    #[test]
    fn test_format_airport() {
        let full = json!({
            "icao": "LFPG",
            "name": "Paris/CDG",
            "locale": {"city": "Paris", "country": "France"}
        });
        assert_eq!(format_airport(Some(&full)), "LFPG – Paris/CDG (Paris, France)");

        let city_only = json!({"icao": "LFPG", "name": "Paris/CDG", "locale": {"city": "Paris"}});
        assert_eq!(format_airport(Some(&city_only)), "LFPG – Paris/CDG (Paris)");

        let country_only = json!({"icao": "LFPG", "locale": {"country": "France"}});
        assert_eq!(format_airport(Some(&country_only)), "LFPG – N/A (France)");

        assert_eq!(format_airport(None), "N/A – N/A");
    }

    #[test]
    fn test_flight_level() {
        assert_eq!(flight_level(Some(&json!(370))), "FL370 (37000 ft)");
        assert_eq!(flight_level(Some(&json!("60"))), "FL60 (6000 ft)");
        assert_eq!(flight_level(Some(&json!("FL350"))), "FL350 (35000 ft)");
        assert_eq!(flight_level(Some(&json!("high"))), "N/A");
        assert_eq!(flight_level(None), "N/A");
    }

    #[test]
    fn test_with_unit() {
        assert_eq!(with_unit(Some(&json!(18000)), " kg"), "18000 kg");
        assert_eq!(with_unit(Some(&json!(350)), "°"), "350°");
        assert_eq!(with_unit(None, " kt"), "N/A");
    }

    #[test]
    fn test_format_wind() {
        let w = json!({"speed": 15, "direction": 300});
        assert_eq!(format_wind(Some(&w)), "15 kt @ 300°");
        let no_dir = json!({"speed": 15});
        assert_eq!(format_wind(Some(&no_dir)), "15 kt @ N/A°");
        let no_speed = json!({"direction": 300});
        assert_eq!(format_wind(Some(&no_speed)), "N/A");
    }
}
