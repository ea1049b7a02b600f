// [[RARO]]/apps/insight-kernel/src/detect/mod.rs
// Purpose: Structural detection of renderable shapes inside tool outputs.
// Architecture: Domain Logic Layer
// Dependencies: Serde, Chrono
//
// Tool outputs come from many schema-less market-data sources and carry no
// type tag. Every heuristic here is structural and returns None rather than
// guessing.

mod chart;
mod structured;

use std::borrow::Cow;

use serde_json::{Map, Value};

pub use chart::{detect_chartable_data, CategoryValue, ChartableData, PeriodRow, SeriesPoint};
pub use structured::{detect_structured_data, CompanyProfile, NewsItem, PriceQuote, StructuredData};

/// Renders a magnitude with a T/B/M/K suffix at one decimal; smaller values
/// as whole numbers.
pub fn format_large_number(value: f64) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }

    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        return format!("{:.0}", value);
    };

    format!("{:.1}{}", scaled, suffix)
}

/// Accepts an object, or a string holding a JSON object. Anything else,
/// including unparsable strings, is "no opinion".
pub(crate) fn as_object(payload: &Value) -> Option<Cow<'_, Map<String, Value>>> {
    match payload {
        Value::Object(map) => Some(Cow::Borrowed(map)),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(Cow::Owned(map)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Tool output is not JSON, skipping shape detection: {}", e);
                None
            }
        },
        _ => None,
    }
}

pub(crate) fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// First key in `keys` that holds a number.
pub(crate) fn first_number(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| map.get(*k).and_then(number))
}

/// First key in `keys` that holds a non-blank string.
pub(crate) fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
