use crate::locale::Locale;
use crate::model::{Attribute, AttributeType, Dataset, Value};
use serde::Serialize;

/// Placeholder shown for missing data.
pub const EN_DASH: &str = "\u{2013}";

pub const METERS_PER_MILE: f64 = 1609.344;
pub const METERS_PER_KM: f64 = 1000.0;

/// Render a value for display according to its attribute type.
pub fn format_attr(attribute: &Attribute, value: Option<&Value>, ds: &Dataset, locale: &Locale) -> String {
    let value = match value {
        None => return EN_DASH.to_string(),
        Some(Value::Str(s)) if s.is_empty() => return EN_DASH.to_string(),
        Some(v) => v,
    };
    match (attribute.kind, value) {
        (AttributeType::Contact, Value::Str(s)) => {
            let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '|');
            if trimmed.is_empty() {
                EN_DASH.to_string()
            } else {
                trimmed.replace('|', ", ")
            }
        }
        (AttributeType::Date, Value::Str(s)) => match s.find('T') {
            Some(t) => s[..t].to_string(),
            None => s.clone(),
        },
        (AttributeType::Bool, v) => {
            if v.is_truthy() {
                locale.get("YES")
            } else {
                locale.get("NO")
            }
        }
        (AttributeType::Choice, Value::Str(s)) => ds.translate_value(s).to_string(),
        (AttributeType::Multi, v) => {
            let tokens = v.tokens();
            if tokens.is_empty() {
                return EN_DASH.to_string();
            }
            tokens
                .iter()
                .map(|t| ds.translate_value(t).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
        (_, v) => format_value(v),
    }
}

/// Plain rendering: missing data becomes an en dash.
pub fn render_or_dash(value: Option<&Value>) -> String {
    match value {
        None => EN_DASH.to_string(),
        Some(Value::Str(s)) if s.is_empty() => EN_DASH.to_string(),
        Some(v) => format_value(v),
    }
}

fn format_value(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => items.join(", "),
        Value::Location(p) => format!("{}, {}", p.lat, p.lon),
    }
}

pub fn format_number(num: f64, decimal_places: usize) -> String {
    format!("{:.*}", decimal_places, num)
}

/// "3.1 miles (5.00 km)".
pub fn format_distance(meters: f64, locale: &Locale) -> String {
    let miles = format_number(meters / METERS_PER_MILE, 1);
    let km = format_number(meters / METERS_PER_KM, 2);
    locale.message("DISTANCE", &[("MILES", miles.as_str()), ("KM", km.as_str())])
}

/// Text for the "last updated" indicator and how long until it should be
/// refreshed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Freshness {
    pub text: String,
    pub refresh_ms: u32,
}

pub fn freshness(now_s: f64, timestamp_s: Option<f64>, locale: &Locale) -> Freshness {
    let ts = match timestamp_s {
        Some(t) if t > 0.0 => t,
        _ => {
            return Freshness { text: locale.get("NO_REPORTS_RECEIVED"), refresh_ms: 0 };
        }
    };
    let seconds = now_s - ts;
    let minutes = seconds / 60.0;
    let hours = seconds / 3600.0;
    let (age, refresh_ms) = if hours >= 1.05 {
        let h = format!("{}", (hours * 10.0).ceil() / 10.0);
        (locale.message("HOURS_AGO", &[("HOURS", h.as_str())]), 60_000)
    } else if minutes >= 1.5 {
        let m = format!("{}", minutes.ceil());
        (locale.message("MINUTES_AGO", &[("MINUTES", m.as_str())]), 10_000)
    } else if seconds >= 1.5 {
        let s = format!("{}", seconds.ceil());
        (locale.message("SECONDS_AGO", &[("SECONDS", s.as_str())]), 1_000)
    } else if seconds > 0.0 {
        (locale.get("SECOND_AGO"), 1_000)
    } else {
        let s = format!("{}", (-seconds).round());
        (locale.message("SECONDS_IN_FUTURE", &[("SECONDS", s.as_str())]), 1_000)
    };
    Freshness { text: locale.message("LAST_UPDATED", &[("AGE", age.as_str())]), refresh_ms }
}
