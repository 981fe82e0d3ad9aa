//! Coercion helpers for raw row values.
//!
//! Raw values arrive either as strings (CSV) or as JSON numbers. Every helper
//! returns `None` rather than a default when a value cannot be coerced, so
//! callers can drop the row.

use serde_json::Value;

/// Result of interpreting a raw month field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthField {
    /// The row is a yearly total.
    Aggregate,
    /// A calendar month in `1..=12`.
    Month(u32),
    /// Anything else.
    Invalid,
}

/// Renders a raw value as text. Integral numbers render without a
/// fractional part (`202001.0` becomes `"202001"`).
#[must_use]
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.is_finite() && f.fract() == 0.0 {
                    Some(format!("{f:.0}"))
                } else {
                    Some(f.to_string())
                }
            }
        }
        _ => None,
    }
}

/// Parses a year. Accepts integers and integral floats (`"2019.0"`).
#[must_use]
pub fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .or_else(|| n.as_f64().and_then(integral_to_i32)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_to_i32))
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral_to_i32(f: f64) -> Option<i32> {
    (f.is_finite() && f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX))
        .then_some(f as i32)
}

/// Parses an accident count. Empty strings and non-finite numbers are
/// rejected.
#[must_use]
pub fn parse_count(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Interprets a month field.
///
/// The text is trimmed and lower-cased first; a match against
/// `aggregate_token` (also lower-cased) marks a yearly total. Otherwise the
/// last two characters are parsed, so both `"3"` and `"202003"` yield
/// March.
#[must_use]
pub fn parse_month(raw: &str, aggregate_token: &str) -> MonthField {
    let text = raw.trim().to_lowercase();
    if text == aggregate_token.trim().to_lowercase() {
        return MonthField::Aggregate;
    }

    let tail: String = {
        let mut chars: Vec<char> = text.chars().rev().take(2).collect();
        chars.reverse();
        chars.into_iter().collect()
    };

    match tail.parse::<u32>() {
        Ok(month) if (1..=12).contains(&month) => MonthField::Month(month),
        _ => MonthField::Invalid,
    }
}
