use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

lazy_static! {
    static ref PAN_RE: Regex = Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// PAN: five upper-case letters, four digits, one upper-case letter.
pub fn is_valid_pan(pan: &str) -> bool {
    PAN_RE.is_match(pan)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Returns the required headers absent from `present`, in `required` order.
pub fn missing_headers<'a>(present: &HashSet<&str>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|h| !present.contains(h))
        .collect()
}

/// A mandatory text cell: `None` when blank.
pub fn non_blank(value: &str) -> Option<&str> {
    let v = value.trim();
    (!v.is_empty()).then_some(v)
}

pub fn parse_amount(raw: &str) -> Result<Option<f64>, String> {
    let Some(v) = non_blank(raw) else {
        return Ok(None);
    };
    match v.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        _ => Err(format!("Invalid amount: {v}")),
    }
}

/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY` or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Result<Option<OffsetDateTime>, String> {
    let Some(v) = non_blank(raw) else {
        return Ok(None);
    };
    if let Ok(d) = Date::parse(v, format_description!("[year]-[month]-[day]")) {
        return Ok(Some(d.midnight().assume_utc()));
    }
    if let Ok(d) = Date::parse(v, format_description!("[day]/[month]/[year]")) {
        return Ok(Some(d.midnight().assume_utc()));
    }
    OffsetDateTime::parse(v, &Rfc3339)
        .map(Some)
        .map_err(|_| format!("Invalid date: {v}"))
}
