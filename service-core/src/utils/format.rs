//! Display formatting and lenient parsing helpers shared by the services.
//!
//! Dates are always rendered in the marketplace's home time zone.

use chrono::{DateTime, TimeZone};
use chrono_tz::{America::Vancouver, Tz};

pub const TIMEZONE: Tz = Vancouver;

fn raw_format_date<Z: TimeZone>(date: &DateTime<Z>, pattern: &str, with_time_zone: bool) -> String {
    let local = date.with_timezone(&TIMEZONE);
    if with_time_zone {
        local.format(&format!("{} %Z", pattern)).to_string()
    } else {
        local.format(pattern).to_string()
    }
}

/// `Sep 4, 1986 8:30 PM`
pub fn format_date_and_time<Z: TimeZone>(date: &DateTime<Z>, with_time_zone: bool) -> String {
    raw_format_date(date, "%b %-d, %Y %-I:%M %p", with_time_zone)
}

/// `Sep 4, 1986`
pub fn format_date<Z: TimeZone>(date: &DateTime<Z>, with_time_zone: bool) -> String {
    raw_format_date(date, "%b %-d, %Y", with_time_zone)
}

/// `8:30 PM`
pub fn format_time<Z: TimeZone>(date: &DateTime<Z>, with_time_zone: bool) -> String {
    raw_format_date(date, "%-I:%M %p", with_time_zone)
}

pub fn format_terms_agreement_date<Z: TimeZone>(
    date: Option<&DateTime<Z>>,
    you: &str,
    have: &str,
) -> String {
    match date {
        Some(date) => format!(
            "{} agreed to the Terms and Conditions on {} at {}.",
            you,
            format_date(date, false),
            format_time(date, true)
        ),
        None => format!("{} {} not agreed to the Terms & Conditions.", you, have),
    }
}

/// Parse JSON without surfacing the parse error; `None` when `raw` is not valid JSON.
pub fn parse_json_safely(raw: &str) -> Option<serde_json::Value> {
    serde_json::from_str(raw).ok()
}
