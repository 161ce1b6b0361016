//! Conversion of stored UTC instants into the display time zone.
//!
//! Storage always keeps UTC; local time only exists in rendered views.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn to_local(utc: DateTime<Utc>, zone: &Tz) -> DateTime<Tz> {
    utc.with_timezone(zone)
}

pub fn format_local(utc: DateTime<Utc>, zone: &Tz) -> String {
    to_local(utc, zone).format(DISPLAY_FORMAT).to_string()
}

/// Reattaches UTC to a timestamp read back from the store.
pub fn from_stored(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}
