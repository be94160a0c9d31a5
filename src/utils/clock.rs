//! Wall-clock helpers: epoch milliseconds for sample timestamps and the
//! `yyyy-MM-dd HH:mm:ss` (UTC) stamp written into the record header.

use chrono::{DateTime, Utc};

const RECORD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Milliseconds since the Unix epoch.
#[inline]
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as `yyyy-MM-dd HH:mm:ss` in UTC.
pub fn utc_timestamp() -> String {
    format_utc(&Utc::now())
}

pub fn format_utc(at: &DateTime<Utc>) -> String {
    at.format(RECORD_DATE_FORMAT).to_string()
}
