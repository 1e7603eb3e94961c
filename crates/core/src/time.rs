#![forbid(unsafe_code)]

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const EPOCH_RFC3339: &str = "1970-01-01T00:00:00Z";

/// Unix milliseconds, never negative.
pub fn now_ms() -> i64 {
    let ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(ms.max(0)).unwrap_or(i64::MAX)
}

/// Record timestamps as RFC 3339. Values outside the calendar range render as the epoch.
pub fn ts_ms_to_rfc3339(ts_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts_ms) * 1_000_000)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| EPOCH_RFC3339.to_string())
}
