//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for state mutations, events, last-triggered marks, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// The format persisted rows are stamped with: `DD-MM-YYYY HH:MM:SS`.
///
/// Chosen to match the on-disk layout this gateway's persisted-state table
/// has always used, so existing database files remain readable.
pub const PERSISTED_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Format a timestamp the way the state repository stamps persisted rows.
#[must_use]
pub fn format_persisted(ts: Timestamp) -> String {
    ts.format(PERSISTED_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_format_persisted_timestamp_as_day_month_year() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 27, 13, 5, 9).unwrap();
        assert_eq!(format_persisted(ts), "27-07-2026 13:05:09");
    }
}
