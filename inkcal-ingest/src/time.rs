//! Local-date helpers for the display window.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: &str = "Europe/Oslo";

/// Parse an IANA zone name like "Europe/Oslo".
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {name}"))
}

/// Calendar date of `now` as seen in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// `YYYY-MM-DD` prefix of an ISO date or datetime string.
pub fn date_prefix(iso: &str) -> Option<&str> {
    iso.get(..10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn oslo_is_ahead_of_utc_at_midnight() {
        let tz = parse_timezone("Europe/Oslo").unwrap();
        // 23:30 UTC in October is 01:30 the next day in Oslo (CEST, UTC+2)
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 23, 30, 0).unwrap();
        assert_eq!(local_date(now, tz), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    }

    #[test]
    fn bad_zone_is_an_error() {
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn prefix_needs_ten_bytes() {
        assert_eq!(date_prefix("2026-10-16T07:00:00Z"), Some("2026-10-16"));
        assert_eq!(date_prefix("2026-10"), None);
    }
}
