//! Timezone-aware day-boundary helpers.
//!
//! Grounded on the original `utils/timezone.py`: all day-boundary queries
//! convert the current UTC instant into the configured IANA timezone before
//! computing local midnight, then convert the boundary back to UTC so
//! storage comparisons stay in a single timezone.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse an IANA timezone name, falling back to UTC with a warning on failure.
pub fn parse_tz(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        tracing::warn!(timezone = %name, "unknown timezone, falling back to UTC");
        Tz::UTC
    })
}

/// Start of the local day (00:00:00) containing `instant`, in the given timezone,
/// returned as a UTC instant.
pub fn start_of_day(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = instant.with_timezone(&tz);
    let midnight = local.date_naive().and_hms_opt(0, 0, 0).expect("valid time");
    tz.from_local_datetime(&midnight)
        .single()
        .unwrap_or(local)
        .with_timezone(&Utc)
}

/// End of the local day (the following midnight, exclusive) containing `instant`.
pub fn end_of_day(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    start_of_day(instant, tz) + Duration::days(1)
}

/// `true` if `instant` falls within "today" in the given timezone, relative to `now`.
pub fn is_today(instant: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> bool {
    instant >= start_of_day(now, tz) && instant < end_of_day(now, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn start_and_end_of_day_span_24_hours() {
        let tz = parse_tz("Europe/Moscow");
        let instant = Utc.with_ymd_and_hms(2026, 3, 5, 10, 30, 0).unwrap();
        let start = start_of_day(instant, tz);
        let end = end_of_day(instant, tz);
        assert_eq!(end - start, Duration::days(1));
        assert!(start <= instant && instant < end);
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(parse_tz("Not/ARealZone"), Tz::UTC);
    }

    #[test]
    fn is_today_boundary() {
        let tz = parse_tz("UTC");
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 23, 59, 0).unwrap();
        let earlier_today = Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 1).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2026, 3, 4, 23, 59, 59).unwrap();
        assert!(is_today(earlier_today, now, tz));
        assert!(!is_today(yesterday, now, tz));
    }
}
