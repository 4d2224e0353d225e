use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// The single output format for every normalised timestamp.
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Renders absolute instants (epoch timestamps) as wall-clock time in a
/// configured zone.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    zone: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { zone: Tz::UTC }
    }
}

impl TimezoneHandler {
    /// Create a handler for `tz_name`.
    ///
    /// `"auto"` resolves to the system timezone. An unrecognised name falls
    /// back to UTC and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let resolved = if tz_name.eq_ignore_ascii_case("auto") {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let zone = resolved.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                resolved
            );
            Tz::UTC
        });
        Self { zone }
    }

    /// Validate that `tz_name` is `"auto"` or a recognised IANA identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.eq_ignore_ascii_case("auto") || tz_name.parse::<Tz>().is_ok()
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Convert epoch milliseconds to local wall-clock time, truncated to
    /// whole seconds. Returns `None` when out of chrono's range.
    pub fn local_from_epoch_millis(&self, millis: i64) -> Option<NaiveDateTime> {
        let secs = millis.div_euclid(1000);
        let utc: DateTime<Utc> = DateTime::from_timestamp(secs, 0)?;
        Some(utc.with_timezone(&self.zone).naive_local())
    }
}

/// Parse a canonical timestamp string back into a naive date-time.
pub fn parse_canonical(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, CANONICAL_TIMESTAMP_FORMAT).ok()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_utc() {
        assert_eq!(TimezoneHandler::default().zone(), Tz::UTC);
    }

    #[test]
    fn test_invalid_timezone_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Mars/Olympus_Mons");
        assert_eq!(handler.zone(), Tz::UTC);
    }

    #[test]
    fn test_validate_timezone() {
        assert!(TimezoneHandler::validate_timezone("UTC"));
        assert!(TimezoneHandler::validate_timezone("America/Lima"));
        assert!(TimezoneHandler::validate_timezone("auto"));
        assert!(!TimezoneHandler::validate_timezone("Not/AZone"));
    }

    #[test]
    fn test_epoch_millis_utc() {
        let handler = TimezoneHandler::new("UTC");
        let dt = handler.local_from_epoch_millis(1_700_000_000_123).unwrap();
        assert_eq!(
            dt.format(CANONICAL_TIMESTAMP_FORMAT).to_string(),
            "2023-11-14T22:13:20"
        );
    }

    #[test]
    fn test_epoch_millis_in_named_zone() {
        // Lima is UTC-5 with no DST.
        let handler = TimezoneHandler::new("America/Lima");
        let dt = handler.local_from_epoch_millis(1_700_000_000_000).unwrap();
        assert_eq!(
            dt.format(CANONICAL_TIMESTAMP_FORMAT).to_string(),
            "2023-11-14T17:13:20"
        );
    }

    #[test]
    fn test_epoch_millis_negative_truncates_toward_past() {
        let handler = TimezoneHandler::new("UTC");
        let dt = handler.local_from_epoch_millis(-1).unwrap();
        assert_eq!(
            dt.format(CANONICAL_TIMESTAMP_FORMAT).to_string(),
            "1969-12-31T23:59:59"
        );
    }

    #[test]
    fn test_parse_canonical_round_trip() {
        let dt = parse_canonical("2024-01-15T10:30:00").unwrap();
        assert_eq!(
            dt.format(CANONICAL_TIMESTAMP_FORMAT).to_string(),
            "2024-01-15T10:30:00"
        );
        assert!(parse_canonical("2024-01-15 10:30:00").is_none());
    }
}
