use chrono::NaiveDateTime;

use crate::time_utils::{TimezoneHandler, CANONICAL_TIMESTAMP_FORMAT};

/// Lower-cased placeholder strings that loggers emit instead of a reading.
pub const MISSING_VALUE_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "error"];

/// Day-first layout used by spreadsheet exports.
const DAY_FIRST_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Length of `YYYY-MM-DDTHH:MM:SS`.
const CANONICAL_LEN: usize = 19;

// ── ValueProcessor ────────────────────────────────────────────────────────────

/// Parses numeric readings written with either decimal separator.
pub struct ValueProcessor;

impl ValueProcessor {
    /// Parse a raw reading into a finite float.
    ///
    /// Decimal commas become dots, surrounding whitespace is ignored and
    /// placeholder tokens (`NA`, `null`, `error`, ...) are rejected in any
    /// case. Infinite results are rejected too.
    pub fn clean_value(raw: &str) -> Option<f64> {
        let normalised = raw.replace(',', ".");
        let trimmed = normalised.trim();
        let lowered = trimmed.to_lowercase();
        if MISSING_VALUE_TOKENS.contains(&lowered.as_str()) {
            return None;
        }
        trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Normalises the timestamp layouts found in sensor logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampProcessor {
    timezone: TimezoneHandler,
}

impl TimestampProcessor {
    pub fn new(timezone: TimezoneHandler) -> Self {
        Self { timezone }
    }

    /// Parse `raw` into a second-precision wall-clock time.
    ///
    /// Formats are tried in order, first match wins:
    /// 1. integer epoch milliseconds (rendered in the configured zone)
    /// 2. `YYYY-MM-DDTHH:MM:SS`
    /// 3. `DD/MM/YYYY HH:MM:SS`
    /// 4. the first 19 characters of a longer ISO string containing `T`
    ///    (drops fractional seconds and offsets)
    pub fn clean_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(millis) = s.parse::<i64>() {
            if let Some(dt) = self.timezone.local_from_epoch_millis(millis) {
                return Some(dt);
            }
        }

        for fmt in [CANONICAL_TIMESTAMP_FORMAT, DAY_FIRST_FORMAT] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt);
            }
        }

        if s.contains('T') {
            let head = s.get(..CANONICAL_LEN)?;
            if let Ok(dt) = NaiveDateTime::parse_from_str(head, CANONICAL_TIMESTAMP_FORMAT) {
                return Some(dt);
            }
        }

        None
    }

    /// [`clean_timestamp`](Self::clean_timestamp) rendered in the canonical
    /// format.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        self.clean_timestamp(raw)
            .map(|dt| dt.format(CANONICAL_TIMESTAMP_FORMAT).to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::parse_canonical;

    // ── clean_value ───────────────────────────────────────────────────────────

    #[test]
    fn test_clean_value_comma_and_dot_agree() {
        for (comma, dot) in [
            ("3,14", "3.14"),
            ("0,5", "0.5"),
            ("-12,75", "-12.75"),
            ("100", "100"),
            ("1,5e2", "1.5e2"),
        ] {
            assert_eq!(
                ValueProcessor::clean_value(comma),
                ValueProcessor::clean_value(dot),
                "{} vs {}",
                comma,
                dot
            );
            assert!(ValueProcessor::clean_value(dot).is_some());
        }
    }

    #[test]
    fn test_clean_value_trims_whitespace() {
        assert_eq!(ValueProcessor::clean_value("  2,50 "), Some(2.5));
    }

    #[test]
    fn test_clean_value_blocklist_any_case() {
        for token in [
            "", "NA", "na", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "none", "ERROR",
            "Error", "  na  ",
        ] {
            assert_eq!(ValueProcessor::clean_value(token), None, "{:?}", token);
        }
    }

    #[test]
    fn test_clean_value_rejects_garbage_and_infinity() {
        assert_eq!(ValueProcessor::clean_value("abc"), None);
        assert_eq!(ValueProcessor::clean_value("1,234.5"), None);
        assert_eq!(ValueProcessor::clean_value("inf"), None);
        assert_eq!(ValueProcessor::clean_value("-Infinity"), None);
    }

    // ── clean_timestamp ───────────────────────────────────────────────────────

    #[test]
    fn test_all_formats_normalise_identically() {
        let processor = TimestampProcessor::new(TimezoneHandler::new("UTC"));
        // 2023-11-14T22:13:20Z
        let inputs = [
            "1700000000000",
            "2023-11-14T22:13:20",
            "14/11/2023 22:13:20",
            "2023-11-14T22:13:20.457",
        ];
        for raw in inputs {
            assert_eq!(
                processor.normalize(raw).as_deref(),
                Some("2023-11-14T22:13:20"),
                "{}",
                raw
            );
        }
    }

    #[test]
    fn test_truncated_iso_drops_offset() {
        let processor = TimestampProcessor::default();
        assert_eq!(
            processor.normalize("2024-02-01T08:00:00+05:00").as_deref(),
            Some("2024-02-01T08:00:00")
        );
        assert_eq!(
            processor.normalize("2024-02-01T08:00:00Z").as_deref(),
            Some("2024-02-01T08:00:00")
        );
    }

    #[test]
    fn test_epoch_millis_discards_subsecond() {
        let processor = TimestampProcessor::default();
        assert_eq!(
            processor.normalize("1700000000999").as_deref(),
            Some("2023-11-14T22:13:20")
        );
    }

    #[test]
    fn test_clean_timestamp_rejects_unknown() {
        let processor = TimestampProcessor::default();
        for raw in [
            "",
            "   ",
            "yesterday",
            "2023-13-40T00:00:00",
            "11/14/2023 22:13:20",
            "2023-11-14",
            "2023-11-14 22:13:20",
            "T",
        ] {
            assert!(processor.clean_timestamp(raw).is_none(), "{:?}", raw);
        }
    }

    #[test]
    fn test_short_string_with_t_is_rejected_without_panic() {
        let processor = TimestampProcessor::default();
        assert!(processor.clean_timestamp("2023-11-14T22").is_none());
        // Multi-byte characters around the cut point must not panic.
        assert!(processor.clean_timestamp("2023-11-14T22:13:2éééé").is_none());
    }

    #[test]
    fn test_canonical_output_is_idempotent() {
        let processor = TimestampProcessor::default();
        for raw in ["1700000000000", "14/11/2023 22:13:20", "2023-11-14T22:13:20.9"] {
            let first = processor.clean_timestamp(raw).unwrap();
            let rendered = processor.normalize(raw).unwrap();
            assert_eq!(parse_canonical(&rendered), Some(first));
            assert_eq!(processor.normalize(&rendered), Some(rendered.clone()));
        }
    }
}
