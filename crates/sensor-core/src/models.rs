use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::time_utils::CANONICAL_TIMESTAMP_FORMAT;

/// Status-field values (compared case-insensitively) that mark a row as ALERT.
pub const ALERT_STATUS_VALUES: &[&str] = &["ALERTA", "ALERT", "1"];

/// Field names applied positionally when the input has no header row.
///
/// This is the column order written by the ultrasonic logger firmware.
pub const FALLBACK_FIELD_NAMES: &[&str] = &[
    "ts_ms",
    "Sensor_ID",
    "distancia",
    "dist_avg",
    "estado",
    "num_eventos",
    "dur_promedio",
    "porc_alerta",
    "escenario",
];

/// Header tokens that are always recognised, whatever the field mapping says.
pub const KNOWN_HEADER_TOKENS: &[&str] = &["ts_ms", "timestamp"];

/// Two-valued classification of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Normal,
    Alert,
}

impl Status {
    pub fn is_alert(self) -> bool {
        self == Status::Alert
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Normal => "NORMAL",
            Status::Alert => "ALERT",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a raw record was dropped. Every dropped record carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    BadTimestamp,
    BadValue,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::BadTimestamp => f.write_str("BAD_TIMESTAMP"),
            RejectionReason::BadValue => f.write_str("BAD_VALUE"),
        }
    }
}

/// One input line as a field-name → raw-text mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based position of the record among the data rows of the file.
    pub record_number: usize,
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(record_number: usize) -> Self {
        Self {
            record_number,
            fields: HashMap::new(),
        }
    }

    /// Build a record from `(name, value)` pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(record_number: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            record_number,
            fields,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Raw value of `name`; absent fields read as the empty string.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A validated, normalised record.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    /// Wall-clock time at second precision.
    pub timestamp: NaiveDateTime,
    /// The parsed input value before any derivation.
    pub source_value: f64,
    /// The quantity statistics are computed over, rounded to 2 decimals.
    pub measurement: f64,
    pub status: Status,
}

impl CleanRecord {
    /// The timestamp rendered as `YYYY-MM-DDTHH:MM:SS`.
    pub fn canonical_timestamp(&self) -> String {
        self.timestamp.format(CANONICAL_TIMESTAMP_FORMAT).to_string()
    }
}

/// How a dataset turns a parsed value into a measurement and a [`Status`].
///
/// Exactly one rule applies to a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivationRule {
    /// `derived = scale * value + offset`; ALERT when `derived > threshold`.
    Linear { scale: f64, offset: f64 },
    /// ALERT when the status field matches one of `alert_values`
    /// (case-insensitive).
    Categorical {
        #[serde(default = "default_alert_values")]
        alert_values: Vec<String>,
    },
}

fn default_alert_values() -> Vec<String> {
    ALERT_STATUS_VALUES.iter().map(|s| s.to_string()).collect()
}

impl DerivationRule {
    /// LM35-style analog front end: `T(°C) = 18·V − 64`.
    pub fn voltage_to_temperature() -> Self {
        DerivationRule::Linear {
            scale: 18.0,
            offset: -64.0,
        }
    }

    /// Status read from a flag column (`ALERTA` / `ALERT` / `1`).
    pub fn status_flag() -> Self {
        DerivationRule::Categorical {
            alert_values: default_alert_values(),
        }
    }

    /// Whether the rule reads the status column of the input.
    pub fn uses_status_field(&self) -> bool {
        matches!(self, DerivationRule::Categorical { .. })
    }

    /// Map a parsed input value to the measured quantity.
    pub fn derive(&self, value: f64) -> f64 {
        match self {
            DerivationRule::Linear { scale, offset } => scale * value + offset,
            DerivationRule::Categorical { .. } => value,
        }
    }

    /// Classify a record given its derived measurement and raw status text.
    pub fn classify(&self, measurement: f64, status_raw: &str, threshold: f64) -> Status {
        match self {
            DerivationRule::Linear { .. } => {
                if measurement > threshold {
                    Status::Alert
                } else {
                    Status::Normal
                }
            }
            DerivationRule::Categorical { alert_values } => {
                let flag = status_raw.trim();
                if alert_values.iter().any(|v| v.eq_ignore_ascii_case(flag)) {
                    Status::Alert
                } else {
                    Status::Normal
                }
            }
        }
    }
}

/// Names of the input columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub timestamp: String,
    pub value: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Positional names used when the file has no header row.
    #[serde(default = "default_fallback_fields")]
    pub fallback_fields: Vec<String>,
}

fn default_fallback_fields() -> Vec<String> {
    FALLBACK_FIELD_NAMES.iter().map(|s| s.to_string()).collect()
}

impl FieldMapping {
    pub fn new(timestamp: &str, value: &str, status: Option<&str>) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            value: value.to_string(),
            status: status.map(str::to_string),
            fallback_fields: default_fallback_fields(),
        }
    }

    /// Whether `token` looks like a header cell rather than data.
    pub fn is_header_token(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        let mapped = [
            Some(self.timestamp.as_str()),
            Some(self.value.as_str()),
            self.status.as_deref(),
            self.fallback_fields.first().map(String::as_str),
        ];
        KNOWN_HEADER_TOKENS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(token))
            || mapped
                .iter()
                .flatten()
                .any(|known| known.eq_ignore_ascii_case(token))
    }

    /// Key under which a header cell is stored.
    ///
    /// A cell matching a mapped field name (case-insensitive, trimmed) takes
    /// the mapped spelling, so lookups by mapping name always hit. Other
    /// cells keep their trimmed text.
    pub fn canonical_name(&self, header_cell: &str) -> String {
        let cell = header_cell.trim();
        [
            Some(self.timestamp.as_str()),
            Some(self.value.as_str()),
            self.status.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|name| name.eq_ignore_ascii_case(cell))
        .unwrap_or(cell)
        .to_string()
    }
}

/// Row counters kept while cleaning.
///
/// `total == kept + bad_timestamp + bad_value` holds after every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub total: u64,
    pub kept: u64,
    pub bad_timestamp: u64,
    pub bad_value: u64,
}

impl RunTotals {
    /// Count one cleaning outcome.
    pub fn record<T>(&mut self, outcome: &Result<T, RejectionReason>) {
        self.total += 1;
        match outcome {
            Ok(_) => self.kept += 1,
            Err(RejectionReason::BadTimestamp) => self.bad_timestamp += 1,
            Err(RejectionReason::BadValue) => self.bad_value += 1,
        }
    }

    pub fn rejected(&self) -> u64 {
        self.bad_timestamp + self.bad_value
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.kept + self.rejected()
    }
}
