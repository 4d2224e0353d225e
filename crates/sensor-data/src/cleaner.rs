//! Row-level validation: one [`RawRecord`] in, one [`CleanRecord`] or one
//! [`RejectionReason`] out.

use sensor_core::data_processors::{TimestampProcessor, ValueProcessor};
use sensor_core::formatting::round_to;
use sensor_core::models::{CleanRecord, DerivationRule, FieldMapping, RawRecord, RejectionReason};
use sensor_core::settings::PipelineConfig;
use sensor_core::time_utils::TimezoneHandler;

/// Decimal places kept on measurements.
const MEASUREMENT_DECIMALS: u32 = 2;

/// Pure, reusable row normaliser for one dataset configuration.
#[derive(Debug, Clone)]
pub struct RowCleaner {
    mapping: FieldMapping,
    rule: DerivationRule,
    threshold: f64,
    timestamps: TimestampProcessor,
}

impl RowCleaner {
    pub fn new(
        mapping: FieldMapping,
        rule: DerivationRule,
        threshold: f64,
        timezone: TimezoneHandler,
    ) -> Self {
        Self {
            mapping,
            rule,
            threshold,
            timestamps: TimestampProcessor::new(timezone),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.field_mapping.clone(),
            config.alert_rule.clone(),
            config.threshold,
            TimezoneHandler::new(&config.timezone),
        )
    }

    /// Validate and normalise one record.
    ///
    /// The value is checked before the timestamp, so a row where both are
    /// bad is reported as [`RejectionReason::BadValue`].
    pub fn clean(&self, raw: &RawRecord) -> Result<CleanRecord, RejectionReason> {
        let value = ValueProcessor::clean_value(raw.get(&self.mapping.value))
            .ok_or(RejectionReason::BadValue)?;

        let timestamp = self
            .timestamps
            .clean_timestamp(raw.get(&self.mapping.timestamp))
            .ok_or(RejectionReason::BadTimestamp)?;

        let measurement = round_to(self.rule.derive(value), MEASUREMENT_DECIMALS);
        if !measurement.is_finite() {
            return Err(RejectionReason::BadValue);
        }

        let status_raw = self
            .mapping
            .status
            .as_deref()
            .map(|field| raw.get(field))
            .unwrap_or("");
        let status = self.rule.classify(measurement, status_raw, self.threshold);

        Ok(CleanRecord {
            timestamp,
            source_value: value,
            measurement,
            status,
        })
    }
}
