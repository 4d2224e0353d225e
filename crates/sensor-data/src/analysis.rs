//! Main processing pipeline.
//!
//! Reads, cleans and aggregates one input file, then writes the processed
//! CSV, returning a [`PipelineOutcome`] ready for the report layer.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use sensor_core::error::Result;
use sensor_core::models::{CleanRecord, RunTotals};
use sensor_core::settings::PipelineConfig;

use crate::aggregator::{RunStatistics, StatisticsAggregator};
use crate::cleaner::RowCleaner;
use crate::reader::RecordReader;
use crate::writer::write_clean_records;

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub input_path: String,
    pub output_path: String,
    /// Whether the input started with a header line.
    pub header_detected: bool,
    /// Number of data rows written to the processed CSV.
    pub rows_written: usize,
    /// Wall-clock seconds spent reading and cleaning.
    pub clean_time_seconds: f64,
    /// Wall-clock seconds spent writing the output.
    pub write_time_seconds: f64,
}

/// The complete output of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Accepted records in input order.
    pub records: Vec<CleanRecord>,
    pub totals: RunTotals,
    pub statistics: RunStatistics,
    pub metadata: RunMetadata,
}

/// Records accepted by the cleaner plus the row counters.
#[derive(Debug, Clone, Default)]
pub struct CleanedInput {
    pub records: Vec<CleanRecord>,
    pub totals: RunTotals,
    pub header_detected: bool,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Read and clean the configured input without writing anything.
///
/// Rejected rows are counted and dropped. Any read or decode failure aborts
/// the run.
pub fn clean_records(config: &PipelineConfig) -> Result<CleanedInput> {
    let reader = RecordReader::open(&config.input_path, config.delimiter, &config.field_mapping)?;
    let header_detected = reader.has_header();
    let cleaner = RowCleaner::from_config(config);

    let mut records = Vec::new();
    let mut totals = RunTotals::default();

    for raw in reader {
        let raw = raw?;
        let outcome = cleaner.clean(&raw);
        totals.record(&outcome);
        match outcome {
            Ok(record) => records.push(record),
            Err(reason) => debug!("Row {} rejected: {}", raw.record_number, reason),
        }
    }

    info!(
        "Processed {} rows: {} kept, {} bad timestamp, {} bad value",
        totals.total, totals.kept, totals.bad_timestamp, totals.bad_value
    );
    if totals.total > 0 && totals.kept == 0 {
        warn!("No valid rows in {}", config.input_path.display());
    }

    Ok(CleanedInput {
        records,
        totals,
        header_detected,
    })
}

/// Run the full pipeline.
///
/// 1. Read and clean every row of the input.
/// 2. Fold the accepted records into [`RunStatistics`].
/// 3. Write the processed CSV (atomically).
///
/// The output is only touched once the whole input has been consumed, so a
/// read failure never leaves a partial file behind.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutcome> {
    config.validate()?;

    // ── Step 1: Read and clean ────────────────────────────────────────────────
    let clean_start = Instant::now();
    let cleaned = clean_records(config)?;
    let clean_time = clean_start.elapsed().as_secs_f64();

    // ── Step 2: Aggregate ─────────────────────────────────────────────────────
    let statistics = StatisticsAggregator::fold(&cleaned.records, cleaned.totals);

    // ── Step 3: Write ─────────────────────────────────────────────────────────
    let write_start = Instant::now();
    let rows_written = write_clean_records(&config.output_path, &cleaned.records, &config.columns)?;
    let write_time = write_start.elapsed().as_secs_f64();

    let metadata = RunMetadata {
        generated_at: Utc::now().to_rfc3339(),
        input_path: config.input_path.display().to_string(),
        output_path: config.output_path.display().to_string(),
        header_detected: cleaned.header_detected,
        rows_written,
        clean_time_seconds: clean_time,
        write_time_seconds: write_time,
    };

    Ok(PipelineOutcome {
        records: cleaned.records,
        totals: cleaned.totals,
        statistics,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_core::error::SensorError;
    use sensor_core::models::Status;
    use sensor_core::settings::Preset;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config_for(preset: Preset, dir: &Path, input: &str) -> PipelineConfig {
        let input_path = dir.join("input.csv");
        fs::write(&input_path, input).unwrap();
        let mut config = PipelineConfig::for_preset(preset);
        config.input_path = input_path;
        config.output_path = dir.join("out").join("processed.csv");
        config
    }

    #[test]
    fn test_ultrasonic_end_to_end() {
        let dir = TempDir::new().unwrap();
        let input = "ts_ms,Sensor_ID,distancia,dist_avg,estado\n\
                     1700000000000,S1,20,20.0,NORMAL\n\
                     1700000001000,S1,10,10.5,ALERTA\n\
                     1700000002000,S1,11,11,alert\n\
                     1700000003000,S1,40,40,NORMAL\n\
                     bogus,S1,40,40,NORMAL\n\
                     1700000005000,S1,x,NaN,NORMAL\n";
        let config = config_for(Preset::Ultrasonic, dir.path(), input);

        let outcome = run_pipeline(&config).unwrap();

        assert_eq!(outcome.totals.total, 6);
        assert_eq!(outcome.totals.kept, 4);
        assert_eq!(outcome.totals.bad_timestamp, 1);
        assert_eq!(outcome.totals.bad_value, 1);
        assert!(outcome.totals.is_consistent());

        assert_eq!(outcome.records[1].status, Status::Alert);
        assert_eq!(outcome.statistics.alerts.count, 2);
        assert_eq!(outcome.statistics.events.durations_secs, vec![2.0]);
        assert!(!outcome.statistics.events.open_at_end);
        assert_eq!(outcome.statistics.quality.rejected_pct, 33.33);
        assert!(outcome.metadata.header_detected);
        assert_eq!(outcome.metadata.rows_written, 4);

        let written = fs::read_to_string(&config.output_path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Timestamp,Distancia_cm,Estado");
        assert_eq!(lines[2], "2023-11-14T22:13:21,10.50,ALERT");
    }

    #[test]
    fn test_headerless_ultrasonic_input() {
        let dir = TempDir::new().unwrap();
        let input = "1700000000000,S1,20,20.0,NORMAL,0,0,0,base\n\
                     1700000001000,S1,10,10.0,ALERTA,1,0,50,base\n";
        let config = config_for(Preset::Ultrasonic, dir.path(), input);

        let outcome = run_pipeline(&config).unwrap();
        assert!(!outcome.metadata.header_detected);
        assert_eq!(outcome.totals.kept, 2);
        assert!(outcome.statistics.events.open_at_end);
    }

    #[test]
    fn test_temperature_end_to_end() {
        let dir = TempDir::new().unwrap();
        let input = "timestamp;value\n\
                     2024-01-01T00:00:00;5,0\n\
                     01/01/2024 00:00:01;6,0\n\
                     2024-01-01T00:00:02.500Z;5.5\n\
                     2024-01-01T00:00:03;null\n";
        let config = config_for(Preset::Temperature, dir.path(), input);

        let outcome = run_pipeline(&config).unwrap();

        assert_eq!(outcome.totals.kept, 3);
        assert_eq!(outcome.totals.bad_value, 1);
        let temps: Vec<f64> = outcome.records.iter().map(|r| r.measurement).collect();
        assert_eq!(temps, vec![26.0, 44.0, 35.0]);
        assert_eq!(outcome.statistics.events.durations_secs, vec![1.0]);

        let written = fs::read_to_string(&config.output_path).unwrap();
        assert!(written.starts_with("Timestamp,voltaje,Temp_C,Estado\n"));
        assert!(written.contains("2024-01-01T00:00:01,6.00,44.00,ALERT\n"));
    }

    #[test]
    fn test_mixed_case_header_rows_are_kept() {
        let dir = TempDir::new().unwrap();
        let input = "Timestamp;Value\n\
                     2024-01-01T00:00:00;5,0\n\
                     2024-01-01T00:00:01;6,0\n";
        let config = config_for(Preset::Temperature, dir.path(), input);

        let outcome = run_pipeline(&config).unwrap();

        assert!(outcome.metadata.header_detected);
        assert_eq!(outcome.totals.total, 2);
        assert_eq!(outcome.totals.kept, 2);
        assert_eq!(outcome.totals.bad_value, 0);
        assert_eq!(outcome.metadata.rows_written, 2);
    }

    #[test]
    fn test_whitespace_only_row_counted_as_bad_value() {
        let dir = TempDir::new().unwrap();
        let input = "timestamp;value\n2024-01-01T00:00:00;5,0\n   \n";
        let config = config_for(Preset::Temperature, dir.path(), input);

        let outcome = run_pipeline(&config).unwrap();

        assert_eq!(outcome.totals.total, 2);
        assert_eq!(outcome.totals.kept, 1);
        assert_eq!(outcome.totals.bad_value, 1);
        assert!(outcome.totals.is_consistent());
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_for(Preset::Ultrasonic, dir.path(), "");

        let outcome = run_pipeline(&config).unwrap();

        assert_eq!(outcome.totals, RunTotals::default());
        assert_eq!(outcome.statistics.basic.n, 0);
        assert!(outcome.records.is_empty());
        assert_eq!(
            fs::read_to_string(&config.output_path).unwrap(),
            "Timestamp,Distancia_cm,Estado\n"
        );
    }

    #[test]
    fn test_missing_input_is_fatal_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::for_preset(Preset::Ultrasonic);
        config.input_path = dir.path().join("absent.csv");
        config.output_path = dir.path().join("out.csv");

        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(err, SensorError::FileNotFound(_)));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_decode_failure_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input_path = dir.path().join("input.csv");
        let mut bytes = b"ts_ms,Sensor_ID,distancia,dist_avg,estado\n".to_vec();
        bytes.extend_from_slice(b"1700000000000,S1,20,20,NORMAL\n");
        bytes.extend_from_slice(b"1700000001000,S1,\xff\xfe,20,NORMAL\n");
        fs::write(&input_path, bytes).unwrap();

        let mut config = PipelineConfig::for_preset(Preset::Ultrasonic);
        config.input_path = input_path;
        config.output_path = dir.path().join("out.csv");

        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(err, SensorError::Csv { .. }));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_clean_records_does_not_write() {
        let dir = TempDir::new().unwrap();
        let config = config_for(
            Preset::Ultrasonic,
            dir.path(),
            "ts_ms,dist_avg,estado\n1700000000000,12,1\n",
        );

        let cleaned = clean_records(&config).unwrap();
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.records[0].status, Status::Alert);
        assert!(!config.output_path.exists());
    }
}
