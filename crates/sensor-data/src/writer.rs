//! Processed CSV output.
//!
//! The file is staged next to its destination and renamed into place only
//! after every row has been written, so readers never observe a partial
//! output.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use sensor_core::error::{Result, SensorError};
use sensor_core::formatting::format_fixed;
use sensor_core::models::CleanRecord;
use sensor_core::settings::OutputColumns;

/// Decimal places of every numeric output cell.
const OUTPUT_DECIMALS: usize = 2;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| SensorError::FileWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// One output row in header order.
fn row_cells(record: &CleanRecord, columns: &OutputColumns) -> Vec<String> {
    let mut cells = Vec::with_capacity(4);
    cells.push(record.canonical_timestamp());
    if columns.source.is_some() {
        cells.push(format_fixed(record.source_value, OUTPUT_DECIMALS));
    }
    cells.push(format_fixed(record.measurement, OUTPUT_DECIMALS));
    cells.push(record.status.to_string());
    cells
}

/// Write `records` to `path` as comma-delimited text.
///
/// Header: `Timestamp,[source,]<measurement>,Estado`. Returns the number of
/// data rows written.
pub fn write_clean_records(
    path: &Path,
    records: &[CleanRecord],
    columns: &OutputColumns,
) -> Result<usize> {
    ensure_parent_dirs(path)?;

    let staging_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(staging_dir).map_err(|e| SensorError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Staging output in {}", tmp.path().display());

    let csv_err = |e: csv::Error| SensorError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let io_err = |e: std::io::Error| SensorError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    };

    write_clean_records_to(tmp.as_file_mut(), records, columns).map_err(csv_err)?;
    tmp.as_file_mut().sync_all().map_err(io_err)?;

    tmp.persist(path).map_err(|e| io_err(e.error))?;

    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(records.len())
}

/// Serialize `records` into any sink, header first.
pub fn write_clean_records_to<W: Write>(
    sink: W,
    records: &[CleanRecord],
    columns: &OutputColumns,
) -> std::result::Result<usize, csv::Error> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(columns.header())?;
    for record in records {
        writer.write_record(row_cells(record, columns))?;
    }
    writer.flush()?;
    Ok(records.len())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sensor_core::models::Status;
    use tempfile::TempDir;

    fn rec(secs: u32, source: f64, measurement: f64, status: Status) -> CleanRecord {
        CleanRecord {
            timestamp: NaiveDate::from_ymd_opt(2023, 11, 14)
                .unwrap()
                .and_hms_opt(22, 13, secs)
                .unwrap(),
            source_value: source,
            measurement,
            status,
        }
    }

    fn distance_columns() -> OutputColumns {
        OutputColumns {
            measurement: "Distancia_cm".to_string(),
            source: None,
        }
    }

    fn temperature_columns() -> OutputColumns {
        OutputColumns {
            measurement: "Temp_C".to_string(),
            source: Some("voltaje".to_string()),
        }
    }

    #[test]
    fn test_writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![
            rec(20, 25.456, 25.46, Status::Alert),
            rec(21, 80.0, 80.0, Status::Normal),
        ];

        let n = write_clean_records(&path, &records, &distance_columns()).unwrap();
        assert_eq!(n, 2);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Timestamp,Distancia_cm,Estado\n\
             2023-11-14T22:13:20,25.46,ALERT\n\
             2023-11-14T22:13:21,80.00,NORMAL\n"
        );
    }

    #[test]
    fn test_source_column_written_before_measurement() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temps.csv");
        let records = vec![rec(0, 6.0, 44.0, Status::Alert)];

        write_clean_records(&path, &records, &temperature_columns()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Timestamp,voltaje,Temp_C,Estado\n2023-11-14T22:13:00,6.00,44.00,ALERT\n"
        );
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("datos").join("processing").join("out.csv");

        write_clean_records(&path, &[], &distance_columns()).unwrap();

        assert!(path.exists());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Timestamp,Distancia_cm,Estado\n"
        );
    }

    #[test]
    fn test_overwrites_existing_file_and_leaves_no_staging_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale contents\n").unwrap();

        write_clean_records(&path, &[rec(5, 1.0, 1.0, Status::Normal)], &distance_columns())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Timestamp,"));
        assert!(!content.contains("stale"));

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_unwritable_destination_fails_without_output() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("out.csv");

        let err = write_clean_records(&path, &[], &distance_columns()).unwrap_err();
        assert!(matches!(err, SensorError::FileWrite { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_to_sink() {
        let mut buf = Vec::new();
        let records = vec![rec(1, 5.5, 35.0, Status::Normal)];
        write_clean_records_to(&mut buf, &records, &temperature_columns()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Timestamp,voltaje,Temp_C,Estado\n2023-11-14T22:13:01,5.50,35.00,NORMAL\n"
        );
    }
}
