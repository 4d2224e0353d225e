//! Delimited-text loading for sensor logs.
//!
//! Opens a CSV file, decides whether its first line is a header and yields
//! one [`RawRecord`] per data row, lazily and in file order.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use sensor_core::error::{Result, SensorError};
use sensor_core::models::{FieldMapping, RawRecord};
use tracing::{debug, info};

/// Progress is logged every this many records.
const PROGRESS_EVERY: usize = 100;

const BOM: char = '\u{feff}';

// ── RecordReader ──────────────────────────────────────────────────────────────

/// Single-pass iterator over the data rows of a delimited file.
pub struct RecordReader<R: Read = File> {
    source: PathBuf,
    records: StringRecordsIntoIter<R>,
    field_names: Vec<String>,
    has_header: bool,
    /// First data row when the file has no header; it was consumed while
    /// sniffing.
    pending: Option<StringRecord>,
    emitted: usize,
}

impl RecordReader<File> {
    /// Open `path` for reading.
    ///
    /// A missing file is [`SensorError::FileNotFound`]; any other open
    /// failure is [`SensorError::FileRead`]. An empty file yields no records.
    pub fn open(path: &Path, delimiter: u8, mapping: &FieldMapping) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SensorError::FileNotFound(path.to_path_buf())
            } else {
                SensorError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        info!("Reading {} ({} bytes)", path.display(), size);

        Self::from_reader(file, path, delimiter, mapping)
    }
}

impl<R: Read> RecordReader<R> {
    /// Wrap any byte source. `source` is only used in diagnostics.
    pub fn from_reader(
        reader: R,
        source: &Path,
        delimiter: u8,
        mapping: &FieldMapping,
    ) -> Result<Self> {
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader)
            .into_records();

        let first = loop {
            match records.next() {
                None => break None,
                Some(Err(e)) => return Err(csv_error(source, e)),
                Some(Ok(rec)) if is_blank(&rec) => continue,
                Some(Ok(rec)) => break Some(strip_bom(rec)),
            }
        };

        let header_detected = first
            .as_ref()
            .and_then(|rec| rec.get(0))
            .map_or(false, |token| mapping.is_header_token(token));

        let (field_names, pending) = match first {
            Some(rec) if header_detected => {
                let names = rec.iter().map(|h| mapping.canonical_name(h)).collect();
                (names, None)
            }
            other => (mapping.fallback_fields.clone(), other),
        };

        if header_detected {
            debug!("{}: header row detected", source.display());
        } else {
            debug!(
                "{}: no header row, using {} positional field names",
                source.display(),
                field_names.len()
            );
        }

        Ok(Self {
            source: source.to_path_buf(),
            records,
            field_names,
            has_header: header_detected,
            pending,
            emitted: 0,
        })
    }

    /// Field names applied to every row, from the header or the fallback.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    /// Number of records yielded so far.
    pub fn records_read(&self) -> usize {
        self.emitted
    }

    fn to_raw(&self, rec: &StringRecord, record_number: usize) -> RawRecord {
        // Extra trailing cells have no name and are dropped; missing cells
        // stay absent.
        RawRecord::from_pairs(
            record_number,
            self.field_names
                .iter()
                .zip(rec.iter())
                .map(|(name, value)| (name.as_str(), value)),
        )
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let rec = match self.pending.take() {
            Some(rec) => rec,
            None => loop {
                match self.records.next()? {
                    Err(e) => return Some(Err(csv_error(&self.source, e))),
                    Ok(rec) if is_blank(&rec) => continue,
                    Ok(rec) => break rec,
                }
            },
        };

        self.emitted += 1;
        if self.emitted % PROGRESS_EVERY == 0 {
            debug!("Read {} records from {}", self.emitted, self.source.display());
        }
        Some(Ok(self.to_raw(&rec, self.emitted)))
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn csv_error(path: &Path, source: csv::Error) -> SensorError {
    SensorError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// An empty line parses as a single zero-length cell. Whitespace-only lines
/// are data and reach the cleaner.
fn is_blank(rec: &StringRecord) -> bool {
    rec.is_empty() || (rec.len() == 1 && rec[0].is_empty())
}

fn strip_bom(rec: StringRecord) -> StringRecord {
    match rec.get(0) {
        Some(first) if first.starts_with(BOM) => {
            let mut cells: Vec<String> = rec.iter().map(str::to_string).collect();
            cells[0] = cells[0].trim_start_matches(BOM).to_string();
            StringRecord::from(cells)
        }
        _ => rec,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
