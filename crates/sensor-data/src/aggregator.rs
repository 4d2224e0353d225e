//! KPI aggregation over the cleaned record sequence.
//!
//! [`StatisticsAggregator`] consumes [`CleanRecord`]s in input order and
//! produces a read-only [`RunStatistics`] once the run is complete.

use chrono::NaiveDateTime;
use serde::Serialize;

use sensor_core::calculations::{
    distortion_ratio, histogram_peak, mean, rms, sample_std_dev, HISTOGRAM_BIN_WIDTH,
};
use sensor_core::formatting::{percentage, round_to};
use sensor_core::models::{CleanRecord, RunTotals, Status};

/// Decimal places kept for every computed figure in the statistics.
const STAT_DECIMALS: u32 = 2;

// ── Statistics sections ───────────────────────────────────────────────────────

/// Row-level data quality figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityKpis {
    pub total: u64,
    pub kept: u64,
    pub bad_timestamp: u64,
    pub bad_value: u64,
    pub rejected: u64,
    /// Share of rejected rows, `0.0` when no rows were read.
    pub rejected_pct: f64,
}

impl From<RunTotals> for QualityKpis {
    fn from(totals: RunTotals) -> Self {
        Self {
            total: totals.total,
            kept: totals.kept,
            bad_timestamp: totals.bad_timestamp,
            bad_value: totals.bad_value,
            rejected: totals.rejected(),
            rejected_pct: percentage(
                totals.rejected() as f64,
                totals.total as f64,
                STAT_DECIMALS,
            ),
        }
    }
}

/// Descriptive statistics of the measurement column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BasicStats {
    pub n: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation, `0.0` when `n <= 1`.
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AlertStats {
    pub count: u64,
    pub pct: f64,
}

/// Signal-shape figures of the measurement column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalStats {
    pub rms: f64,
    /// Population std-dev over mean, in percent (reported as "THD").
    pub distortion_pct: f64,
    /// Label of the most populated 5-unit histogram bin.
    pub histogram_peak: Option<i64>,
}

/// Durations of contiguous ALERT runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStats {
    /// One entry per closed event, in seconds, in input order.
    pub durations_secs: Vec<f64>,
    pub total_events: u64,
    pub average_duration_secs: f64,
    /// An ALERT run was still open when the input ended. It is not part of
    /// `durations_secs`.
    pub open_at_end: bool,
}

/// Everything computed for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub quality: QualityKpis,
    pub basic: BasicStats,
    pub alerts: AlertStats,
    pub signal: SignalStats,
    pub events: EventStats,
}

// ── StatisticsAggregator ──────────────────────────────────────────────────────

/// Running accumulator over cleaned records.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    measurements: Vec<f64>,
    min: Option<f64>,
    max: Option<f64>,
    alert_count: u64,
    open_event: Option<NaiveDateTime>,
    durations: Vec<f64>,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a whole record sequence in one call.
    pub fn fold(records: &[CleanRecord], totals: RunTotals) -> RunStatistics {
        let mut agg = Self::new();
        for record in records {
            agg.add_record(record);
        }
        agg.finish(totals)
    }

    /// Accumulate one record. Records must arrive in input order.
    pub fn add_record(&mut self, record: &CleanRecord) {
        let m = record.measurement;
        self.measurements.push(m);
        self.min = Some(self.min.map_or(m, |cur| cur.min(m)));
        self.max = Some(self.max.map_or(m, |cur| cur.max(m)));

        match (record.status, self.open_event) {
            (Status::Alert, None) => {
                self.alert_count += 1;
                self.open_event = Some(record.timestamp);
            }
            (Status::Alert, Some(_)) => self.alert_count += 1,
            (Status::Normal, Some(start)) => {
                self.durations.push(seconds_between(start, record.timestamp));
                self.open_event = None;
            }
            (Status::Normal, None) => {}
        }
    }

    /// Number of records accumulated so far.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Close the fold and compute the derived figures.
    pub fn finish(self, totals: RunTotals) -> RunStatistics {
        let values = &self.measurements;
        let n = values.len() as u64;

        let basic = BasicStats {
            n,
            min: self.min,
            max: self.max,
            mean: mean(values).map(round_stat),
            std_dev: round_stat(sample_std_dev(values)),
        };

        let alerts = AlertStats {
            count: self.alert_count,
            pct: percentage(self.alert_count as f64, n as f64, STAT_DECIMALS),
        };

        let signal = SignalStats {
            rms: round_stat(rms(values)),
            distortion_pct: round_stat(distortion_ratio(values)),
            histogram_peak: histogram_peak(values, HISTOGRAM_BIN_WIDTH),
        };

        let events = EventStats {
            total_events: self.durations.len() as u64,
            average_duration_secs: mean(&self.durations).map_or(0.0, round_stat),
            open_at_end: self.open_event.is_some(),
            durations_secs: self.durations,
        };

        RunStatistics {
            quality: totals.into(),
            basic,
            alerts,
            signal,
            events,
        }
    }
}

fn round_stat(value: f64) -> f64 {
    round_to(value, STAT_DECIMALS)
}

fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
