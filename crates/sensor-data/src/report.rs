//! Human-readable and JSON run reports.

use std::fmt::Write as _;

use serde::Serialize;

use sensor_core::error::Result;
use sensor_core::formatting::{format_count, format_number, format_seconds};
use sensor_core::models::DerivationRule;
use sensor_core::settings::PipelineConfig;

use crate::aggregator::RunStatistics;
use crate::analysis::{PipelineOutcome, RunMetadata};

const RULE_WIDTH: usize = 70;
const LABEL_WIDTH: usize = 30;

/// Everything the report shows, borrowed from the config and the outcome.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub measurement: &'a str,
    pub rule: &'a DerivationRule,
    /// Only meaningful for threshold-based rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub statistics: &'a RunStatistics,
    pub metadata: &'a RunMetadata,
}

impl<'a> RunReport<'a> {
    pub fn new(config: &'a PipelineConfig, outcome: &'a PipelineOutcome) -> Self {
        let threshold = match config.alert_rule {
            DerivationRule::Linear { .. } => Some(config.threshold),
            DerivationRule::Categorical { .. } => None,
        };
        Self {
            measurement: &config.columns.measurement,
            rule: &config.alert_rule,
            threshold,
            statistics: &outcome.statistics,
            metadata: &outcome.metadata,
        }
    }

    /// Sectioned plain-text report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = self.statistics;
        let rule = "=".repeat(RULE_WIDTH);

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "SENSOR KPI REPORT");
        let _ = writeln!(out, "{}", rule);
        line(&mut out, "Input", &self.metadata.input_path);
        line(&mut out, "Output", &self.metadata.output_path);
        line(&mut out, "Alert rule", &self.describe_rule());

        section(&mut out, "DATA QUALITY");
        line(&mut out, "Total rows", &format_count(s.quality.total));
        line(&mut out, "Kept rows", &format_count(s.quality.kept));
        line(&mut out, "Bad timestamp", &format_count(s.quality.bad_timestamp));
        line(&mut out, "Bad value", &format_count(s.quality.bad_value));
        line(
            &mut out,
            "Rejected",
            &format!(
                "{} ({}%)",
                format_count(s.quality.rejected),
                format_number(s.quality.rejected_pct, 2)
            ),
        );

        section(&mut out, &format!("BASIC STATISTICS ({})", self.measurement));
        line(&mut out, "Samples (n)", &format_count(s.basic.n));
        line(&mut out, "Minimum", &optional(s.basic.min));
        line(&mut out, "Maximum", &optional(s.basic.max));
        line(&mut out, "Mean", &optional(s.basic.mean));
        line(&mut out, "Std deviation", &format_number(s.basic.std_dev, 2));
        line(&mut out, "Alerts", &format_count(s.alerts.count));
        line(
            &mut out,
            "Alert share",
            &format!("{}%", format_number(s.alerts.pct, 2)),
        );

        section(&mut out, "SIGNAL KPIs");
        line(&mut out, "RMS", &format_number(s.signal.rms, 2));
        line(
            &mut out,
            "Distortion (THD approx.)",
            &format!("{}%", format_number(s.signal.distortion_pct, 2)),
        );
        line(
            &mut out,
            "Histogram peak bin",
            &s.signal
                .histogram_peak
                .map_or_else(|| "n/a".to_string(), |b| b.to_string()),
        );

        section(&mut out, "ALERT EVENTS");
        line(&mut out, "Closed events", &format_count(s.events.total_events));
        if !s.events.durations_secs.is_empty() {
            let durations: Vec<String> = s
                .events
                .durations_secs
                .iter()
                .map(|d| format_seconds(*d))
                .collect();
            line(&mut out, "Durations", &durations.join(", "));
        }
        line(
            &mut out,
            "Average duration",
            &format_seconds(s.events.average_duration_secs),
        );
        if s.events.open_at_end {
            line(&mut out, "Open at end of input", "yes (not counted)");
        }

        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "Generated at {}", self.metadata.generated_at);
        out
    }

    /// Pretty-printed JSON report.
    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn describe_rule(&self) -> String {
        match self.rule {
            DerivationRule::Linear { scale, offset } => format!(
                "{} = {} * value {} {}, ALERT when > {}",
                self.measurement,
                scale,
                if *offset < 0.0 { '-' } else { '+' },
                offset.abs(),
                self.threshold.map_or_else(String::new, |t| format_number(t, 2))
            ),
            DerivationRule::Categorical { alert_values } => {
                format!("status field in [{}]", alert_values.join(", "))
            }
        }
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}:", title);
}

fn line(out: &mut String, label: &str, value: &str) {
    let label = format!("{}:", label);
    let _ = writeln!(out, "   {:<width$} {}", label, value, width = LABEL_WIDTH);
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format_number(v, 2))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
