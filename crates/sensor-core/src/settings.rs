use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SensorError};
use crate::models::{DerivationRule, FieldMapping};
use crate::time_utils::TimezoneHandler;

/// Header of the timestamp column in the processed CSV.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";
/// Header of the status column in the processed CSV.
pub const STATUS_COLUMN: &str = "Estado";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Clean sensor CSV logs and report data-quality and signal KPIs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sensor-kpi",
    about = "Clean sensor CSV logs and report data-quality and signal KPIs",
    version
)]
pub struct Settings {
    /// Dataset preset supplying default columns, delimiter and alert rule
    #[arg(long, value_enum, default_value_t = Preset::Ultrasonic)]
    pub preset: Preset,

    /// Raw input file
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Processed output file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Input field delimiter (e.g. ',' or ';')
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Name of the timestamp column
    #[arg(long)]
    pub timestamp_field: Option<String>,

    /// Name of the numeric value column
    #[arg(long)]
    pub value_field: Option<String>,

    /// Name of the status flag column
    #[arg(long)]
    pub status_field: Option<String>,

    /// Header of the measurement column in the processed file
    #[arg(long)]
    pub measurement_column: Option<String>,

    /// Alert threshold for linear derivation rules
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Timezone for epoch timestamps ("UTC", "auto" or an IANA name)
    #[arg(long)]
    pub timezone: Option<String>,

    /// JSON config file (defaults to ~/.sensor-kpi/config.json when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format written to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report_format: ReportFormat,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Known dataset variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// HC-SR04 distance log with an ALERT flag column
    Ultrasonic,
    /// Analog temperature sensor log sampled as voltage
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

// ── OutputColumns ──────────────────────────────────────────────────────────────

/// Column headers of the processed CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumns {
    /// Header for the measurement values.
    pub measurement: String,
    /// Header for the underived input value, written before the measurement.
    #[serde(default)]
    pub source: Option<String>,
}

impl OutputColumns {
    /// Full header row in write order.
    pub fn header(&self) -> Vec<&str> {
        let mut cols = vec![TIMESTAMP_COLUMN];
        if let Some(source) = &self.source {
            cols.push(source.as_str());
        }
        cols.push(self.measurement.as_str());
        cols.push(STATUS_COLUMN);
        cols
    }
}

// ── ConfigFile ─────────────────────────────────────────────────────────────────

/// Optional overrides read from a JSON config file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_mapping: Option<FieldMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_rule: Option<DerivationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<OutputColumns>,
}

impl ConfigFile {
    /// Default location: `~/.sensor-kpi/config.json`.
    pub fn default_path() -> PathBuf {
        Self::default_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn default_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".sensor-kpi").join("config.json")
    }

    /// Load a config file that must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SensorError::FileNotFound(path.to_path_buf())
            } else {
                SensorError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load a config file if present; `Ok(None)` when it does not exist.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(path).map(Some)
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Everything one pipeline run needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub delimiter: u8,
    pub field_mapping: FieldMapping,
    pub alert_rule: DerivationRule,
    pub threshold: f64,
    pub timezone: String,
    pub columns: OutputColumns,
}

impl PipelineConfig {
    /// Defaults for a dataset preset.
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::Ultrasonic => Self {
                input_path: PathBuf::from("datos/raw/sensor_data.csv"),
                output_path: PathBuf::from("datos/processing/ultrasonic_processed.csv"),
                delimiter: b',',
                field_mapping: FieldMapping::new("ts_ms", "dist_avg", Some("estado")),
                alert_rule: DerivationRule::status_flag(),
                // Unused by the status-flag rule; applies once a linear rule
                // is configured for this preset.
                threshold: 30.0,
                timezone: "UTC".to_string(),
                columns: OutputColumns {
                    measurement: "Distancia_cm".to_string(),
                    source: None,
                },
            },
            Preset::Temperature => Self {
                input_path: PathBuf::from("datos/raw/datos_sucios_250_v2.csv"),
                output_path: PathBuf::from("datos/processing/Temperaturas_Procesado.csv"),
                delimiter: b';',
                field_mapping: FieldMapping::new("timestamp", "value", None),
                alert_rule: DerivationRule::voltage_to_temperature(),
                threshold: 40.0,
                timezone: "UTC".to_string(),
                columns: OutputColumns {
                    measurement: "Temp_C".to_string(),
                    source: Some("voltaje".to_string()),
                },
            },
        }
    }

    /// Overlay every field the config file sets.
    pub fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(v) = file.input_path {
            self.input_path = v;
        }
        if let Some(v) = file.output_path {
            self.output_path = v;
        }
        if let Some(v) = file.delimiter {
            self.delimiter = delimiter_byte(v)?;
        }
        if let Some(v) = file.field_mapping {
            self.field_mapping = v;
        }
        if let Some(v) = file.alert_rule {
            self.alert_rule = v;
        }
        if let Some(v) = file.threshold {
            self.threshold = v;
        }
        if let Some(v) = file.timezone {
            self.timezone = v;
        }
        if let Some(v) = file.columns {
            self.columns = v;
        }
        Ok(())
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.delimiter, b'"' | b'\n' | b'\r') {
            return Err(SensorError::Config(format!(
                "unusable delimiter {:?}",
                self.delimiter as char
            )));
        }
        if self.field_mapping.timestamp.trim().is_empty()
            || self.field_mapping.value.trim().is_empty()
        {
            return Err(SensorError::Config(
                "timestamp and value field names must not be empty".to_string(),
            ));
        }
        if self.alert_rule.uses_status_field() && self.field_mapping.status.is_none() {
            return Err(SensorError::Config(
                "categorical alert rule requires a status field".to_string(),
            ));
        }
        if let DerivationRule::Linear { scale, offset } = self.alert_rule {
            if !scale.is_finite() || !offset.is_finite() {
                return Err(SensorError::Config(
                    "linear rule coefficients must be finite".to_string(),
                ));
            }
        }
        if !self.threshold.is_finite() {
            return Err(SensorError::Config("threshold must be finite".to_string()));
        }
        if !TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(SensorError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        if self.columns.measurement.trim().is_empty() {
            return Err(SensorError::Config(
                "measurement column name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Resolve the run configuration: preset < config file < CLI flags.
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        self.resolve_config_with(&ConfigFile::default_path())
    }

    /// Same as [`resolve_config`](Self::resolve_config) with an explicit
    /// fallback config path, so tests can avoid the real home directory.
    pub fn resolve_config_with(&self, default_config_path: &Path) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::for_preset(self.preset);

        let file = match &self.config {
            Some(path) => Some(ConfigFile::load_from(path)?),
            None => ConfigFile::load_optional(default_config_path)?,
        };
        if let Some(file) = file {
            config.apply_file(file)?;
        }

        if let Some(v) = &self.input {
            config.input_path = v.clone();
        }
        if let Some(v) = &self.output {
            config.output_path = v.clone();
        }
        if let Some(v) = self.delimiter {
            config.delimiter = delimiter_byte(v)?;
        }
        if let Some(v) = &self.timestamp_field {
            config.field_mapping.timestamp = v.clone();
        }
        if let Some(v) = &self.value_field {
            config.field_mapping.value = v.clone();
        }
        if let Some(v) = &self.status_field {
            config.field_mapping.status = Some(v.clone());
        }
        if let Some(v) = &self.measurement_column {
            config.columns.measurement = v.clone();
        }
        if let Some(v) = self.threshold {
            config.threshold = v;
        }
        if let Some(v) = &self.timezone {
            config.timezone = v.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// The CSV reader needs a single-byte delimiter.
fn delimiter_byte(c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(SensorError::Config(format!(
            "delimiter {:?} is not a single ASCII character",
            c
        )))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
