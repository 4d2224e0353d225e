//! Data pipeline for the sensor KPI tool.
//!
//! Reads delimited sensor logs, validates and normalises each row, folds the
//! accepted records into run statistics, writes the processed CSV and renders
//! the run report.

pub mod aggregator;
pub mod analysis;
pub mod cleaner;
pub mod reader;
pub mod report;
pub mod writer;

pub use sensor_core as core;
