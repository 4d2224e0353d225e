//! Core types for the sensor KPI pipeline: data model, error taxonomy,
//! configuration, timestamp and value normalisation, and the numeric
//! helpers behind the KPI report.

pub mod calculations;
pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
