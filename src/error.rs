//! Error types for Synheart Pace

use crate::baseline::{CalibrationState, SignalKind};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during load computation
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Daily contributions are not contiguous at {0}")]
    NonContiguousDays(NaiveDate),

    #[error("Invalid raw contribution {value} on {date}")]
    InvalidContribution { date: NaiveDate, value: f64 },

    #[error("Invalid lookback: {0} days (at most {})", crate::types::LOOKBACK_LIMIT_DAYS)]
    InvalidLookback(u32),

    #[error("Invalid half-life: {0} days")]
    InvalidHalfLife(f64),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0} is not a physiological signal")]
    UnsupportedSignal(SignalKind),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Calibration operations invoked in a state where they do not apply
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("calibration cannot start while {0}")]
    AlreadyActive(CalibrationState),

    #[error("no calibration is collecting samples (state: {0})")]
    NotCollecting(CalibrationState),

    #[error("baseline is not calibrated (state: {0})")]
    NotCalibrated(CalibrationState),

    #[error("sample value {0} is not a finite number")]
    InvalidSample(f64),
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}
