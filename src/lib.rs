//! Synheart Pace - On-device load-capacity engine for symptom and activity pacing
//!
//! Pace turns dated symptom and activity observations into a daily, exponentially
//! decayed load and classifies it against personal risk thresholds through a
//! deterministic pipeline: per-day aggregation → decay chain → classification.
//!
//! ## Modules
//!
//! - **Load Pipeline**: thresholds, aggregation, decay and risk classification
//! - **Calibration**: personal baselines for load and physiological signals
//! - **Interfaces**: observation sources, configuration stores, record schema, FFI

pub mod aggregator;
pub mod baseline;
pub mod classifier;
pub mod config;
pub mod decay;
pub mod engine;
pub mod error;
pub mod schema;
pub mod sources;
pub mod thresholds;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use baseline::{
    BaselineCalibrator, BaselineSample, CalibrationPolicy, CalibrationState, PersonalBaseline,
    SignalKind,
};
pub use config::{
    CapacityLevel, ConditionPreset, EngineSettings, LoadConfiguration, LoadParameters, PaceConfig,
    RecoveryWindow, SensitivityProfile,
};
pub use engine::{compute_daily_load_scores, EngineSnapshot, LoadEngine};
pub use error::{CalibrationError, ConfigError, EngineError};
pub use thresholds::{ThresholdProfile, ThresholdResolver};
pub use types::{DailyLoadScore, DateRange, RiskLevel};

// Schema exports
pub use schema::{ObservationRecord, RecordAdapter, SCHEMA_VERSION};

/// Pace version reported by the CLI and FFI
pub const PACE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported in diagnostics
pub const PRODUCER_NAME: &str = "synheart-pace";
