//! External collaborators
//!
//! The engine never reads storage on its own. Observations, physiological history and
//! persisted configuration arrive through these traits, so the host app decides where
//! they live.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::{InMemoryObservations, InMemorySamples, MemoryStore};

use crate::baseline::{BaselineCalibrator, BaselineSample, SignalKind};
use crate::config::LoadConfiguration;
use crate::error::EngineError;
use crate::types::{DateRange, ObservationBatch};
use chrono::NaiveDate;

/// Supplies symptom and activity observations
pub trait ObservationSource {
    /// All observations whose effective date falls inside `range`
    fn observations(&self, range: DateRange) -> Result<ObservationBatch, EngineError>;
}

/// Supplies dated physiological readings (HRV, resting heart rate, sleep)
pub trait PhysiologicalSampleSource {
    /// Samples for `kind` in the `lookback_days` days ending on `as_of`
    fn samples(
        &self,
        kind: SignalKind,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<Vec<BaselineSample>, EngineError>;
}

/// Persists the active configuration and calibrator state between sessions
pub trait ConfigurationStore {
    fn load_configuration(&self) -> Result<Option<LoadConfiguration>, EngineError>;

    fn save_configuration(&mut self, configuration: &LoadConfiguration)
        -> Result<(), EngineError>;

    fn load_calibrator(&self, kind: SignalKind) -> Result<Option<BaselineCalibrator>, EngineError>;

    fn save_calibrator(&mut self, calibrator: &BaselineCalibrator) -> Result<(), EngineError>;
}

/// Inclusive window of `lookback_days` days ending on `as_of`; `None` when empty.
///
/// A window reaching past the earliest representable date starts there instead.
pub(crate) fn lookback_window(as_of: NaiveDate, lookback_days: u32) -> Option<DateRange> {
    if lookback_days == 0 {
        return None;
    }
    let start = as_of
        .checked_sub_signed(chrono::Duration::days(i64::from(lookback_days) - 1))
        .unwrap_or(NaiveDate::MIN);
    DateRange::new(start, as_of).ok()
}
