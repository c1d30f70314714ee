//! In-memory collaborators for tests, the CLI and hosts that already hold their data

use super::{lookback_window, ConfigurationStore, ObservationSource, PhysiologicalSampleSource};
use crate::baseline::{BaselineCalibrator, BaselineSample, SignalKind};
use crate::config::LoadConfiguration;
use crate::error::EngineError;
use crate::types::{ActivityObservation, DateRange, ObservationBatch, SymptomObservation};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Observation source backed by a batch held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryObservations {
    batch: ObservationBatch,
}

impl InMemoryObservations {
    pub fn new(batch: ObservationBatch) -> Self {
        Self { batch }
    }

    pub fn push_symptom(&mut self, symptom: SymptomObservation) {
        self.batch.symptoms.push(symptom);
    }

    pub fn push_activity(&mut self, activity: ActivityObservation) {
        self.batch.activities.push(activity);
    }

    pub fn batch(&self) -> &ObservationBatch {
        &self.batch
    }

    /// Earliest and latest effective date held, if any
    pub fn date_span(&self) -> Option<DateRange> {
        let dates = self
            .batch
            .symptoms
            .iter()
            .map(|s| s.date)
            .chain(self.batch.activities.iter().map(|a| a.date));
        let (min, max) = dates.fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })?;
        DateRange::new(min, max).ok()
    }
}

impl From<ObservationBatch> for InMemoryObservations {
    fn from(batch: ObservationBatch) -> Self {
        Self::new(batch)
    }
}

impl ObservationSource for InMemoryObservations {
    fn observations(&self, range: DateRange) -> Result<ObservationBatch, EngineError> {
        Ok(self.batch.within(range))
    }
}

/// Physiological sample source backed by per-kind vectors
#[derive(Debug, Clone, Default)]
pub struct InMemorySamples {
    samples: BTreeMap<SignalKind, Vec<BaselineSample>>,
}

impl InMemorySamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: SignalKind, date: NaiveDate, value: f64) {
        self.samples
            .entry(kind)
            .or_default()
            .push(BaselineSample::on(date, value));
    }

    pub fn len(&self, kind: SignalKind) -> usize {
        self.samples.get(&kind).map_or(0, Vec::len)
    }
}

impl PhysiologicalSampleSource for InMemorySamples {
    fn samples(
        &self,
        kind: SignalKind,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<Vec<BaselineSample>, EngineError> {
        let Some(window) = lookback_window(as_of, lookback_days) else {
            return Ok(Vec::new());
        };

        Ok(self
            .samples
            .get(&kind)
            .map(|all| {
                all.iter()
                    .filter(|s| s.date.map_or(false, |d| window.contains(d)))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Configuration store that lives only as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    configuration: Option<LoadConfiguration>,
    calibrators: BTreeMap<SignalKind, BaselineCalibrator>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigurationStore for MemoryStore {
    fn load_configuration(&self) -> Result<Option<LoadConfiguration>, EngineError> {
        Ok(self.configuration)
    }

    fn save_configuration(
        &mut self,
        configuration: &LoadConfiguration,
    ) -> Result<(), EngineError> {
        self.configuration = Some(*configuration);
        Ok(())
    }

    fn load_calibrator(&self, kind: SignalKind) -> Result<Option<BaselineCalibrator>, EngineError> {
        Ok(self.calibrators.get(&kind).cloned())
    }

    fn save_calibrator(&mut self, calibrator: &BaselineCalibrator) -> Result<(), EngineError> {
        self.calibrators
            .insert(calibrator.kind(), calibrator.clone());
        Ok(())
    }
}
