//! Engine orchestration
//!
//! This module provides the public API for Synheart Pace.
//! It runs observations through aggregation, decay and classification, and owns the
//! calibrators for every signal kind.

use crate::aggregator::ContributionAggregator;
use crate::baseline::{
    BaselineCalibrator, BaselineSample, CalibrationPolicy, RangeAssessment, RecordOutcome,
    SignalKind,
};
use crate::classifier::RiskClassifier;
use crate::config::{
    CapacityLevel, ConditionPreset, EngineSettings, LoadConfiguration, LoadParameters, PaceConfig,
    ParameterUpdate, RecoveryWindow, SensitivityProfile,
};
use crate::decay::{fill_calendar, required_lookback_days, DecayChain};
use crate::error::{CalibrationError, ConfigError, EngineError};
use crate::sources::{ConfigurationStore, ObservationSource, PhysiologicalSampleSource};
use crate::thresholds::{ResolvedThresholds, ThresholdProfile, ThresholdResolver};
use crate::types::{DailyLoadScore, DateRange, ObservationBatch, RiskLevel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Version of the snapshot JSON layout
pub const SNAPSHOT_VERSION: u32 = 1;

/// Compute daily scores for `range` from an in-memory batch.
///
/// `lookback_days` of history before `range.start` are run through the decay chain
/// and then dropped from the output. No personal baseline is applied. Lookbacks above
/// `LOOKBACK_LIMIT_DAYS` are rejected.
///
/// # Example
/// ```ignore
/// let scores = compute_daily_load_scores(&batch, range, 60, &LoadConfiguration::default())?;
/// ```
pub fn compute_daily_load_scores(
    batch: &ObservationBatch,
    range: DateRange,
    lookback_days: u32,
    configuration: &LoadConfiguration,
) -> Result<Vec<DailyLoadScore>, EngineError> {
    let resolved = ThresholdResolver::resolve(configuration);
    score_range(
        batch,
        range,
        lookback_days,
        configuration.parameters().sensitivity,
        resolved.half_life_days,
        &RiskClassifier::new(resolved.profile),
    )
}

/// Pipeline stages:
/// 1. Restrict observations to the lookback-extended window
/// 2. ContributionAggregator - raw load per day
/// 3. fill_calendar - explicit zero days
/// 4. DecayChain - decayed load
/// 5. RiskClassifier - risk level for displayed days
fn score_range(
    batch: &ObservationBatch,
    range: DateRange,
    lookback_days: u32,
    sensitivity: SensitivityProfile,
    half_life_days: f64,
    classifier: &RiskClassifier,
) -> Result<Vec<DailyLoadScore>, EngineError> {
    let window = range.with_lookback(lookback_days)?;
    let in_window = batch.within(window);
    let dropped = batch.len() - in_window.len();
    if dropped > 0 {
        warn!(dropped, "observations outside the computation window ignored");
    }

    let by_day = ContributionAggregator::new(sensitivity).aggregate_batch(&in_window);
    let series = fill_calendar(window, &by_day);
    let decayed = DecayChain::new(half_life_days)?.compute(&series)?;

    let scores: Vec<DailyLoadScore> = series
        .iter()
        .zip(&decayed)
        .skip(lookback_days as usize)
        .map(|((date, raw), load)| DailyLoadScore {
            date: *date,
            raw_contribution: *raw,
            decayed_load: *load,
            risk_level: classifier.classify(*load),
        })
        .collect();

    debug!(
        days = scores.len(),
        lookback_days,
        observations = in_window.len(),
        active_days = by_day.len(),
        "daily load scores computed"
    );
    Ok(scores)
}

/// One calibrator per signal kind
#[derive(Debug, Clone, PartialEq)]
struct Calibrators {
    load: BaselineCalibrator,
    hrv: BaselineCalibrator,
    resting_heart_rate: BaselineCalibrator,
    sleep_hours: BaselineCalibrator,
}

impl Calibrators {
    fn new(settings: &EngineSettings) -> Self {
        let make = |kind| BaselineCalibrator::with_policy(kind, policy_for(settings, kind));
        Self {
            load: make(SignalKind::Load),
            hrv: make(SignalKind::Hrv),
            resting_heart_rate: make(SignalKind::RestingHeartRate),
            sleep_hours: make(SignalKind::SleepHours),
        }
    }

    fn get(&self, kind: SignalKind) -> &BaselineCalibrator {
        match kind {
            SignalKind::Load => &self.load,
            SignalKind::Hrv => &self.hrv,
            SignalKind::RestingHeartRate => &self.resting_heart_rate,
            SignalKind::SleepHours => &self.sleep_hours,
        }
    }

    fn get_mut(&mut self, kind: SignalKind) -> &mut BaselineCalibrator {
        match kind {
            SignalKind::Load => &mut self.load,
            SignalKind::Hrv => &mut self.hrv,
            SignalKind::RestingHeartRate => &mut self.resting_heart_rate,
            SignalKind::SleepHours => &mut self.sleep_hours,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &BaselineCalibrator> {
        [
            &self.load,
            &self.hrv,
            &self.resting_heart_rate,
            &self.sleep_hours,
        ]
        .into_iter()
    }
}

fn policy_for(settings: &EngineSettings, kind: SignalKind) -> CalibrationPolicy {
    let configured = if kind.is_physiological() {
        settings.physiological_calibration
    } else {
        settings.load_calibration
    };
    configured.unwrap_or_else(|| CalibrationPolicy::for_kind(kind))
}

/// Persistable engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub configuration: LoadConfiguration,
    pub calibrators: Vec<BaselineCalibrator>,
}

/// Stateful engine holding the configuration and personal baselines.
///
/// Construct one per user and pass it around explicitly; mutation takes `&mut self`.
#[derive(Debug, Clone)]
pub struct LoadEngine {
    configuration: LoadConfiguration,
    settings: EngineSettings,
    calibrators: Calibrators,
}

impl Default for LoadEngine {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            configuration: LoadConfiguration::default(),
            calibrators: Calibrators::new(&settings),
            settings,
        }
    }
}

impl LoadEngine {
    /// Create an engine, rejecting invalid settings
    pub fn new(
        configuration: LoadConfiguration,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        settings.validate()?;
        Ok(Self {
            configuration,
            calibrators: Calibrators::new(&settings),
            settings,
        })
    }

    pub fn from_config(config: PaceConfig) -> Result<Self, EngineError> {
        Self::new(config.configuration, config.settings)
    }

    /// Restore configuration and calibrators from a store; missing values use defaults
    pub fn load_from(
        store: &dyn ConfigurationStore,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let configuration = store.load_configuration()?.unwrap_or_default();
        let mut engine = Self::new(configuration, settings)?;
        for kind in SignalKind::ALL {
            if let Some(calibrator) = store.load_calibrator(kind)? {
                if calibrator.kind() != kind {
                    return Err(EngineError::Config(ConfigError::Validation(format!(
                        "stored {} calibrator is for {}",
                        kind,
                        calibrator.kind()
                    ))));
                }
                calibrator.validate()?;
                *engine.calibrators.get_mut(kind) = calibrator;
            }
        }
        info!(preset = ?engine.configuration.preset(), "engine state loaded");
        Ok(engine)
    }

    /// Persist configuration and every calibrator
    pub fn save_to(&self, store: &mut dyn ConfigurationStore) -> Result<(), EngineError> {
        store.save_configuration(&self.configuration)?;
        for calibrator in self.calibrators.iter() {
            store.save_calibrator(calibrator)?;
        }
        Ok(())
    }

    pub fn configuration(&self) -> &LoadConfiguration {
        &self.configuration
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn parameters(&self) -> LoadParameters {
        self.configuration.parameters()
    }

    pub fn resolved_thresholds(&self) -> ResolvedThresholds {
        ThresholdResolver::resolve(&self.configuration)
    }

    /// Lookback used when the caller does not pass one: long enough for pre-window
    /// history to fall below the configured tolerance, clamped to the settings bounds.
    pub fn lookback_days(&self) -> u32 {
        let required = required_lookback_days(
            self.resolved_thresholds().half_life_days,
            self.settings.lookback_tolerance,
        );
        required
            .max(self.settings.min_lookback_days)
            .min(self.settings.max_lookback_days)
    }

    pub fn set_configuration(&mut self, configuration: LoadConfiguration) {
        info!(preset = ?configuration.preset(), "configuration replaced");
        self.configuration = configuration;
    }

    pub fn select_preset(&mut self, preset: ConditionPreset) {
        info!(preset = preset.as_str(), "preset selected");
        self.configuration.select_preset(preset);
    }

    pub fn set_capacity(&mut self, capacity: CapacityLevel) -> ParameterUpdate {
        log_update(self.configuration.set_capacity(capacity))
    }

    pub fn set_sensitivity(&mut self, sensitivity: SensitivityProfile) -> ParameterUpdate {
        log_update(self.configuration.set_sensitivity(sensitivity))
    }

    pub fn set_recovery(&mut self, recovery: RecoveryWindow) -> ParameterUpdate {
        log_update(self.configuration.set_recovery(recovery))
    }

    pub fn set_thresholds(&mut self, thresholds: ThresholdProfile) -> ParameterUpdate {
        log_update(self.configuration.set_thresholds(thresholds))
    }

    /// Classifier for the active profile, personalised once the load baseline is calibrated
    pub fn classifier(&self) -> RiskClassifier {
        RiskClassifier::with_baseline(
            self.resolved_thresholds().profile,
            self.calibrators.load.baseline(),
        )
    }

    pub fn classify(&self, load: f64) -> RiskLevel {
        self.classifier().classify(load)
    }

    /// Daily scores for `range`, reading observations from `source`.
    ///
    /// With `lookback_days` of `None` the engine picks `lookback_days()`.
    pub fn compute_daily_load_scores(
        &self,
        source: &dyn ObservationSource,
        range: DateRange,
        lookback_days: Option<u32>,
    ) -> Result<Vec<DailyLoadScore>, EngineError> {
        let lookback = lookback_days.unwrap_or_else(|| self.lookback_days());
        let batch = source.observations(range.with_lookback(lookback)?)?;
        let resolved = self.resolved_thresholds();

        score_range(
            &batch,
            range,
            lookback,
            self.configuration.parameters().sensitivity,
            resolved.half_life_days,
            &self.classifier(),
        )
    }

    pub fn calibrator(&self, kind: SignalKind) -> &BaselineCalibrator {
        self.calibrators.get(kind)
    }

    pub fn start_calibration(&mut self, kind: SignalKind) -> Result<Uuid, CalibrationError> {
        self.calibrators.get_mut(kind).start_calibration()
    }

    pub fn record_sample(
        &mut self,
        kind: SignalKind,
        sample: BaselineSample,
    ) -> Result<RecordOutcome, CalibrationError> {
        self.calibrators.get_mut(kind).record_sample(sample)
    }

    pub fn cancel_calibration(&mut self, kind: SignalKind) -> Result<usize, CalibrationError> {
        self.calibrators.get_mut(kind).cancel_calibration()
    }

    pub fn reset_baseline(&mut self, kind: SignalKind) -> Result<(), CalibrationError> {
        self.calibrators.get_mut(kind).reset_baseline()
    }

    pub fn threshold(&self, kind: SignalKind, deviations: f64) -> Result<f64, CalibrationError> {
        self.calibrators.get(kind).threshold(deviations)
    }

    pub fn assess(
        &self,
        kind: SignalKind,
        value: f64,
        deviations: f64,
    ) -> Result<RangeAssessment, CalibrationError> {
        self.calibrators.get(kind).assess(value, deviations)
    }

    /// Record the decayed load of a self-reported good day into the load calibration
    pub fn record_good_day(
        &mut self,
        date: NaiveDate,
        source: &dyn ObservationSource,
    ) -> Result<RecordOutcome, EngineError> {
        let range = DateRange::new(date, date)?;
        let scores = self.compute_daily_load_scores(source, range, None)?;
        let load = match scores.first() {
            Some(score) => score.decayed_load,
            None => return Err(EngineError::InvalidDateRange { start: date, end: date }),
        };

        debug!(%date, load, "good day load");
        Ok(self
            .calibrators
            .load
            .record_sample(BaselineSample::on(date, load))?)
    }

    /// Calibrate a physiological baseline from provider history ending on `as_of`.
    ///
    /// The calibrator must be idle or cancelled; reset a calibrated baseline first.
    pub fn calibrate_physiological(
        &mut self,
        kind: SignalKind,
        source: &dyn PhysiologicalSampleSource,
        as_of: NaiveDate,
    ) -> Result<RecordOutcome, EngineError> {
        if !kind.is_physiological() {
            return Err(EngineError::UnsupportedSignal(kind));
        }

        let calibrator = self.calibrators.get_mut(kind);
        let lookback = u32::try_from(calibrator.policy().max_samples).unwrap_or(u32::MAX);
        let history = source.samples(kind, as_of, lookback)?;
        debug!(%kind, samples = history.len(), "physiological history fetched");

        Ok(calibrator.calibrate_from_history(&history)?)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            configuration: self.configuration,
            calibrators: self.calibrators.iter().cloned().collect(),
        }
    }

    /// Replace configuration and calibrators with a snapshot.
    ///
    /// Kinds absent from the snapshot get a fresh calibrator.
    pub fn restore(&mut self, snapshot: EngineSnapshot) -> Result<(), EngineError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::ParseError(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let mut calibrators = Calibrators::new(&self.settings);
        for calibrator in snapshot.calibrators {
            calibrator.validate()?;
            let kind = calibrator.kind();
            *calibrators.get_mut(kind) = calibrator;
        }

        self.configuration = snapshot.configuration;
        self.calibrators = calibrators;
        info!(version = snapshot.version, "engine state restored");
        Ok(())
    }

    /// Save engine state to JSON
    pub fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Load engine state from JSON
    pub fn load_state(&mut self, json: &str) -> Result<(), EngineError> {
        let snapshot: EngineSnapshot = serde_json::from_str(json)?;
        self.restore(snapshot)
    }
}

fn log_update(update: ParameterUpdate) -> ParameterUpdate {
    match update {
        ParameterUpdate::ReclassifiedToCustom { previous_preset } => {
            info!(
                previous_preset = previous_preset.as_str(),
                "manual change switched configuration to custom"
            );
        }
        ParameterUpdate::Applied => debug!("custom parameter updated"),
    }
    update
}
