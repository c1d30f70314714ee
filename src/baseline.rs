//! Personal baseline calibration
//!
//! This module collects "good day" samples for a scalar signal and turns them into a
//! personal baseline (mean, spread, count). The same calibrator serves decayed load and
//! each physiological signal; only the `CalibrationPolicy` differs per signal kind.
//!
//! Lifecycle:
//!
//! ```text
//! idle --start--> collecting --record (n < min)--> collecting
//!                 collecting --record (n == min)--> calibrated
//!                 collecting --cancel--> cancelled (idle-equivalent)
//! calibrated --reset--> idle
//! ```
//!
//! Every operation invoked in a state where it does not apply returns a
//! `CalibrationError` instead of silently doing nothing.

use crate::error::{CalibrationError, ConfigError, EngineError};
use crate::types::LOOKBACK_LIMIT_DAYS;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Minimum good-day samples before the load baseline is calibrated
pub const LOAD_MIN_SAMPLES: usize = 3;

/// Maximum good-day samples retained for the load baseline
pub const LOAD_MAX_SAMPLES: usize = 14;

/// Maximum history days retained for physiological baselines
pub const PHYSIOLOGICAL_MAX_SAMPLES: usize = 30;

/// Scalar signals that can be calibrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Decayed load on self-reported good days
    Load,
    /// Heart rate variability (RMSSD, ms)
    Hrv,
    /// Resting heart rate (bpm)
    RestingHeartRate,
    /// Sleep duration (hours)
    SleepHours,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::Load,
        SignalKind::Hrv,
        SignalKind::RestingHeartRate,
        SignalKind::SleepHours,
    ];

    pub const PHYSIOLOGICAL: [SignalKind; 3] = [
        SignalKind::Hrv,
        SignalKind::RestingHeartRate,
        SignalKind::SleepHours,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Load => "load",
            SignalKind::Hrv => "hrv",
            SignalKind::RestingHeartRate => "resting_heart_rate",
            SignalKind::SleepHours => "sleep_hours",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SignalKind::Load => "load",
            SignalKind::Hrv => "ms",
            SignalKind::RestingHeartRate => "bpm",
            SignalKind::SleepHours => "hours",
        }
    }

    pub fn is_physiological(&self) -> bool {
        !matches!(self, SignalKind::Load)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignalKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngineError::ParseError(format!("unknown signal kind '{}'", s)))
    }
}

/// How the spread of a baseline is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispersion {
    /// Population standard deviation
    #[default]
    StandardDeviation,
    /// Mean absolute deviation around the mean; less sensitive to single outliers
    MeanAbsoluteDeviation,
}

/// Sample bounds and dispersion measure for one signal kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationPolicy {
    /// Samples required before the baseline is calibrated
    pub min_samples: usize,
    /// Most samples retained; older days are dropped first
    pub max_samples: usize,
    pub dispersion: Dispersion,
}

impl CalibrationPolicy {
    /// Default policy for a signal kind
    pub fn for_kind(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Load => Self {
                min_samples: LOAD_MIN_SAMPLES,
                max_samples: LOAD_MAX_SAMPLES,
                dispersion: Dispersion::StandardDeviation,
            },
            SignalKind::Hrv | SignalKind::RestingHeartRate => Self {
                min_samples: 3,
                max_samples: PHYSIOLOGICAL_MAX_SAMPLES,
                dispersion: Dispersion::MeanAbsoluteDeviation,
            },
            SignalKind::SleepHours => Self {
                min_samples: 3,
                max_samples: PHYSIOLOGICAL_MAX_SAMPLES,
                dispersion: Dispersion::StandardDeviation,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_samples == 0 {
            return Err(ConfigError::Validation(
                "min_samples must be at least 1".to_string(),
            ));
        }
        if self.max_samples < self.min_samples {
            return Err(ConfigError::Validation(format!(
                "max_samples ({}) is below min_samples ({})",
                self.max_samples, self.min_samples
            )));
        }
        // max_samples doubles as the history window for physiological calibration
        if self.max_samples > LOOKBACK_LIMIT_DAYS as usize {
            return Err(ConfigError::Validation(format!(
                "max_samples ({}) exceeds {}",
                self.max_samples, LOOKBACK_LIMIT_DAYS
            )));
        }
        Ok(())
    }
}

/// Calibration session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    #[default]
    Idle,
    Collecting,
    Calibrated,
    /// Last session was cancelled; behaves like idle
    Cancelled,
}

impl CalibrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationState::Idle => "idle",
            CalibrationState::Collecting => "collecting",
            CalibrationState::Calibrated => "calibrated",
            CalibrationState::Cancelled => "cancelled",
        }
    }

    fn can_start(&self) -> bool {
        matches!(self, CalibrationState::Idle | CalibrationState::Cancelled)
    }
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One good-day sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineSample {
    /// Day the sample describes; a dated sample replaces an earlier one for the same day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub value: f64,
}

impl BaselineSample {
    pub fn on(date: NaiveDate, value: f64) -> Self {
        Self {
            date: Some(date),
            value,
        }
    }

    pub fn undated(value: f64) -> Self {
        Self { date: None, value }
    }
}

/// Mean, spread and count of a calibrated signal
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonalBaseline {
    sample_count: usize,
    mean: f64,
    spread: f64,
    dispersion: Dispersion,
    calibrated: bool,
}

impl PersonalBaseline {
    /// Baseline with no samples
    pub fn uncalibrated(dispersion: Dispersion) -> Self {
        Self {
            dispersion,
            ..Default::default()
        }
    }

    /// Compute statistics over samples; calibrated once `min_samples` is met
    pub fn from_values(values: &[f64], dispersion: Dispersion, min_samples: usize) -> Self {
        if values.is_empty() {
            return Self::uncalibrated(dispersion);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let spread = match dispersion {
            Dispersion::StandardDeviation => {
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
            }
            Dispersion::MeanAbsoluteDeviation => {
                values.iter().map(|v| (v - mean).abs()).sum::<f64>() / n
            }
        };

        Self {
            sample_count: values.len(),
            mean,
            spread,
            dispersion,
            calibrated: values.len() >= min_samples,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn spread(&self) -> f64 {
        self.spread
    }

    pub fn dispersion(&self) -> Dispersion {
        self.dispersion
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }
}

/// Personal normal range at a given number of deviations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalRange {
    pub lower: f64,
    pub upper: f64,
}

/// Where a reading falls relative to the personal normal range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeAssessment {
    Below,
    Within,
    Above,
}

/// Result of recording a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Samples held after this call
    pub sample_count: usize,
    /// The sample replaced an earlier one for the same day
    pub replaced: bool,
    /// This call completed calibration
    pub calibrated: bool,
}

/// Calibration state machine for one signal kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineCalibrator {
    kind: SignalKind,
    policy: CalibrationPolicy,
    state: CalibrationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<Uuid>,
    #[serde(default)]
    samples: Vec<BaselineSample>,
    baseline: PersonalBaseline,
}

impl BaselineCalibrator {
    /// Calibrator with the default policy for `kind`
    pub fn new(kind: SignalKind) -> Self {
        Self::with_policy(kind, CalibrationPolicy::for_kind(kind))
    }

    pub fn with_policy(kind: SignalKind, policy: CalibrationPolicy) -> Self {
        Self {
            kind,
            policy,
            state: CalibrationState::Idle,
            session_id: None,
            samples: Vec::new(),
            baseline: PersonalBaseline::uncalibrated(policy.dispersion),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn policy(&self) -> &CalibrationPolicy {
        &self.policy
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn samples(&self) -> &[BaselineSample] {
        &self.samples
    }

    pub fn baseline(&self) -> &PersonalBaseline {
        &self.baseline
    }

    /// Check a calibrator read back from storage before it is used
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        if (self.state == CalibrationState::Calibrated) != self.baseline.is_calibrated() {
            return Err(ConfigError::Validation(format!(
                "{} calibrator is {} but its baseline is {}",
                self.kind,
                self.state,
                if self.baseline.is_calibrated() { "calibrated" } else { "uncalibrated" }
            )));
        }
        if self.samples.len() > self.policy.max_samples {
            return Err(ConfigError::Validation(format!(
                "{} calibrator holds {} samples, more than max_samples ({})",
                self.kind,
                self.samples.len(),
                self.policy.max_samples
            )));
        }
        if let Some(sample) = self.samples.iter().find(|s| !s.value.is_finite()) {
            return Err(ConfigError::Validation(format!(
                "{} calibrator holds a non-finite sample ({})",
                self.kind, sample.value
            )));
        }
        Ok(())
    }

    /// Begin collecting samples. Rejected while collecting or calibrated.
    pub fn start_calibration(&mut self) -> Result<Uuid, CalibrationError> {
        if !self.state.can_start() {
            warn!(kind = %self.kind, state = %self.state, "calibration start rejected");
            return Err(CalibrationError::AlreadyActive(self.state));
        }

        let session_id = Uuid::new_v4();
        self.samples.clear();
        self.baseline = PersonalBaseline::uncalibrated(self.policy.dispersion);
        self.session_id = Some(session_id);
        self.state = CalibrationState::Collecting;

        info!(kind = %self.kind, session = %session_id, "calibration started");
        Ok(session_id)
    }

    /// Record an undated sample
    pub fn record_value(&mut self, value: f64) -> Result<RecordOutcome, CalibrationError> {
        self.record_sample(BaselineSample::undated(value))
    }

    /// Record a good-day sample. Reaching the minimum count calibrates immediately.
    pub fn record_sample(
        &mut self,
        sample: BaselineSample,
    ) -> Result<RecordOutcome, CalibrationError> {
        if self.state != CalibrationState::Collecting {
            warn!(kind = %self.kind, state = %self.state, "sample rejected");
            return Err(CalibrationError::NotCollecting(self.state));
        }
        if !sample.value.is_finite() {
            return Err(CalibrationError::InvalidSample(sample.value));
        }

        let replaced = self.insert_sample(sample);
        let calibrated = self.samples.len() >= self.policy.min_samples;
        if calibrated {
            self.promote();
        } else {
            debug!(
                kind = %self.kind,
                count = self.samples.len(),
                needed = self.policy.min_samples,
                "sample recorded"
            );
        }

        Ok(RecordOutcome {
            sample_count: self.samples.len(),
            replaced,
            calibrated,
        })
    }

    /// Calibrate in one step from provider history.
    ///
    /// Keeps the most recent `max_samples` distinct days. With fewer than
    /// `min_samples` days the session stays collecting so more can be recorded.
    pub fn calibrate_from_history(
        &mut self,
        history: &[BaselineSample],
    ) -> Result<RecordOutcome, CalibrationError> {
        self.start_calibration()?;

        let mut dated: Vec<BaselineSample> = history
            .iter()
            .filter(|s| s.value.is_finite())
            .copied()
            .collect();
        // Stable sort keeps input order within a day, so the last entry wins on insert
        dated.sort_by_key(|s| s.date);

        let mut replaced = false;
        for sample in dated {
            replaced |= self.insert_sample(sample);
        }

        let calibrated = self.samples.len() >= self.policy.min_samples;
        if calibrated {
            self.promote();
        } else {
            info!(
                kind = %self.kind,
                count = self.samples.len(),
                needed = self.policy.min_samples,
                "history too short to calibrate"
            );
        }

        Ok(RecordOutcome {
            sample_count: self.samples.len(),
            replaced,
            calibrated,
        })
    }

    /// Abandon the current session, discarding its samples. Returns the discarded count.
    pub fn cancel_calibration(&mut self) -> Result<usize, CalibrationError> {
        if self.state != CalibrationState::Collecting {
            warn!(kind = %self.kind, state = %self.state, "cancel rejected");
            return Err(CalibrationError::NotCollecting(self.state));
        }

        let discarded = self.samples.len();
        self.samples.clear();
        self.session_id = None;
        self.state = CalibrationState::Cancelled;

        info!(kind = %self.kind, discarded, "calibration cancelled");
        Ok(discarded)
    }

    /// Discard a calibrated baseline and return to idle
    pub fn reset_baseline(&mut self) -> Result<(), CalibrationError> {
        if self.state != CalibrationState::Calibrated {
            warn!(kind = %self.kind, state = %self.state, "reset rejected");
            return Err(CalibrationError::NotCalibrated(self.state));
        }

        self.samples.clear();
        self.session_id = None;
        self.baseline = PersonalBaseline::uncalibrated(self.policy.dispersion);
        self.state = CalibrationState::Idle;

        info!(kind = %self.kind, "baseline reset");
        Ok(())
    }

    /// `mean + deviations * spread`; only meaningful on a calibrated baseline
    pub fn threshold(&self, deviations: f64) -> Result<f64, CalibrationError> {
        let baseline = self.calibrated_baseline()?;
        Ok(baseline.mean + deviations * baseline.spread)
    }

    /// Symmetric range `mean ± deviations * spread`
    pub fn normal_range(&self, deviations: f64) -> Result<NormalRange, CalibrationError> {
        let deviations = deviations.abs();
        Ok(NormalRange {
            lower: self.threshold(-deviations)?,
            upper: self.threshold(deviations)?,
        })
    }

    /// Place a reading relative to the normal range
    pub fn assess(&self, value: f64, deviations: f64) -> Result<RangeAssessment, CalibrationError> {
        let range = self.normal_range(deviations)?;
        Ok(if value < range.lower {
            RangeAssessment::Below
        } else if value > range.upper {
            RangeAssessment::Above
        } else {
            RangeAssessment::Within
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn calibrated_baseline(&self) -> Result<&PersonalBaseline, CalibrationError> {
        if self.state == CalibrationState::Calibrated && self.baseline.is_calibrated() {
            Ok(&self.baseline)
        } else {
            Err(CalibrationError::NotCalibrated(self.state))
        }
    }

    // Returns true when a dated sample replaced one for the same day.
    fn insert_sample(&mut self, sample: BaselineSample) -> bool {
        if let Some(date) = sample.date {
            if let Some(existing) = self.samples.iter_mut().find(|s| s.date == Some(date)) {
                existing.value = sample.value;
                return true;
            }
        }

        self.samples.push(sample);
        while self.samples.len() > self.policy.max_samples {
            self.samples.remove(0);
        }
        false
    }

    fn promote(&mut self) {
        let values: Vec<f64> = self.samples.iter().map(|s| s.value).collect();
        self.baseline =
            PersonalBaseline::from_values(&values, self.policy.dispersion, self.policy.min_samples);
        self.state = CalibrationState::Calibrated;

        info!(
            kind = %self.kind,
            count = self.baseline.sample_count,
            mean = self.baseline.mean,
            spread = self.baseline.spread,
            "baseline calibrated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn collecting(kind: SignalKind) -> BaselineCalibrator {
        let mut calibrator = BaselineCalibrator::new(kind);
        calibrator.start_calibration().unwrap();
        calibrator
    }

    #[test]
    fn test_calibrates_on_third_sample() {
        let mut calibrator = collecting(SignalKind::Load);

        let first = calibrator.record_value(12.0).unwrap();
        let second = calibrator.record_value(15.0).unwrap();
        assert!(!first.calibrated && !second.calibrated);
        assert!(!calibrator.baseline().is_calibrated());
        assert_eq!(calibrator.state(), CalibrationState::Collecting);

        let third = calibrator.record_value(18.0).unwrap();
        assert!(third.calibrated);
        assert_eq!(calibrator.state(), CalibrationState::Calibrated);
        assert!(calibrator.baseline().is_calibrated());
        assert_eq!(calibrator.baseline().sample_count(), 3);
        assert!((calibrator.baseline().mean() - 15.0).abs() < 1e-9);
        // Population standard deviation of 12, 15, 18
        assert!((calibrator.baseline().spread() - 6.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_record_outside_collecting_rejected() {
        let mut calibrator = BaselineCalibrator::new(SignalKind::Load);
        assert_eq!(
            calibrator.record_value(1.0),
            Err(CalibrationError::NotCollecting(CalibrationState::Idle))
        );

        let mut calibrator = collecting(SignalKind::Load);
        for v in [1.0, 2.0, 3.0] {
            calibrator.record_value(v).unwrap();
        }
        assert_eq!(
            calibrator.record_value(4.0),
            Err(CalibrationError::NotCollecting(CalibrationState::Calibrated))
        );
        // The rejected sample did not leak into the baseline
        assert_eq!(calibrator.baseline().sample_count(), 3);
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let mut calibrator = collecting(SignalKind::Hrv);
        assert!(matches!(
            calibrator.record_value(f64::NAN),
            Err(CalibrationError::InvalidSample(_))
        ));
        assert!(calibrator.samples().is_empty());
    }

    #[test]
    fn test_start_rejected_when_active() {
        let mut calibrator = collecting(SignalKind::Load);
        assert_eq!(
            calibrator.start_calibration(),
            Err(CalibrationError::AlreadyActive(CalibrationState::Collecting))
        );
    }

    #[test]
    fn test_same_day_sample_replaces() {
        let mut calibrator = collecting(SignalKind::Load);
        calibrator.record_sample(BaselineSample::on(date(1), 10.0)).unwrap();
        let outcome = calibrator
            .record_sample(BaselineSample::on(date(1), 14.0))
            .unwrap();
        assert!(outcome.replaced);
        assert_eq!(outcome.sample_count, 1);
        assert_eq!(calibrator.samples()[0].value, 14.0);
    }

    #[test]
    fn test_cancel_discards_samples() {
        let mut calibrator = collecting(SignalKind::Load);
        calibrator.record_value(5.0).unwrap();
        calibrator.record_value(6.0).unwrap();

        assert_eq!(calibrator.cancel_calibration(), Ok(2));
        assert_eq!(calibrator.state(), CalibrationState::Cancelled);
        assert!(calibrator.samples().is_empty());
        assert!(calibrator.session_id().is_none());

        // Cancelled is idle-equivalent
        assert!(calibrator.start_calibration().is_ok());
        assert!(calibrator.samples().is_empty());

        let mut idle = BaselineCalibrator::new(SignalKind::Load);
        assert_eq!(
            idle.cancel_calibration(),
            Err(CalibrationError::NotCollecting(CalibrationState::Idle))
        );
    }

    #[test]
    fn test_threshold_requires_calibration() {
        let mut calibrator = collecting(SignalKind::Load);
        calibrator.record_value(10.0).unwrap();
        assert_eq!(
            calibrator.threshold(1.0),
            Err(CalibrationError::NotCalibrated(CalibrationState::Collecting))
        );

        calibrator.record_value(20.0).unwrap();
        calibrator.record_value(30.0).unwrap();
        let sd = calibrator.baseline().spread();
        assert!((calibrator.threshold(0.0).unwrap() - 20.0).abs() < 1e-9);
        assert!((calibrator.threshold(2.0).unwrap() - (20.0 + 2.0 * sd)).abs() < 1e-9);
    }

    #[test]
    fn test_reset_then_start_matches_fresh_session() {
        let mut calibrator = collecting(SignalKind::Load);
        for v in [3.0, 4.0, 5.0] {
            calibrator.record_value(v).unwrap();
        }
        calibrator.reset_baseline().unwrap();
        calibrator.start_calibration().unwrap();

        let fresh = collecting(SignalKind::Load);
        assert_eq!(calibrator.state(), fresh.state());
        assert_eq!(calibrator.samples(), fresh.samples());
        assert_eq!(calibrator.baseline(), fresh.baseline());
        assert_eq!(calibrator.policy(), fresh.policy());
        assert!(calibrator.session_id().is_some());
    }

    #[test]
    fn test_reset_requires_calibrated() {
        let mut calibrator = collecting(SignalKind::Load);
        assert_eq!(
            calibrator.reset_baseline(),
            Err(CalibrationError::NotCalibrated(CalibrationState::Collecting))
        );
    }

    #[test]
    fn test_history_keeps_most_recent_days() {
        let policy = CalibrationPolicy {
            min_samples: 3,
            max_samples: 5,
            dispersion: Dispersion::MeanAbsoluteDeviation,
        };
        let mut calibrator = BaselineCalibrator::with_policy(SignalKind::Hrv, policy);

        // Out of order, with a duplicate day
        let mut history: Vec<BaselineSample> = (1..=8)
            .rev()
            .map(|d| BaselineSample::on(date(d), 40.0 + d as f64))
            .collect();
        history.push(BaselineSample::on(date(8), 60.0));

        let outcome = calibrator.calibrate_from_history(&history).unwrap();
        assert!(outcome.calibrated);
        assert_eq!(outcome.sample_count, 5);

        let kept: Vec<Option<NaiveDate>> = calibrator.samples().iter().map(|s| s.date).collect();
        assert_eq!(
            kept,
            vec![Some(date(4)), Some(date(5)), Some(date(6)), Some(date(7)), Some(date(8))]
        );
        // Day 8 resolved to the later entry
        assert_eq!(calibrator.samples()[4].value, 60.0);

        // 44, 45, 46, 47, 60 -> mean 48.4, MAD (4.4 + 3.4 + 2.4 + 1.4 + 11.6) / 5
        assert!((calibrator.baseline().mean() - 48.4).abs() < 1e-9);
        assert!((calibrator.baseline().spread() - 4.64).abs() < 1e-9);
    }

    #[test]
    fn test_short_history_stays_collecting() {
        let mut calibrator = BaselineCalibrator::new(SignalKind::RestingHeartRate);
        let outcome = calibrator
            .calibrate_from_history(&[BaselineSample::on(date(1), 58.0)])
            .unwrap();
        assert!(!outcome.calibrated);
        assert_eq!(calibrator.state(), CalibrationState::Collecting);

        calibrator.record_sample(BaselineSample::on(date(2), 60.0)).unwrap();
        let last = calibrator.record_sample(BaselineSample::on(date(3), 62.0)).unwrap();
        assert!(last.calibrated);
        assert!((calibrator.baseline().mean() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_assess_against_normal_range() {
        let mut calibrator = collecting(SignalKind::Hrv);
        for v in [50.0, 60.0, 70.0] {
            calibrator.record_value(v).unwrap();
        }
        // MAD of 50, 60, 70 is 20 / 3
        let range = calibrator.normal_range(1.5).unwrap();
        assert!((range.lower - 50.0).abs() < 1e-9);
        assert!((range.upper - 70.0).abs() < 1e-9);

        assert_eq!(calibrator.assess(45.0, 1.5), Ok(RangeAssessment::Below));
        assert_eq!(calibrator.assess(60.0, 1.5), Ok(RangeAssessment::Within));
        assert_eq!(calibrator.assess(75.0, 1.5), Ok(RangeAssessment::Above));
    }

    #[test]
    fn test_signal_kind_from_str() {
        for kind in SignalKind::ALL {
            assert_eq!(kind.as_str().parse::<SignalKind>().unwrap(), kind);
        }
        assert!("heart_rate".parse::<SignalKind>().is_err());
    }

    #[test]
    fn test_policy_validation() {
        assert!(CalibrationPolicy::for_kind(SignalKind::Load).validate().is_ok());
        let bad = CalibrationPolicy {
            min_samples: 5,
            max_samples: 3,
            dispersion: Dispersion::StandardDeviation,
        };
        assert!(bad.validate().is_err());

        let unbounded = CalibrationPolicy {
            max_samples: usize::MAX,
            ..CalibrationPolicy::for_kind(SignalKind::Hrv)
        };
        assert!(unbounded.validate().is_err());

        let year = CalibrationPolicy {
            max_samples: LOOKBACK_LIMIT_DAYS as usize,
            ..CalibrationPolicy::for_kind(SignalKind::Hrv)
        };
        assert!(year.validate().is_ok());
    }

    #[test]
    fn test_calibrator_validation() {
        let mut calibrator = collecting(SignalKind::Load);
        assert!(calibrator.validate().is_ok());
        for v in [10.0, 12.0, 14.0] {
            calibrator.record_value(v).unwrap();
        }
        assert!(calibrator.validate().is_ok());

        // Calibrated state with an uncalibrated baseline
        let mut mismatched = calibrator.clone();
        mismatched.baseline = PersonalBaseline::uncalibrated(Dispersion::StandardDeviation);
        assert!(mismatched.validate().is_err());

        // Idle state with a calibrated baseline
        let mut mismatched = calibrator.clone();
        mismatched.state = CalibrationState::Idle;
        assert!(mismatched.validate().is_err());

        let mut inverted = calibrator.clone();
        inverted.policy.min_samples = 5;
        inverted.policy.max_samples = 2;
        assert!(inverted.validate().is_err());

        let mut overfull = calibrator.clone();
        overfull.policy.max_samples = 3;
        overfull.samples.push(BaselineSample::on(date(9), 11.0));
        assert!(overfull.validate().is_err());

        let mut non_finite = calibrator;
        non_finite.samples[0].value = f64::NAN;
        assert!(non_finite.validate().is_err());
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut calibrator = collecting(SignalKind::SleepHours);
        calibrator.record_sample(BaselineSample::on(date(2), 7.5)).unwrap();

        let json = calibrator.to_json().unwrap();
        let loaded = BaselineCalibrator::from_json(&json).unwrap();
        assert_eq!(loaded, calibrator);
    }
}
