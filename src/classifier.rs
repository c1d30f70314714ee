//! Risk classification
//!
//! Maps a decayed load to one of four ordered risk levels. A calibrated load baseline
//! shifts all boundaries by the user's good-day mean, so a typical good day sits at the
//! low end of "safe" while the spacing between bands is unchanged.

use crate::baseline::PersonalBaseline;
use crate::thresholds::ThresholdProfile;
use crate::types::RiskLevel;

/// Classify a load against a profile without personalisation
pub fn classify(load: f64, profile: &ThresholdProfile) -> RiskLevel {
    RiskClassifier::new(*profile).classify(load)
}

/// Classifier bound to a profile and an optional baseline shift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskClassifier {
    profile: ThresholdProfile,
    baseline_shift: f64,
}

impl RiskClassifier {
    pub fn new(profile: ThresholdProfile) -> Self {
        Self {
            profile,
            baseline_shift: 0.0,
        }
    }

    /// Personalise with a load baseline. Uncalibrated baselines are ignored.
    pub fn with_baseline(profile: ThresholdProfile, baseline: &PersonalBaseline) -> Self {
        let baseline_shift = if baseline.is_calibrated() {
            baseline.mean().max(0.0)
        } else {
            0.0
        };
        Self {
            profile,
            baseline_shift,
        }
    }

    pub fn profile(&self) -> &ThresholdProfile {
        &self.profile
    }

    /// Amount added to every boundary
    pub fn baseline_shift(&self) -> f64 {
        self.baseline_shift
    }

    /// Boundaries after applying the baseline shift
    pub fn effective_boundaries(&self) -> [f64; 3] {
        self.profile.boundaries().map(|b| b + self.baseline_shift)
    }

    /// Total over all inputs; NaN classifies as safe
    pub fn classify(&self, load: f64) -> RiskLevel {
        let adjusted = load - self.baseline_shift;
        if adjusted >= self.profile.high_boundary() {
            RiskLevel::Critical
        } else if adjusted >= self.profile.caution_boundary() {
            RiskLevel::High
        } else if adjusted >= self.profile.safe_boundary() {
            RiskLevel::Caution
        } else {
            RiskLevel::Safe
        }
    }
}
