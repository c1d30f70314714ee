//! Threshold profile resolution
//!
//! Maps the active load configuration to four risk bands and a decay half-life.
//! Resolution is pure and total: every enumerated combination of capacity,
//! sensitivity and recovery produces a strictly ascending profile inside (0, 100).

use crate::config::{CapacityLevel, LoadConfiguration, RecoveryWindow, SensitivityProfile};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Upper limit of the threshold scale (exclusive)
pub const THRESHOLD_SCALE_MAX: f64 = 100.0;

/// Boundaries separating the four risk bands.
///
/// Each boundary is the inclusive lower bound of the next band:
/// `[0, safe)` safe, `[safe, caution)` caution, `[caution, high)` high, `[high, ..)` critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdProfile")]
pub struct ThresholdProfile {
    safe_boundary: f64,
    caution_boundary: f64,
    high_boundary: f64,
}

#[derive(Deserialize)]
struct RawThresholdProfile {
    safe_boundary: f64,
    caution_boundary: f64,
    high_boundary: f64,
}

impl TryFrom<RawThresholdProfile> for ThresholdProfile {
    type Error = EngineError;

    fn try_from(raw: RawThresholdProfile) -> Result<Self, Self::Error> {
        ThresholdProfile::new(raw.safe_boundary, raw.caution_boundary, raw.high_boundary)
    }
}

impl ThresholdProfile {
    /// Create a profile, rejecting boundaries that are not strictly ascending in (0, 100).
    ///
    /// Boundaries are never reordered or clamped: a silently repaired profile could
    /// invert the meaning of the risk bands.
    pub fn new(safe: f64, caution: f64, high: f64) -> Result<Self, EngineError> {
        if ![safe, caution, high].iter().all(|b| b.is_finite()) {
            return Err(EngineError::InvalidThresholds(
                "boundaries must be finite numbers".to_string(),
            ));
        }
        if !(0.0 < safe && safe < caution && caution < high && high < THRESHOLD_SCALE_MAX) {
            return Err(EngineError::InvalidThresholds(format!(
                "expected 0 < safe < caution < high < {}, got {} / {} / {}",
                THRESHOLD_SCALE_MAX, safe, caution, high
            )));
        }
        Ok(Self {
            safe_boundary: safe,
            caution_boundary: caution,
            high_boundary: high,
        })
    }

    pub fn safe_boundary(&self) -> f64 {
        self.safe_boundary
    }

    pub fn caution_boundary(&self) -> f64 {
        self.caution_boundary
    }

    pub fn high_boundary(&self) -> f64 {
        self.high_boundary
    }

    /// Boundaries in ascending order
    pub fn boundaries(&self) -> [f64; 3] {
        [self.safe_boundary, self.caution_boundary, self.high_boundary]
    }
}

/// Output of threshold resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedThresholds {
    pub profile: ThresholdProfile,
    /// Days for decayed load to halve without new input
    pub half_life_days: f64,
}

/// Base boundaries (safe, caution, high) for each capacity level
fn capacity_boundaries(capacity: CapacityLevel) -> (f64, f64, f64) {
    match capacity {
        CapacityLevel::Low => (20.0, 40.0, 60.0),
        CapacityLevel::Medium => (30.0, 55.0, 80.0),
        CapacityLevel::High => (40.0, 65.0, 88.0),
    }
}

/// Sensitive users reach their limits at lower loads
fn sensitivity_multiplier(sensitivity: SensitivityProfile) -> f64 {
    match sensitivity {
        SensitivityProfile::Low => 1.10,
        SensitivityProfile::Medium => 1.00,
        SensitivityProfile::High => 0.85,
    }
}

/// Half-life in days for each recovery window
pub fn half_life_days(recovery: RecoveryWindow) -> f64 {
    match recovery {
        RecoveryWindow::Fast => 2.0,
        RecoveryWindow::Medium => 3.0,
        RecoveryWindow::Slow => 5.0,
    }
}

/// Resolver from configuration to concrete thresholds
pub struct ThresholdResolver;

impl ThresholdResolver {
    /// Resolve the threshold profile and half-life for a configuration.
    ///
    /// A custom configuration carrying explicit thresholds uses them as-is; they were
    /// validated when the configuration was constructed.
    pub fn resolve(configuration: &LoadConfiguration) -> ResolvedThresholds {
        let params = configuration.parameters();
        let profile = match configuration.threshold_override() {
            Some(profile) => profile,
            None => Self::profile_for(params.capacity, params.sensitivity),
        };

        ResolvedThresholds {
            profile,
            half_life_days: half_life_days(params.recovery),
        }
    }

    /// Profile derived from capacity and sensitivity alone
    pub fn profile_for(capacity: CapacityLevel, sensitivity: SensitivityProfile) -> ThresholdProfile {
        let (safe, caution, high) = capacity_boundaries(capacity);
        let m = sensitivity_multiplier(sensitivity);

        // Scaling by a positive multiplier preserves ordering, and the table keeps
        // high * 1.10 below 100, so construction cannot fail.
        ThresholdProfile {
            safe_boundary: safe * m,
            caution_boundary: caution * m,
            high_boundary: high * m,
        }
    }
}
