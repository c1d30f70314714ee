//! Load configuration and engine settings
//!
//! A configuration is either a named condition preset or a custom parameter set.
//! Modelling it as a tagged union means the active parameters are always a pure
//! projection and "preset or custom" can never drift out of sync with the values.

use crate::baseline::CalibrationPolicy;
use crate::error::{ConfigError, EngineError};
use crate::thresholds::ThresholdProfile;
use crate::types::LOOKBACK_LIMIT_DAYS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How much load the user can sustain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CapacityLevel {
    pub const ALL: [CapacityLevel; 3] = [Self::Low, Self::Medium, Self::High];
}

/// How strongly symptoms register as load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityProfile {
    Low,
    #[default]
    Medium,
    High,
}

impl SensitivityProfile {
    pub const ALL: [SensitivityProfile; 3] = [Self::Low, Self::Medium, Self::High];
}

/// How quickly accumulated load fades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryWindow {
    Fast,
    #[default]
    Medium,
    Slow,
}

impl RecoveryWindow {
    pub const ALL: [RecoveryWindow; 3] = [Self::Fast, Self::Medium, Self::Slow];
}

/// The three user-facing load parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LoadParameters {
    pub capacity: CapacityLevel,
    pub sensitivity: SensitivityProfile,
    pub recovery: RecoveryWindow,
}

/// Named parameter bundles offered as shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionPreset {
    #[default]
    Balanced,
    MeCfs,
    LongCovid,
    Fibromyalgia,
    Pots,
}

impl ConditionPreset {
    pub const ALL: [ConditionPreset; 5] = [
        Self::Balanced,
        Self::MeCfs,
        Self::LongCovid,
        Self::Fibromyalgia,
        Self::Pots,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionPreset::Balanced => "balanced",
            ConditionPreset::MeCfs => "me_cfs",
            ConditionPreset::LongCovid => "long_covid",
            ConditionPreset::Fibromyalgia => "fibromyalgia",
            ConditionPreset::Pots => "pots",
        }
    }

    /// Display name for settings screens
    pub fn display_name(&self) -> &'static str {
        match self {
            ConditionPreset::Balanced => "Balanced",
            ConditionPreset::MeCfs => "ME/CFS",
            ConditionPreset::LongCovid => "Long COVID",
            ConditionPreset::Fibromyalgia => "Fibromyalgia",
            ConditionPreset::Pots => "POTS",
        }
    }

    /// Parameters this preset stands for
    pub fn parameters(&self) -> LoadParameters {
        use CapacityLevel as C;
        use RecoveryWindow as R;
        use SensitivityProfile as S;

        let (capacity, sensitivity, recovery) = match self {
            ConditionPreset::Balanced => (C::Medium, S::Medium, R::Medium),
            ConditionPreset::MeCfs => (C::Low, S::High, R::Slow),
            ConditionPreset::LongCovid => (C::Low, S::High, R::Medium),
            ConditionPreset::Fibromyalgia => (C::Medium, S::High, R::Slow),
            ConditionPreset::Pots => (C::Medium, S::Medium, R::Fast),
        };

        LoadParameters {
            capacity,
            sensitivity,
            recovery,
        }
    }
}

/// Manually chosen parameters, optionally with explicit thresholds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomParameters {
    pub parameters: LoadParameters,
    /// Explicit boundaries replacing the ones derived from capacity and sensitivity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdProfile>,
}

/// The single active load configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LoadConfiguration {
    Preset { preset: ConditionPreset },
    Custom(CustomParameters),
}

impl Default for LoadConfiguration {
    fn default() -> Self {
        LoadConfiguration::Preset {
            preset: ConditionPreset::default(),
        }
    }
}

/// Outcome of changing a single parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ParameterUpdate {
    /// The configuration was already custom and now holds the new value
    Applied,
    /// A named preset was active; the configuration is now custom
    ReclassifiedToCustom { previous_preset: ConditionPreset },
}

impl LoadConfiguration {
    pub fn custom(parameters: LoadParameters) -> Self {
        LoadConfiguration::Custom(CustomParameters {
            parameters,
            thresholds: None,
        })
    }

    /// Custom configuration with explicit boundaries, rejected if they are not ascending
    pub fn custom_with_thresholds(
        parameters: LoadParameters,
        safe: f64,
        caution: f64,
        high: f64,
    ) -> Result<Self, EngineError> {
        let thresholds = ThresholdProfile::new(safe, caution, high)?;
        Ok(LoadConfiguration::Custom(CustomParameters {
            parameters,
            thresholds: Some(thresholds),
        }))
    }

    /// Currently active parameters
    pub fn parameters(&self) -> LoadParameters {
        match self {
            LoadConfiguration::Preset { preset } => preset.parameters(),
            LoadConfiguration::Custom(custom) => custom.parameters,
        }
    }

    /// The active preset, or `None` when custom
    pub fn preset(&self) -> Option<ConditionPreset> {
        match self {
            LoadConfiguration::Preset { preset } => Some(*preset),
            LoadConfiguration::Custom(_) => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, LoadConfiguration::Custom(_))
    }

    pub fn threshold_override(&self) -> Option<ThresholdProfile> {
        match self {
            LoadConfiguration::Preset { .. } => None,
            LoadConfiguration::Custom(custom) => custom.thresholds,
        }
    }

    /// Switch to a named preset, discarding any custom values
    pub fn select_preset(&mut self, preset: ConditionPreset) {
        *self = LoadConfiguration::Preset { preset };
    }

    pub fn set_capacity(&mut self, capacity: CapacityLevel) -> ParameterUpdate {
        self.update_parameters(|p| p.capacity = capacity)
    }

    pub fn set_sensitivity(&mut self, sensitivity: SensitivityProfile) -> ParameterUpdate {
        self.update_parameters(|p| p.sensitivity = sensitivity)
    }

    pub fn set_recovery(&mut self, recovery: RecoveryWindow) -> ParameterUpdate {
        self.update_parameters(|p| p.recovery = recovery)
    }

    /// Set explicit thresholds. Always leaves the configuration custom.
    pub fn set_thresholds(&mut self, thresholds: ThresholdProfile) -> ParameterUpdate {
        let outcome = self.ensure_custom();
        if let LoadConfiguration::Custom(custom) = self {
            custom.thresholds = Some(thresholds);
        }
        outcome
    }

    // Manual edits are one-way: a preset never comes back even if the values match one.
    fn update_parameters(&mut self, edit: impl FnOnce(&mut LoadParameters)) -> ParameterUpdate {
        let outcome = self.ensure_custom();
        if let LoadConfiguration::Custom(custom) = self {
            edit(&mut custom.parameters);
        }
        outcome
    }

    fn ensure_custom(&mut self) -> ParameterUpdate {
        match *self {
            LoadConfiguration::Preset { preset } => {
                *self = LoadConfiguration::custom(preset.parameters());
                ParameterUpdate::ReclassifiedToCustom {
                    previous_preset: preset,
                }
            }
            LoadConfiguration::Custom(_) => ParameterUpdate::Applied,
        }
    }
}

/// Default lower bound on the lookback margin in days
pub const DEFAULT_MIN_LOOKBACK_DAYS: u32 = 60;

/// Default upper bound on the lookback margin in days
pub const DEFAULT_MAX_LOOKBACK_DAYS: u32 = 90;

/// Residual share of pre-lookback history considered negligible
pub const DEFAULT_LOOKBACK_TOLERANCE: f64 = 0.001;

/// Tunables for the engine that are not part of the user's load configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub min_lookback_days: u32,
    pub max_lookback_days: u32,
    pub lookback_tolerance: f64,
    /// Override for the load calibration policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_calibration: Option<CalibrationPolicy>,
    /// Override applied to every physiological signal kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physiological_calibration: Option<CalibrationPolicy>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_lookback_days: DEFAULT_MIN_LOOKBACK_DAYS,
            max_lookback_days: DEFAULT_MAX_LOOKBACK_DAYS,
            lookback_tolerance: DEFAULT_LOOKBACK_TOLERANCE,
            load_calibration: None,
            physiological_calibration: None,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_lookback_days > self.max_lookback_days {
            return Err(ConfigError::Validation(format!(
                "min_lookback_days ({}) exceeds max_lookback_days ({})",
                self.min_lookback_days, self.max_lookback_days
            )));
        }
        if self.max_lookback_days > LOOKBACK_LIMIT_DAYS {
            return Err(ConfigError::Validation(format!(
                "max_lookback_days must not exceed {}",
                LOOKBACK_LIMIT_DAYS
            )));
        }
        if !(self.lookback_tolerance > 0.0 && self.lookback_tolerance < 1.0) {
            return Err(ConfigError::Validation(format!(
                "lookback_tolerance must be in (0, 1), got {}",
                self.lookback_tolerance
            )));
        }
        for policy in [&self.load_calibration, &self.physiological_calibration]
            .into_iter()
            .flatten()
        {
            policy.validate()?;
        }
        Ok(())
    }
}

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaceConfig {
    #[serde(default)]
    pub configuration: LoadConfiguration,
    #[serde(default)]
    pub settings: EngineSettings,
}

impl PaceConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PaceConfig = toml::from_str(content)?;
        config.settings.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_balanced_preset() {
        let config = LoadConfiguration::default();
        assert_eq!(config.preset(), Some(ConditionPreset::Balanced));
        assert_eq!(config.parameters(), LoadParameters::default());
    }

    #[test]
    fn test_manual_change_reclassifies_preset() {
        let mut config = LoadConfiguration::Preset {
            preset: ConditionPreset::MeCfs,
        };
        let outcome = config.set_recovery(RecoveryWindow::Fast);
        assert_eq!(
            outcome,
            ParameterUpdate::ReclassifiedToCustom {
                previous_preset: ConditionPreset::MeCfs
            }
        );
        assert!(config.is_custom());
        // Untouched parameters carry over from the preset
        assert_eq!(
            config.parameters(),
            LoadParameters {
                capacity: CapacityLevel::Low,
                sensitivity: SensitivityProfile::High,
                recovery: RecoveryWindow::Fast,
            }
        );

        // Further edits stay custom
        assert_eq!(config.set_capacity(CapacityLevel::High), ParameterUpdate::Applied);
    }

    #[test]
    fn test_reclassification_is_one_way() {
        let mut config = LoadConfiguration::default();
        // Same value as the preset still switches to custom
        let outcome = config.set_capacity(CapacityLevel::Medium);
        assert!(matches!(outcome, ParameterUpdate::ReclassifiedToCustom { .. }));
        assert!(config.is_custom());
        assert_eq!(config.parameters(), ConditionPreset::Balanced.parameters());
    }

    #[test]
    fn test_select_preset_clears_override() {
        let mut config =
            LoadConfiguration::custom_with_thresholds(LoadParameters::default(), 10.0, 20.0, 30.0)
                .unwrap();
        assert!(config.threshold_override().is_some());
        config.select_preset(ConditionPreset::Pots);
        assert_eq!(config.threshold_override(), None);
        assert_eq!(config.parameters().recovery, RecoveryWindow::Fast);
    }

    #[test]
    fn test_custom_thresholds_rejected_when_not_ascending() {
        let result =
            LoadConfiguration::custom_with_thresholds(LoadParameters::default(), 40.0, 30.0, 50.0);
        assert!(matches!(result, Err(EngineError::InvalidThresholds(_))));
    }

    #[test]
    fn test_toml_preset() {
        let config = PaceConfig::from_toml_str(
            r#"
            [configuration]
            mode = "preset"
            preset = "long_covid"

            [settings]
            max_lookback_days = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.configuration.preset(), Some(ConditionPreset::LongCovid));
        assert_eq!(config.settings.max_lookback_days, 120);
        assert_eq!(config.settings.min_lookback_days, DEFAULT_MIN_LOOKBACK_DAYS);
    }

    #[test]
    fn test_toml_custom_with_bad_thresholds() {
        let result = PaceConfig::from_toml_str(
            r#"
            [configuration]
            mode = "custom"

            [configuration.parameters]
            capacity = "low"
            sensitivity = "high"
            recovery = "slow"

            [configuration.thresholds]
            safe_boundary = 50.0
            caution_boundary = 30.0
            high_boundary = 70.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip_custom() {
        let config = PaceConfig {
            configuration: LoadConfiguration::custom_with_thresholds(
                LoadParameters {
                    capacity: CapacityLevel::High,
                    sensitivity: SensitivityProfile::Low,
                    recovery: RecoveryWindow::Slow,
                },
                25.0,
                50.0,
                75.0,
            )
            .unwrap(),
            settings: EngineSettings::default(),
        };
        let text = config.to_toml_string().unwrap();
        let loaded = PaceConfig::from_toml_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_settings_validation() {
        let settings = EngineSettings {
            min_lookback_days: 100,
            max_lookback_days: 90,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = EngineSettings {
            lookback_tolerance: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        assert!(EngineSettings::default().validate().is_ok());
    }
}
