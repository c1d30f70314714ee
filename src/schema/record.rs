//! pace.observation.v1 record definition
//!
//! One record per logged item:
//! - Symptom severity with polarity
//! - Activity with its three exertion dimensions
//! - Physiological sample (HRV, resting heart rate, sleep hours)
//!
//! Records carry the device-local recording timestamp and an optional backdated
//! calendar date. The backdated date wins when present.

use crate::baseline::SignalKind;
use crate::types::{Polarity, Rating};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "pace.observation.v1";

/// Longest activity duration accepted in a record (one day)
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Type of record contained in the observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Symptom,
    Activity,
    Sample,
}

/// Logged symptom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomPayload {
    pub severity: Rating,
    pub polarity: Polarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Logged activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub physical_exertion: Rating,
    pub cognitive_exertion: Rating,
    pub emotional_load: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Physiological reading for baseline calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePayload {
    pub signal: SignalKind,
    pub value: f64,
}

/// Record payload - one of the three record types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Symptom { symptom: SymptomPayload },
    Activity { activity: ActivityPayload },
    Sample { sample: SamplePayload },
}

/// The pace.observation.v1 record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Schema version identifier
    pub schema_version: String,
    /// Unique record identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// When the item was logged, with the device's UTC offset
    pub recorded_at: DateTime<FixedOffset>,
    /// Calendar day the item describes when logged after the fact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdated_date: Option<NaiveDate>,
    pub record_type: RecordType,
    pub payload: Payload,
}

impl ObservationRecord {
    pub fn symptom(recorded_at: DateTime<FixedOffset>, symptom: SymptomPayload) -> Self {
        Self::with_payload(recorded_at, RecordType::Symptom, Payload::Symptom { symptom })
    }

    pub fn activity(recorded_at: DateTime<FixedOffset>, activity: ActivityPayload) -> Self {
        Self::with_payload(recorded_at, RecordType::Activity, Payload::Activity { activity })
    }

    pub fn sample(recorded_at: DateTime<FixedOffset>, sample: SamplePayload) -> Self {
        Self::with_payload(recorded_at, RecordType::Sample, Payload::Sample { sample })
    }

    fn with_payload(
        recorded_at: DateTime<FixedOffset>,
        record_type: RecordType,
        payload: Payload,
    ) -> Self {
        ObservationRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            record_id: Some(uuid::Uuid::new_v4().to_string()),
            recorded_at,
            backdated_date: None,
            record_type,
            payload,
        }
    }

    /// Mark the record as describing an earlier day
    pub fn backdated_to(mut self, date: NaiveDate) -> Self {
        self.backdated_date = Some(date);
        self
    }

    /// Backdated date if present, else the local calendar date of `recorded_at`
    pub fn effective_date(&self) -> NaiveDate {
        self.backdated_date
            .unwrap_or_else(|| self.recorded_at.date_naive())
    }

    /// Validate the record schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        match (&self.record_type, &self.payload) {
            (RecordType::Symptom, Payload::Symptom { .. }) => Ok(()),
            (RecordType::Activity, Payload::Activity { activity }) => {
                match activity.duration_minutes {
                    Some(minutes) if minutes > MAX_DURATION_MINUTES => {
                        Err(ValidationError::DurationOutOfRange(minutes))
                    }
                    _ => Ok(()),
                }
            }
            (RecordType::Sample, Payload::Sample { sample }) => {
                if !sample.signal.is_physiological() {
                    Err(ValidationError::UnsupportedSignal(sample.signal))
                } else if !sample.value.is_finite() || sample.value < 0.0 {
                    Err(ValidationError::InvalidSampleValue(sample.value))
                } else {
                    Ok(())
                }
            }
            _ => Err(ValidationError::PayloadTypeMismatch {
                record_type: format!("{:?}", self.record_type),
                payload_type: self.payload_type_name().to_string(),
            }),
        }
    }

    fn payload_type_name(&self) -> &'static str {
        match &self.payload {
            Payload::Symptom { .. } => "symptom",
            Payload::Activity { .. } => "activity",
            Payload::Sample { .. } => "sample",
        }
    }
}

/// Validation errors for observation records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Payload type mismatch: record_type is {record_type} but payload is {payload_type}")]
    PayloadTypeMismatch {
        record_type: String,
        payload_type: String,
    },

    #[error("Activity duration of {0} minutes exceeds one day")]
    DurationOutOfRange(u32),

    #[error("Samples of {0} are not recorded from devices")]
    UnsupportedSignal(SignalKind),

    #[error("Sample value {0} must be a non-negative finite number")]
    InvalidSampleValue(f64),
}
