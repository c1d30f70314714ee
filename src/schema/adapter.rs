//! Adapter for converting pace.observation.v1 records into engine inputs
//!
//! Symptom and activity records become an `ObservationBatch` keyed by effective date;
//! sample records feed an `InMemorySamples` source for physiological calibration.

use crate::error::EngineError;
use crate::schema::record::*;
use crate::sources::InMemorySamples;
use crate::types::{ActivityObservation, ObservationBatch, SymptomObservation};
use tracing::debug;

/// Adapter for converting observation records to engine inputs
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<ObservationRecord>, EngineError> {
        let records: Vec<ObservationRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<ObservationRecord>, EngineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<ObservationRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(EngineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse either format, choosing by the first non-blank character
    pub fn parse(input: &str) -> Result<Vec<ObservationRecord>, EngineError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Convert symptom and activity records into a batch. Sample records are skipped.
    pub fn to_batch(records: &[ObservationRecord]) -> Result<ObservationBatch, EngineError> {
        let mut batch = ObservationBatch::default();

        for (idx, record) in records.iter().enumerate() {
            validated(idx, record)?;
            let date = record.effective_date();

            match &record.payload {
                Payload::Symptom { symptom } => batch.symptoms.push(SymptomObservation {
                    date,
                    severity: symptom.severity,
                    polarity: symptom.polarity,
                    name: symptom.name.clone(),
                }),
                Payload::Activity { activity } => batch.activities.push(ActivityObservation {
                    date,
                    physical_exertion: activity.physical_exertion,
                    cognitive_exertion: activity.cognitive_exertion,
                    emotional_load: activity.emotional_load,
                    duration_minutes: activity.duration_minutes,
                }),
                Payload::Sample { .. } => {}
            }
        }

        debug!(
            symptoms = batch.symptoms.len(),
            activities = batch.activities.len(),
            "records converted to observations"
        );
        Ok(batch)
    }

    /// Collect sample records into a physiological sample source
    pub fn to_samples(records: &[ObservationRecord]) -> Result<InMemorySamples, EngineError> {
        let mut samples = InMemorySamples::new();
        for (idx, record) in records.iter().enumerate() {
            validated(idx, record)?;
            if let Payload::Sample { sample } = &record.payload {
                samples.insert(sample.signal, record.effective_date(), sample.value);
            }
        }
        Ok(samples)
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[ObservationRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index,
                    record_id: record.record_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub record_id: Option<String>,
    pub error: ValidationError,
}

fn validated(idx: usize, record: &ObservationRecord) -> Result<(), EngineError> {
    record
        .validate()
        .map_err(|e| EngineError::ParseError(format!("Invalid record {}: {}", idx, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::SignalKind;
    use crate::sources::PhysiologicalSampleSource;
    use crate::types::Polarity;
    use chrono::NaiveDate;

    const NDJSON: &str = r#"{"schema_version":"pace.observation.v1","recorded_at":"2024-01-15T20:00:00+02:00","record_type":"symptom","payload":{"symptom":{"severity":3,"polarity":"negative","name":"fatigue"}}}

{"schema_version":"pace.observation.v1","recorded_at":"2024-01-16T09:00:00+02:00","backdated_date":"2024-01-14","record_type":"activity","payload":{"activity":{"physical_exertion":4,"cognitive_exertion":2,"emotional_load":2}}}
{"schema_version":"pace.observation.v1","recorded_at":"2024-01-16T07:00:00+02:00","record_type":"sample","payload":{"sample":{"signal":"hrv","value":48.5}}}"#;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = RecordAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 3);
        assert!(RecordAdapter::validate_records(&records).is_empty());
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let input = format!("{}\nnot json", NDJSON.lines().next().unwrap());
        match RecordAdapter::parse_ndjson(&input) {
            Err(EngineError::ParseError(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_detects_array() {
        let records = RecordAdapter::parse_ndjson(NDJSON).unwrap();
        let array = serde_json::to_string(&records).unwrap();
        assert_eq!(RecordAdapter::parse(&array).unwrap(), records);
    }

    #[test]
    fn test_to_batch_uses_effective_dates() {
        let records = RecordAdapter::parse_ndjson(NDJSON).unwrap();
        let batch = RecordAdapter::to_batch(&records).unwrap();

        assert_eq!(batch.symptoms.len(), 1);
        assert_eq!(batch.symptoms[0].date, date(15));
        assert_eq!(batch.symptoms[0].polarity, Polarity::Negative);
        assert_eq!(batch.symptoms[0].name.as_deref(), Some("fatigue"));

        assert_eq!(batch.activities.len(), 1);
        assert_eq!(batch.activities[0].date, date(14));
        assert_eq!(batch.activities[0].duration_minutes, None);
    }

    #[test]
    fn test_to_samples() {
        let records = RecordAdapter::parse_ndjson(NDJSON).unwrap();
        let samples = RecordAdapter::to_samples(&records).unwrap();
        assert_eq!(samples.len(SignalKind::Hrv), 1);

        let found = samples.samples(SignalKind::Hrv, date(16), 7).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 48.5);
    }

    #[test]
    fn test_invalid_record_rejected_in_conversion() {
        let mut records = RecordAdapter::parse_ndjson(NDJSON).unwrap();
        records[1].schema_version = "other".to_string();
        assert!(RecordAdapter::to_batch(&records).is_err());

        let failures = RecordAdapter::validate_records(&records);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
    }
}
