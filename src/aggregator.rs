//! Daily contribution aggregation
//!
//! This module turns one calendar day's observations into a single raw load value:
//! - Negative symptoms weighted by sensitivity
//! - Positive symptoms contribute nothing
//! - Activities weighted by exertion dimension and scaled by duration, with a ceiling

use crate::config::SensitivityProfile;
use crate::types::{ActivityObservation, ObservationBatch, Polarity, SymptomObservation};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Weight of the physical exertion dimension
pub const PHYSICAL_WEIGHT: f64 = 1.0;
/// Weight of the cognitive exertion dimension
pub const COGNITIVE_WEIGHT: f64 = 0.8;
/// Weight of the emotional load dimension
pub const EMOTIONAL_WEIGHT: f64 = 0.6;

/// Multiplier turning a weighted exertion mean (1-5) into load units
pub const ACTIVITY_SCALE: f64 = 2.0;

/// Activity length that counts as one standard unit of exertion
pub const REFERENCE_DURATION_MINUTES: f64 = 60.0;
/// Duration factor bounds
pub const MIN_DURATION_FACTOR: f64 = 0.25;
pub const MAX_DURATION_FACTOR: f64 = 2.0;

/// No single activity contributes more than one maximum-severity symptom at medium
/// sensitivity (5 x 2.0).
pub const MAX_ACTIVITY_CONTRIBUTION: f64 = 10.0;

/// Load per unit of negative symptom severity
pub fn symptom_weight(sensitivity: SensitivityProfile) -> f64 {
    match sensitivity {
        SensitivityProfile::Low => 1.5,
        SensitivityProfile::Medium => 2.0,
        SensitivityProfile::High => 2.5,
    }
}

/// Per-day breakdown of a raw contribution
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyContribution {
    pub symptom_load: f64,
    pub activity_load: f64,
}

impl DailyContribution {
    /// Total raw contribution, never negative
    pub fn total(&self) -> f64 {
        (self.symptom_load + self.activity_load).max(0.0)
    }
}

/// Aggregator for a single sensitivity profile
#[derive(Debug, Clone, Copy)]
pub struct ContributionAggregator {
    sensitivity: SensitivityProfile,
}

impl ContributionAggregator {
    pub fn new(sensitivity: SensitivityProfile) -> Self {
        Self { sensitivity }
    }

    /// Aggregate one day's observations. The caller passes only that day's entries.
    pub fn aggregate_day(
        &self,
        symptoms: &[&SymptomObservation],
        activities: &[&ActivityObservation],
    ) -> DailyContribution {
        let symptom_load = symptoms
            .iter()
            .map(|s| self.symptom_contribution(s))
            .sum();
        let activity_load = activities.iter().map(|a| activity_contribution(a)).sum();

        DailyContribution {
            symptom_load,
            activity_load,
        }
    }

    /// Group a batch by effective date and aggregate each day present.
    ///
    /// Days without observations are absent from the map; `decay::fill_calendar`
    /// turns them into explicit zero days.
    pub fn aggregate_batch(&self, batch: &ObservationBatch) -> BTreeMap<NaiveDate, f64> {
        let mut symptoms_by_day: BTreeMap<NaiveDate, Vec<&SymptomObservation>> = BTreeMap::new();
        for symptom in &batch.symptoms {
            symptoms_by_day.entry(symptom.date).or_default().push(symptom);
        }

        let mut activities_by_day: BTreeMap<NaiveDate, Vec<&ActivityObservation>> =
            BTreeMap::new();
        for activity in &batch.activities {
            activities_by_day
                .entry(activity.date)
                .or_default()
                .push(activity);
        }

        let mut days: Vec<NaiveDate> = symptoms_by_day
            .keys()
            .chain(activities_by_day.keys())
            .copied()
            .collect();
        days.sort();
        days.dedup();

        days.into_iter()
            .map(|day| {
                let symptoms = symptoms_by_day.get(&day).map(Vec::as_slice).unwrap_or(&[]);
                let activities = activities_by_day
                    .get(&day)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                (day, self.aggregate_day(symptoms, activities).total())
            })
            .collect()
    }

    fn symptom_contribution(&self, symptom: &SymptomObservation) -> f64 {
        match symptom.polarity {
            Polarity::Negative => symptom.severity.as_f64() * symptom_weight(self.sensitivity),
            // Wellbeing symptoms never add load
            Polarity::Positive => 0.0,
        }
    }
}

/// Weighted exertion scaled by duration, capped at `MAX_ACTIVITY_CONTRIBUTION`
pub fn activity_contribution(activity: &ActivityObservation) -> f64 {
    let weighted = PHYSICAL_WEIGHT * activity.physical_exertion.as_f64()
        + COGNITIVE_WEIGHT * activity.cognitive_exertion.as_f64()
        + EMOTIONAL_WEIGHT * activity.emotional_load.as_f64();
    let exertion_mean = weighted / (PHYSICAL_WEIGHT + COGNITIVE_WEIGHT + EMOTIONAL_WEIGHT);

    (exertion_mean * ACTIVITY_SCALE * duration_factor(activity.duration_minutes))
        .min(MAX_ACTIVITY_CONTRIBUTION)
}

/// Duration relative to the reference length, bounded both ways
pub fn duration_factor(duration_minutes: Option<u32>) -> f64 {
    match duration_minutes {
        Some(minutes) => (minutes as f64 / REFERENCE_DURATION_MINUTES)
            .clamp(MIN_DURATION_FACTOR, MAX_DURATION_FACTOR),
        None => 1.0,
    }
}
