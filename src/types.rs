//! Core types for the Synheart Pace engine
//!
//! This module defines the observations that feed the engine and the daily scores
//! it produces. Observations are read-only snapshots owned by the host app's store.

use crate::error::EngineError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest history window, in days, the engine will extend a range by
pub const LOOKBACK_LIMIT_DAYS: u32 = 366;

/// Lowest value on the 1-5 rating scale
pub const RATING_MIN: u8 = 1;

/// Highest value on the 1-5 rating scale
pub const RATING_MAX: u8 = 5;

/// A 1-5 rating used for symptom severity and exertion dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Create a rating, rejecting values outside 1-5
    pub fn new(value: u8) -> Result<Self, EngineError> {
        if (RATING_MIN..=RATING_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(EngineError::InvalidObservation(format!(
                "rating {} is outside {}-{}",
                value, RATING_MIN, RATING_MAX
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl TryFrom<u8> for Rating {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Whether a symptom represents strain or wellbeing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Negative,
    Positive,
}

/// A logged symptom severity for a calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomObservation {
    /// Effective calendar date (device-local)
    pub date: NaiveDate,
    /// Severity, 1 (mild) to 5 (severe)
    pub severity: Rating,
    /// Negative symptoms add load, positive ones describe wellbeing
    pub polarity: Polarity,
    /// Optional display label (e.g., "headache")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SymptomObservation {
    pub fn negative(date: NaiveDate, severity: Rating) -> Self {
        Self {
            date,
            severity,
            polarity: Polarity::Negative,
            name: None,
        }
    }

    pub fn positive(date: NaiveDate, severity: Rating) -> Self {
        Self {
            date,
            severity,
            polarity: Polarity::Positive,
            name: None,
        }
    }
}

/// A logged activity with its three exertion dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityObservation {
    /// Effective calendar date (device-local)
    pub date: NaiveDate,
    pub physical_exertion: Rating,
    pub cognitive_exertion: Rating,
    pub emotional_load: Rating,
    /// Duration in minutes, if the user recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// All observations for a date range, as supplied by an observation source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationBatch {
    #[serde(default)]
    pub symptoms: Vec<SymptomObservation>,
    #[serde(default)]
    pub activities: Vec<ActivityObservation>,
}

impl ObservationBatch {
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.activities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symptoms.len() + self.activities.len()
    }

    /// Keep only observations whose date falls inside the range
    pub fn within(&self, range: DateRange) -> ObservationBatch {
        ObservationBatch {
            symptoms: self
                .symptoms
                .iter()
                .filter(|s| range.contains(s.date))
                .cloned()
                .collect(),
            activities: self
                .activities
                .iter()
                .filter(|a| range.contains(a.date))
                .cloned()
                .collect(),
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = EngineError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EngineError> {
        if start > end {
            return Err(EngineError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days in the range, both ends included
    pub fn num_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Extend the range backwards by `days`, at most `LOOKBACK_LIMIT_DAYS`
    pub fn with_lookback(&self, days: u32) -> Result<DateRange, EngineError> {
        if days > LOOKBACK_LIMIT_DAYS {
            return Err(EngineError::InvalidLookback(days));
        }
        let start = self
            .start
            .checked_sub_signed(chrono::Duration::days(i64::from(days)))
            .ok_or(EngineError::InvalidLookback(days))?;
        Ok(DateRange {
            start,
            end: self.end,
        })
    }

    /// Iterate over every day in the range in ascending order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Risk band for a decayed load, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Caution,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Safe,
        RiskLevel::Caution,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Caution => "caution",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Short user-facing label
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "Within capacity",
            RiskLevel::Caution => "Approaching limit",
            RiskLevel::High => "Over capacity",
            RiskLevel::Critical => "Crash risk",
        }
    }

    /// Pacing guidance shown next to the label
    pub fn guidance(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "Load is within your usual range.",
            RiskLevel::Caution => "Consider spacing out demanding activities and planning rest.",
            RiskLevel::High => "Reduce exertion today and prioritise recovery.",
            RiskLevel::Critical => "Rest is strongly advised; load is well above your capacity.",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computed load for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyLoadScore {
    pub date: NaiveDate,
    /// Unsmoothed load from this day's observations
    pub raw_contribution: f64,
    /// Recency-weighted load including decayed history
    pub decayed_load: f64,
    pub risk_level: RiskLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(3).unwrap().value(), 3);
    }

    #[test]
    fn test_rating_rejected_on_deserialize() {
        let json = r#"{"date":"2024-03-01","severity":7,"polarity":"negative"}"#;
        assert!(serde_json::from_str::<SymptomObservation>(json).is_err());

        let json = r#"{"date":"2024-03-01","severity":4,"polarity":"negative"}"#;
        let symptom: SymptomObservation = serde_json::from_str(json).unwrap();
        assert_eq!(symptom.severity.value(), 4);
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::new(date(2024, 2, 27), date(2024, 3, 2)).unwrap();
        // 2024 is a leap year
        assert_eq!(range.num_days(), 5);
        assert_eq!(range.days().count(), 5);
        assert!(range.contains(date(2024, 2, 29)));
        assert!(!range.contains(date(2024, 3, 3)));

        let extended = range.with_lookback(10).unwrap();
        assert_eq!(extended.start, date(2024, 2, 17));
        assert_eq!(extended.end, range.end);

        assert!(DateRange::new(date(2024, 3, 2), date(2024, 3, 1)).is_err());
    }

    #[test]
    fn test_lookback_beyond_limit_rejected() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 5)).unwrap();
        assert!(range.with_lookback(LOOKBACK_LIMIT_DAYS).is_ok());
        assert!(matches!(
            range.with_lookback(LOOKBACK_LIMIT_DAYS + 1),
            Err(EngineError::InvalidLookback(_))
        ));
        assert!(matches!(
            range.with_lookback(u32::MAX),
            Err(EngineError::InvalidLookback(u32::MAX))
        ));

        // Near chrono's lower bound the subtraction itself fails
        let earliest = DateRange::new(NaiveDate::MIN, NaiveDate::MIN).unwrap();
        assert!(earliest.with_lookback(1).is_err());
        assert!(earliest.with_lookback(0).is_ok());
    }

    #[test]
    fn test_inverted_range_rejected_on_deserialize() {
        let json = r#"{"start":"2024-03-05","end":"2024-03-01"}"#;
        assert!(serde_json::from_str::<DateRange>(json).is_err());

        let json = r#"{"start":"2024-03-01","end":"2024-03-05"}"#;
        let range: DateRange = serde_json::from_str(json).unwrap();
        assert_eq!(range.num_days(), 5);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Safe < RiskLevel::Caution);
        assert!(RiskLevel::Caution < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
    }

    #[test]
    fn test_batch_within() {
        let r = Rating::new(3).unwrap();
        let batch = ObservationBatch {
            symptoms: vec![
                SymptomObservation::negative(date(2024, 1, 1), r),
                SymptomObservation::negative(date(2024, 1, 10), r),
            ],
            activities: vec![],
        };
        let range = DateRange::new(date(2024, 1, 5), date(2024, 1, 15)).unwrap();
        assert_eq!(batch.within(range).len(), 1);
    }
}
