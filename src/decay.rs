//! Decay chain calculation
//!
//! Decayed load follows a first-order exponential recurrence over consecutive
//! calendar days:
//!
//! ```text
//! decayed[0] = raw[0] + seed * f
//! decayed[i] = raw[i] + decayed[i - 1] * f,   f = 0.5^(1 / half_life_days)
//! ```
//!
//! Without new input, load halves every `half_life_days`. Because each day builds on
//! the previous one, the series must be gap-free: a skipped day would skip a decay step.

use crate::error::EngineError;
use crate::types::DateRange;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-day decay factor for a half-life in days
pub fn decay_factor(half_life_days: f64) -> Result<f64, EngineError> {
    if !(half_life_days.is_finite() && half_life_days > 0.0) {
        return Err(EngineError::InvalidHalfLife(half_life_days));
    }
    Ok(0.5_f64.powf(1.0 / half_life_days))
}

/// Lookback length after which anything older weighs at most `tolerance`.
///
/// Solves `0.5^(days / half_life) <= tolerance`, i.e. `days = half_life * log2(1 / tolerance)`.
pub fn required_lookback_days(half_life_days: f64, tolerance: f64) -> u32 {
    if !(half_life_days > 0.0) || !(tolerance > 0.0 && tolerance < 1.0) {
        return 0;
    }
    (half_life_days * (1.0 / tolerance).log2()).ceil() as u32
}

/// Expand a sparse date map into a gap-free series covering `range`.
///
/// Days without an entry become explicit zero contributions; entries outside the
/// range are ignored.
pub fn fill_calendar(range: DateRange, sparse: &BTreeMap<NaiveDate, f64>) -> Vec<(NaiveDate, f64)> {
    range
        .days()
        .map(|day| (day, sparse.get(&day).copied().unwrap_or(0.0)))
        .collect()
}

/// Exponential decay over a gap-free daily series
#[derive(Debug, Clone, Copy)]
pub struct DecayChain {
    half_life_days: f64,
    factor: f64,
}

impl DecayChain {
    pub fn new(half_life_days: f64) -> Result<Self, EngineError> {
        Ok(Self {
            half_life_days,
            factor: decay_factor(half_life_days)?,
        })
    }

    pub fn half_life_days(&self) -> f64 {
        self.half_life_days
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Decayed load for each day, seeded from the oldest day
    pub fn compute(&self, series: &[(NaiveDate, f64)]) -> Result<Vec<f64>, EngineError> {
        self.compute_seeded(0.0, series)
    }

    /// Decayed load continuing from the load of the day before `series[0]`.
    ///
    /// Rejects unordered or gapped dates and negative or non-finite contributions.
    pub fn compute_seeded(
        &self,
        seed: f64,
        series: &[(NaiveDate, f64)],
    ) -> Result<Vec<f64>, EngineError> {
        validate_series(series)?;

        let mut decayed = Vec::with_capacity(series.len());
        let mut previous = seed.max(0.0);
        for (_, raw) in series {
            let load = raw + previous * self.factor;
            decayed.push(load);
            previous = load;
        }

        Ok(decayed)
    }

    /// Load remaining after `days` without input
    pub fn decay_for(&self, load: f64, days: u32) -> f64 {
        load * self.factor.powi(i32::try_from(days).unwrap_or(i32::MAX))
    }

    /// Steady-state load under a constant daily contribution
    pub fn asymptote(&self, daily_contribution: f64) -> f64 {
        daily_contribution / (1.0 - self.factor)
    }
}

fn validate_series(series: &[(NaiveDate, f64)]) -> Result<(), EngineError> {
    for (i, (date, raw)) in series.iter().enumerate() {
        if !raw.is_finite() || *raw < 0.0 {
            return Err(EngineError::InvalidContribution {
                date: *date,
                value: *raw,
            });
        }
        if i > 0 && series[i - 1].0.succ_opt() != Some(*date) {
            return Err(EngineError::NonContiguousDays(*date));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start() + chrono::Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_single_pulse_scenario() {
        let chain = DecayChain::new(3.0).unwrap();
        let decayed = chain
            .compute(&series(&[10.0, 0.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        let expected = [10.0, 7.94, 6.30, 5.0, 3.97, 3.15];
        assert_eq!(decayed.len(), expected.len());
        for (got, want) in decayed.iter().zip(expected) {
            assert!((got - want).abs() < 0.01, "got {}, want {}", got, want);
        }
    }

    #[test]
    fn test_halves_after_half_life() {
        for half_life in [2.0, 3.0, 5.0] {
            let chain = DecayChain::new(half_life).unwrap();
            let days = half_life as usize;
            let mut values = vec![0.0; days + 1];
            values[0] = 42.0;
            let decayed = chain.compute(&series(&values)).unwrap();
            assert!((decayed[days] - 21.0).abs() < 1e-9);
            assert!((chain.decay_for(42.0, days as u32) - 21.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_long_gap_decays_to_zero() {
        let chain = DecayChain::new(3.0).unwrap();
        for days in [i32::MAX as u32, i32::MAX as u32 + 1, u32::MAX] {
            let remaining = chain.decay_for(10.0, days);
            assert!(remaining >= 0.0 && remaining < 1e-9, "{days}: {remaining}");
        }
        assert!(chain.decay_for(10.0, 1000) <= chain.decay_for(10.0, 999));
    }

    #[test]
    fn test_seeded_continuation_matches_full_chain() {
        let chain = DecayChain::new(3.0).unwrap();
        let full = series(&[5.0, 3.0, 0.0, 8.0, 1.0]);
        let all = chain.compute(&full).unwrap();

        let head = chain.compute(&full[..2]).unwrap();
        let tail = chain.compute_seeded(head[1], &full[2..]).unwrap();
        for (a, b) in all[2..].iter().zip(&tail) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gap_rejected() {
        let chain = DecayChain::new(3.0).unwrap();
        let mut gapped = series(&[1.0, 2.0]);
        gapped[1].0 = start() + chrono::Duration::days(2);
        assert!(matches!(
            chain.compute(&gapped),
            Err(EngineError::NonContiguousDays(_))
        ));
    }

    #[test]
    fn test_invalid_contribution_rejected() {
        let chain = DecayChain::new(3.0).unwrap();
        assert!(chain.compute(&series(&[1.0, -0.5])).is_err());
        assert!(chain.compute(&series(&[f64::NAN])).is_err());
    }

    #[test]
    fn test_invalid_half_life() {
        assert!(DecayChain::new(0.0).is_err());
        assert!(DecayChain::new(-1.0).is_err());
        assert!(DecayChain::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_fill_calendar() {
        let range = DateRange::new(start(), start() + chrono::Duration::days(4)).unwrap();
        let mut sparse = BTreeMap::new();
        sparse.insert(start() + chrono::Duration::days(1), 3.0);
        sparse.insert(start() + chrono::Duration::days(10), 9.0);

        let filled = fill_calendar(range, &sparse);
        let values: Vec<f64> = filled.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0.0, 3.0, 0.0, 0.0, 0.0]);
        assert!(DecayChain::new(2.0).unwrap().compute(&filled).is_ok());
    }

    #[test]
    fn test_required_lookback() {
        // 0.5^(30/3) ~= 0.00098
        assert_eq!(required_lookback_days(3.0, 0.001), 30);
        assert_eq!(required_lookback_days(5.0, 0.001), 50);
        assert_eq!(required_lookback_days(0.0, 0.001), 0);
    }

    #[test]
    fn test_asymptote() {
        let chain = DecayChain::new(3.0).unwrap();
        let decayed = chain.compute(&series(&[4.0; 200])).unwrap();
        assert!((decayed[199] - chain.asymptote(4.0)).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_decayed_non_negative(
            values in prop::collection::vec(0.0f64..50.0, 1..120),
            half_life in 0.5f64..10.0,
        ) {
            let chain = DecayChain::new(half_life).unwrap();
            let decayed = chain.compute(&series(&values)).unwrap();
            prop_assert_eq!(decayed.len(), values.len());
            for (d, raw) in decayed.iter().zip(&values) {
                prop_assert!(*d >= 0.0);
                prop_assert!(*d >= *raw);
            }
        }

        #[test]
        fn prop_idempotent(values in prop::collection::vec(0.0f64..50.0, 1..60)) {
            let chain = DecayChain::new(3.0).unwrap();
            let s = series(&values);
            prop_assert_eq!(chain.compute(&s).unwrap(), chain.compute(&s).unwrap());
        }
    }
}
