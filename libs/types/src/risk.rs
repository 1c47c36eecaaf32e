//! Risk report types
//!
//! A [`RiskReport`] is the book's net position on one race: for every
//! runner, the profit (negative) or loss (positive) the book takes if that
//! runner wins.

use crate::ids::{HorseId, RaceId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-runner liability for a single race
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    pub race_id: RaceId,
    /// Runner → net exposure if that runner wins. Positive is a payout owed
    /// by the book.
    pub exposures: BTreeMap<HorseId, Decimal>,
    /// Number of bets that contributed
    pub bet_count: usize,
    /// Recalculation cycle that produced this report
    pub cycle: u64,
    /// Race version the liabilities were computed against
    pub race_version: u32,
    pub computed_at: DateTime<Utc>,
    /// Set when a later cycle failed to recompute this race
    pub stale: bool,
}

impl RiskReport {
    pub fn new(
        race_id: RaceId,
        exposures: BTreeMap<HorseId, Decimal>,
        bet_count: usize,
        cycle: u64,
        race_version: u32,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            race_id,
            exposures,
            bet_count,
            cycle,
            race_version,
            computed_at,
            stale: false,
        }
    }

    /// Exposure if `horse` wins; zero for unknown runners
    pub fn exposure_for(&self, horse: HorseId) -> Decimal {
        self.exposures.get(&horse).copied().unwrap_or(Decimal::ZERO)
    }

    /// Runner whose win costs the book the most
    pub fn worst_case(&self) -> Option<(HorseId, Decimal)> {
        self.exposures
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(h, e)| (*h, *e))
    }

    /// True when every runner's exposure is zero (or there are no runners)
    pub fn is_flat(&self) -> bool {
        self.exposures.values().all(|e| e.is_zero())
    }

    /// Copy of this report flagged stale
    pub fn into_stale(mut self) -> Self {
        self.stale = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(entries: &[(u64, i64)]) -> RiskReport {
        let exposures = entries
            .iter()
            .map(|(h, e)| (HorseId::new(*h), Decimal::from(*e)))
            .collect();
        RiskReport::new(RaceId::new(1), exposures, 2, 1, 0, Utc::now())
    }

    #[test]
    fn test_exposure_lookup() {
        let report = make_report(&[(1, 5), (2, 0)]);
        assert_eq!(report.exposure_for(HorseId::new(1)), Decimal::from(5));
        assert_eq!(report.exposure_for(HorseId::new(3)), Decimal::ZERO);
    }

    #[test]
    fn test_worst_case_picks_largest_liability() {
        let report = make_report(&[(1, -10), (2, 30), (3, 30)]);
        // Ties resolve to the lower horse id
        assert_eq!(report.worst_case(), Some((HorseId::new(2), Decimal::from(30))));
    }

    #[test]
    fn test_flat_and_stale() {
        let report = make_report(&[(1, 0), (2, 0)]);
        assert!(report.is_flat());
        assert!(!report.stale);
        assert!(report.into_stale().stale);
    }
}
