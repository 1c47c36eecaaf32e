//! Liability aggregation
//!
//! Deterministic per-runner net exposure for one race.
//!
//! For a runner R and a bet b with legs on this race:
//! - b backs R: `+stake × (Π odds − 1)`, the payout beyond the returned stake
//! - otherwise: `−stake`, kept by the book
//!
//! For a single this is `stake × (odds − 1)`. For an accumulator every other
//! leg is assumed to win, giving the worst case for this race in isolation.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;
use types::bet::Bet;
use types::errors::MissingReferenceError;
use types::ids::{BetId, HorseId, RaceId};
use types::race::RaceVersion;

use crate::grouping::BetSet;
use crate::snapshot::RaceSnapshot;

/// Failures that invalidate a whole race for this cycle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("{race_id} has bets but no runners in version {version}")]
    NoRunners { race_id: RaceId, version: u32 },

    #[error("Liability overflow in {race_id} while adding {bet_id}")]
    Overflow { race_id: RaceId, bet_id: BetId },
}

/// Why a single bet could not be priced
#[derive(Debug, Clone, PartialEq)]
enum Unpriced {
    Missing(MissingReferenceError),
    Overflow,
}

/// A bet's effect on one race
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    /// Horse the bet needs to win this race. None when its legs on this
    /// race back different horses, so no single winner pays it.
    pub backed: Option<HorseId>,
    /// Stake lost by the punter if the bet fails
    pub stake: Decimal,
    /// Net payout if the bet wins
    pub payout: Decimal,
}

impl Contribution {
    /// Exposure change if `runner` wins
    pub fn if_wins(&self, runner: HorseId) -> Decimal {
        if self.backed == Some(runner) {
            self.payout
        } else {
            -self.stake
        }
    }
}

/// Net payout on a winning stake: `stake × (combined_odds − 1)`
pub fn winning_payout(stake: Decimal, combined_odds: Decimal) -> Option<Decimal> {
    stake.checked_mul(combined_odds - Decimal::ONE)
}

/// Price one bet against the race being aggregated.
///
/// Odds for legs on this race come from `current`; legs on other races use
/// their snapshot version (only needed for live odds).
fn contribution(
    bet: &Bet,
    race_id: RaceId,
    current: &RaceVersion,
    races: &RaceSnapshot,
) -> Result<Contribution, Unpriced> {
    let mut backed: Option<Option<HorseId>> = None;
    let mut combined = Decimal::ONE;

    for leg in bet.legs() {
        if !races.has_horse(leg.horse_id) {
            return Err(Unpriced::Missing(MissingReferenceError::Horse {
                horse_id: leg.horse_id,
            }));
        }

        let version = if leg.race_id == race_id {
            backed = match backed {
                None => Some(Some(leg.horse_id)),
                Some(Some(h)) if h == leg.horse_id => Some(Some(h)),
                Some(_) => Some(None),
            };
            current
        } else {
            races
                .get(leg.race_id)
                .ok_or(Unpriced::Missing(MissingReferenceError::Race {
                    race_id: leg.race_id,
                }))?
                .as_ref()
        };

        let odds = leg
            .resolve_odds(version)
            .ok_or(Unpriced::Missing(MissingReferenceError::UnpricedRunner {
                bet_id: bet.id,
                race_id: leg.race_id,
                horse_id: leg.horse_id,
            }))?;

        combined = combined
            .checked_mul(odds.as_decimal())
            .ok_or(Unpriced::Overflow)?;
    }

    let stake = bet.stake.as_decimal();
    let payout = winning_payout(stake, combined).ok_or(Unpriced::Overflow)?;

    Ok(Contribution {
        backed: backed.flatten(),
        stake,
        payout,
    })
}

/// Per-runner exposure for one race
#[derive(Debug, Clone, PartialEq)]
pub struct RaceLiability {
    pub race_id: RaceId,
    pub race_version: u32,
    pub exposures: BTreeMap<HorseId, Decimal>,
    /// Bets that contributed
    pub bet_count: usize,
    /// Bets left out because something they reference is missing
    pub excluded: Vec<(BetId, MissingReferenceError)>,
}

/// Aggregate the exposure of `bets` on one race.
///
/// Every runner of the current version gets an entry, so a race with no
/// bets reports all zeros. Bets with missing references are excluded and
/// logged; overflow or a runnerless version with bets fails the race.
pub fn aggregate_race(
    race_id: RaceId,
    current: &RaceVersion,
    bets: &BetSet,
    races: &RaceSnapshot,
) -> Result<RaceLiability, AggregationError> {
    if current.runner_count() == 0 && !bets.is_empty() {
        return Err(AggregationError::NoRunners {
            race_id,
            version: current.version,
        });
    }

    let mut exposures: BTreeMap<HorseId, Decimal> =
        current.runners().map(|h| (h, Decimal::ZERO)).collect();
    let mut excluded = Vec::new();
    let mut bet_count = 0;

    for bet in bets.iter() {
        if bet.legs_on(race_id).next().is_none() {
            continue;
        }

        let c = match contribution(bet, race_id, current, races) {
            Ok(c) => c,
            Err(Unpriced::Missing(reason)) => {
                warn!(
                    race_id = %race_id,
                    bet_id = %bet.id,
                    reason = %reason,
                    "Excluding bet from race liability"
                );
                excluded.push((bet.id, reason));
                continue;
            }
            Err(Unpriced::Overflow) => {
                return Err(AggregationError::Overflow {
                    race_id,
                    bet_id: bet.id,
                });
            }
        };

        for (runner, exposure) in exposures.iter_mut() {
            *exposure = exposure
                .checked_add(c.if_wins(*runner))
                .ok_or(AggregationError::Overflow {
                    race_id,
                    bet_id: bet.id,
                })?;
        }
        bet_count += 1;
    }

    Ok(RaceLiability {
        race_id,
        race_version: current.version,
        exposures,
        bet_count,
        excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, Utc};
    use proptest::prelude::*;
    use std::sync::Arc;
    use types::bet::OddsType;
    use types::ids::UserId;
    use types::numeric::Odds;
    use types::race::Race;

    const A: HorseId = HorseId::new(1);
    const B: HorseId = HorseId::new(2);
    const C: HorseId = HorseId::new(3);

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn make_race(id: u64, hour: u32, field: &[(HorseId, &str)]) -> Race {
        let odds = field
            .iter()
            .map(|(h, o)| (*h, Odds::parse(o).unwrap()))
            .collect();
        Race::new(RaceId::new(id), odds, at(hour), Utc::now())
    }

    fn single(id: u64, race: &Race, horse: HorseId, stake: i64, odds_type: OddsType) -> Arc<Bet> {
        Arc::new(
            Bet::builder(BetId::new(id), UserId::new(1))
                .leg(race, horse, odds_type)
                .stake(Decimal::from(stake))
                .build()
                .unwrap(),
        )
    }

    fn set(bets: &[&Arc<Bet>]) -> BetSet {
        bets.iter()
            .fold(BetSet::new(), |acc, b| acc.union(BetSet::singleton(b)))
    }

    fn aggregate(race: &Race, bets: &BetSet, all: &[&Race]) -> RaceLiability {
        let snapshot = RaceSnapshot::from_races(all.iter().copied());
        aggregate_race(race.id(), &race.current_version(), bets, &snapshot).unwrap()
    }

    // ── Singles ──

    #[test]
    fn test_two_singles_scenario() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let bet1 = single(1, &x, A, 10, OddsType::FixedOdds);
        let bet2 = single(2, &x, B, 5, OddsType::FixedOdds);

        let liability = aggregate(&x, &set(&[&bet1, &bet2]), &[&x]);

        // A: +10 (bet1 wins) - 5 (bet2 loses) = 5
        // B: -10 (bet1 loses) + 10 (bet2 wins 5 × 2) = 0
        assert_eq!(liability.exposures[&A], Decimal::from(5));
        assert_eq!(liability.exposures[&B], Decimal::ZERO);
        assert_eq!(liability.bet_count, 2);
        assert!(liability.excluded.is_empty());
    }

    #[test]
    fn test_no_bets_all_zero() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let liability = aggregate(&x, &BetSet::new(), &[&x]);

        assert_eq!(liability.exposures.len(), 2);
        assert!(liability.exposures.values().all(|e| e.is_zero()));
        assert_eq!(liability.bet_count, 0);
    }

    #[test]
    fn test_live_odds_use_current_version() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let fixed = single(1, &x, A, 10, OddsType::FixedOdds);
        let live = single(2, &x, A, 10, OddsType::Live);

        let mut moved = BTreeMap::new();
        moved.insert(A, Odds::parse("4.0").unwrap());
        moved.insert(B, Odds::parse("1.5").unwrap());
        x.append_version(moved, at(14), Utc::now()).unwrap();

        let liability = aggregate(&x, &set(&[&fixed, &live]), &[&x]);
        // fixed: 10 × (2 − 1) = 10; live: 10 × (4 − 1) = 30
        assert_eq!(liability.exposures[&A], Decimal::from(40));
        assert_eq!(liability.exposures[&B], Decimal::from(-20));
        assert_eq!(liability.race_version, 1);
    }

    // ── Accumulators ──

    #[test]
    fn test_accumulator_worst_case() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let y = make_race(2, 15, &[(C, "1.5")]);
        let bet3 = Arc::new(
            Bet::builder(BetId::new(3), UserId::new(1))
                .leg(&x, A, OddsType::FixedOdds)
                .leg(&y, C, OddsType::FixedOdds)
                .stake(Decimal::from(10))
                .build()
                .unwrap(),
        );

        let liability = aggregate(&x, &set(&[&bet3]), &[&x, &y]);
        // Combined odds 2.0 × 1.5 = 3.0 → 10 × (3 − 1) = 20
        assert_eq!(liability.exposures[&A], Decimal::from(20));
        assert_eq!(liability.exposures[&B], Decimal::from(-10));

        let on_y = aggregate(&y, &set(&[&bet3]), &[&x, &y]);
        assert_eq!(on_y.exposures[&C], Decimal::from(20));
    }

    #[test]
    fn test_accumulator_missing_other_race_excluded() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let y = make_race(2, 15, &[(C, "1.5")]);
        let acca = Arc::new(
            Bet::builder(BetId::new(3), UserId::new(1))
                .leg(&x, A, OddsType::FixedOdds)
                .leg(&y, C, OddsType::Live)
                .stake(Decimal::from(10))
                .build()
                .unwrap(),
        );
        let other = single(4, &x, B, 5, OddsType::FixedOdds);

        // Race Y is not in the snapshot, so the live leg cannot be priced
        let liability = aggregate(&x, &set(&[&acca, &other]), &[&x]);
        assert_eq!(liability.bet_count, 1);
        assert_eq!(
            liability.excluded,
            vec![(BetId::new(3), MissingReferenceError::Race { race_id: RaceId::new(2) })]
        );
        assert_eq!(liability.exposures[&A], Decimal::from(-5));
        assert_eq!(liability.exposures[&B], Decimal::from(10));
    }

    #[test]
    fn test_legs_backing_different_horses_never_pay() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let split = Arc::new(
            Bet::builder(BetId::new(1), UserId::new(1))
                .leg(&x, A, OddsType::FixedOdds)
                .leg(&x, B, OddsType::FixedOdds)
                .stake(Decimal::from(10))
                .build()
                .unwrap(),
        );

        let liability = aggregate(&x, &set(&[&split]), &[&x]);
        assert_eq!(liability.exposures[&A], Decimal::from(-10));
        assert_eq!(liability.exposures[&B], Decimal::from(-10));
    }

    // ── Failures ──

    #[test]
    fn test_withdrawn_live_runner_excluded() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let live = single(1, &x, A, 10, OddsType::Live);

        let mut field = BTreeMap::new();
        field.insert(B, Odds::parse("1.2").unwrap());
        x.append_version(field, at(14), Utc::now()).unwrap();

        let liability = aggregate(&x, &set(&[&live]), &[&x]);
        assert_eq!(liability.bet_count, 0);
        assert!(matches!(
            liability.excluded[0].1,
            MissingReferenceError::UnpricedRunner { .. }
        ));
        assert_eq!(liability.exposures[&B], Decimal::ZERO);
    }

    #[test]
    fn test_unregistered_horse_excluded() {
        let x = make_race(1, 14, &[(A, "2.0"), (B, "3.0")]);
        let ghost = single(1, &x, A, 10, OddsType::FixedOdds);
        let known = single(2, &x, B, 5, OddsType::FixedOdds);

        // A runs in the race but was never registered as a horse
        let snapshot = RaceSnapshot::from_races([&x]).with_horses([B]);
        let liability =
            aggregate_race(x.id(), &x.current_version(), &set(&[&ghost, &known]), &snapshot).unwrap();

        assert_eq!(liability.bet_count, 1);
        assert_eq!(
            liability.excluded,
            vec![(BetId::new(1), MissingReferenceError::Horse { horse_id: A })]
        );
        assert_eq!(liability.exposures[&A], Decimal::from(-5));
        assert_eq!(liability.exposures[&B], Decimal::from(10));
    }

    #[test]
    fn test_no_runners_with_bets_fails() {
        let x = make_race(1, 14, &[(A, "2.0")]);
        let bet = single(1, &x, A, 10, OddsType::FixedOdds);
        x.append_version(BTreeMap::new(), at(14), Utc::now()).unwrap();

        let snapshot = RaceSnapshot::from_races([&x]);
        let result = aggregate_race(x.id(), &x.current_version(), &set(&[&bet]), &snapshot);
        assert_eq!(
            result,
            Err(AggregationError::NoRunners { race_id: RaceId::new(1), version: 1 })
        );
    }

    #[test]
    fn test_overflow_fails_race() {
        let x = make_race(1, 14, &[(A, "1000.0")]);
        let huge = Arc::new(
            Bet::builder(BetId::new(1), UserId::new(1))
                .leg(&x, A, OddsType::FixedOdds)
                .stake(Decimal::MAX)
                .build()
                .unwrap(),
        );

        let snapshot = RaceSnapshot::from_races([&x]);
        let result = aggregate_race(x.id(), &x.current_version(), &set(&[&huge]), &snapshot);
        assert!(matches!(result, Err(AggregationError::Overflow { .. })));
    }

    #[test]
    fn test_aggregation_idempotent() {
        let x = make_race(1, 14, &[(A, "2.5"), (B, "3.75")]);
        let bets = set(&[
            &single(1, &x, A, 7, OddsType::FixedOdds),
            &single(2, &x, B, 3, OddsType::Live),
        ]);
        let first = aggregate(&x, &bets, &[&x]);
        let second = aggregate(&x, &bets, &[&x]);
        assert_eq!(first, second);
    }

    // ── Properties ──

    proptest! {
        #[test]
        fn prop_singles_reconcile_with_stakes(
            field in prop::collection::vec(100u32..2000, 2..6),
            wagers in prop::collection::vec((0usize..6, 1u32..500), 0..30),
        ) {
            let runners: Vec<(HorseId, Odds)> = field
                .iter()
                .enumerate()
                .map(|(i, o)| (HorseId::new(i as u64 + 1), Odds::try_new(Decimal::new(*o as i64, 2)).unwrap_or(Odds::EVENS)))
                .collect();
            let race = Race::new(RaceId::new(1), runners.iter().copied().collect(), at(14), Utc::now());

            let bets: Vec<Arc<Bet>> = wagers
                .iter()
                .enumerate()
                .map(|(i, (pick, stake))| {
                    let horse = runners[pick % runners.len()].0;
                    single(i as u64 + 1, &race, horse, *stake as i64, OddsType::FixedOdds)
                })
                .collect();
            let bet_set = bets.iter().fold(BetSet::new(), |acc, b| acc.union(BetSet::singleton(b)));
            let liability = aggregate(&race, &bet_set, &[&race]);

            let total_stakes: Decimal = bets.iter().map(|b| b.stake.as_decimal()).sum();
            for (winner, odds) in &runners {
                let returned: Decimal = bets
                    .iter()
                    .filter(|b| b.legs()[0].backs(*winner))
                    .map(|b| b.stake.as_decimal() * odds.as_decimal())
                    .sum();
                // Net exposure plus every stake taken equals what the book hands back
                prop_assert_eq!(liability.exposures[winner] + total_stakes, returned);
            }
        }
    }
}
