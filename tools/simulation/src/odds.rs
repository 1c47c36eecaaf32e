//! Simulated odds
//!
//! Prices a field of runners with deterministic seeded RNG. The n-th runner
//! in field order is drawn from `1 + U(0, n)`, so later runners tend to be
//! longer prices. Repricing drifts each runner by a bounded percentage.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use types::ids::HorseId;
use types::numeric::Odds;

/// Shortest price ever offered
const MIN_ODDS: Decimal = Decimal::from_parts(101, 0, 0, false, 2);

/// Largest single-step drift when repricing, in percent
const MAX_DRIFT_PCT: i64 = 15;

/// Seeded odds generator
pub struct OddsGenerator {
    rng: ChaCha8Rng,
}

impl OddsGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_rng(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }

    /// Price a field. Runners are priced in the order given.
    pub fn price(&mut self, runners: &[HorseId]) -> BTreeMap<HorseId, Odds> {
        runners
            .iter()
            .enumerate()
            .map(|(i, horse)| {
                let spread = (i + 1) as f64;
                let raw = 1.0 + self.rng.gen_range(0.0..spread);
                (*horse, to_odds(raw))
            })
            .collect()
    }

    /// Drift every runner's price by up to ±15%
    pub fn drift(&mut self, current: &BTreeMap<HorseId, Odds>) -> BTreeMap<HorseId, Odds> {
        current
            .iter()
            .map(|(horse, odds)| {
                let pct = self.rng.gen_range(-MAX_DRIFT_PCT..=MAX_DRIFT_PCT);
                let factor = Decimal::ONE + Decimal::new(pct, 2);
                let moved = (odds.as_decimal() * factor).round_dp(2);
                (*horse, Odds::try_new(moved.max(MIN_ODDS)).unwrap_or(*odds))
            })
            .collect()
    }
}

fn to_odds(raw: f64) -> Odds {
    let value = Decimal::from_f64(raw)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::TWO)
        .max(MIN_ODDS);
    Odds::try_new(value).unwrap_or(Odds::EVENS)
}
