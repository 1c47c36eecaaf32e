//! Random punter bot
//!
//! Places random bets with deterministic seeded RNG: mostly singles on a
//! random runner of a random race, with an occasional accumulator spread
//! across distinct races. Every bet goes through the validating builder.

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use risk_engine::context::Factory;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use types::bet::{Bet, OddsType};
use types::ids::{HorseId, UserId};
use types::race::Race;

use crate::config::ConfigError;

/// Configuration for the random punter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PunterConfig {
    /// Minimum stake
    pub min_stake: Decimal,
    /// Maximum stake
    pub max_stake: Decimal,
    /// Probability a bet is an accumulator (0.0 to 1.0)
    pub accumulator_ratio: f64,
    /// Probability a leg takes live odds rather than fixed
    pub live_ratio: f64,
    /// Most legs on an accumulator
    pub max_legs: usize,
}

impl Default for PunterConfig {
    fn default() -> Self {
        Self {
            min_stake: Decimal::ONE,
            max_stake: Decimal::from(50),
            accumulator_ratio: 0.1,
            live_ratio: 0.25,
            max_legs: 3,
        }
    }
}

impl PunterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_stake <= Decimal::ZERO || self.min_stake > self.max_stake {
            return Err(ConfigError::Invalid {
                field: "punter.min_stake",
                reason: format!(
                    "need 0 < min_stake <= max_stake, got {}..{}",
                    self.min_stake, self.max_stake
                ),
            });
        }
        for (field, ratio) in [
            ("punter.accumulator_ratio", self.accumulator_ratio),
            ("punter.live_ratio", self.live_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be within 0..=1, got {}", ratio),
                });
            }
        }
        if self.max_legs < 2 {
            return Err(ConfigError::Invalid {
                field: "punter.max_legs",
                reason: "an accumulator needs at least 2 legs".into(),
            });
        }
        Ok(())
    }
}

/// A bet the punter intends to place.
#[derive(Debug, Clone)]
pub struct BetSlip {
    pub user_id: UserId,
    pub legs: Vec<(Arc<Race>, HorseId, OddsType)>,
    pub stake: Decimal,
}

/// Random punter with deterministic seeded RNG.
pub struct Punter {
    pub config: PunterConfig,
    pub bets_placed: usize,
    pub bets_rejected: usize,
    rng: ChaCha8Rng,
}

impl Punter {
    /// Create a punter with a deterministic seed.
    pub fn new(config: PunterConfig, seed: u64) -> Self {
        Self::from_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_rng(config: PunterConfig, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            bets_placed: 0,
            bets_rejected: 0,
            rng,
        }
    }

    /// Draw a random slip.
    ///
    /// Returns None if there are no users or no races with runners.
    pub fn draw_slip(&mut self, users: &[UserId], races: &[Arc<Race>]) -> Option<BetSlip> {
        let user_id = *users.choose(&mut self.rng)?;
        let open: Vec<&Arc<Race>> = races
            .iter()
            .filter(|r| r.current_version().runner_count() > 0)
            .collect();
        if open.is_empty() {
            return None;
        }

        let legs = if open.len() > 1 && self.rng.gen_bool(self.config.accumulator_ratio) {
            let most = self.config.max_legs.min(open.len());
            self.rng.gen_range(2..=most)
        } else {
            1
        };

        let chosen: Vec<&Arc<Race>> = open.choose_multiple(&mut self.rng, legs).copied().collect();
        let mut slip_legs = Vec::with_capacity(legs);
        for race in chosen {
            let runners: Vec<HorseId> = race.current_version().runners().collect();
            let Some(horse) = runners.choose(&mut self.rng) else {
                continue;
            };
            let odds_type = if self.rng.gen_bool(self.config.live_ratio) {
                OddsType::Live
            } else {
                OddsType::FixedOdds
            };
            slip_legs.push((Arc::clone(race), *horse, odds_type));
        }

        Some(BetSlip {
            user_id,
            legs: slip_legs,
            stake: self.draw_stake(),
        })
    }

    /// Random stake in whole pence between the configured bounds
    fn draw_stake(&mut self) -> Decimal {
        let lo = (self.config.min_stake * Decimal::ONE_HUNDRED).ceil();
        let hi = (self.config.max_stake * Decimal::ONE_HUNDRED).floor();
        let (Ok(lo), Ok(hi)) = (i64::try_from(lo), i64::try_from(hi)) else {
            return self.config.min_stake;
        };
        if lo > hi {
            return self.config.min_stake;
        }
        Decimal::new(self.rng.gen_range(lo..=hi), 2)
    }

    /// Draw a slip, build it and place it in the book.
    ///
    /// Invalid bets are logged and dropped.
    pub fn place_random(
        &mut self,
        factory: &Factory,
        users: &[UserId],
        races: &[Arc<Race>],
    ) -> Option<Arc<Bet>> {
        let slip = self.draw_slip(users, races)?;

        let mut builder = factory.bet(slip.user_id).stake(slip.stake);
        for (race, horse, odds_type) in &slip.legs {
            builder = builder.leg(race, *horse, *odds_type);
        }

        let placed = builder
            .build()
            .map_err(|e| e.to_string())
            .and_then(|bet| factory.place(bet).map_err(|e| e.to_string()));

        match placed {
            Ok(bet) => {
                self.bets_placed += 1;
                debug!(
                    bet_id = %bet.id,
                    user_id = %bet.user_id,
                    legs = bet.legs().len(),
                    stake = %bet.stake,
                    "Placed simulated bet"
                );
                Some(bet)
            }
            Err(reason) => {
                self.bets_rejected += 1;
                warn!(user_id = %slip.user_id, reason = %reason, "Dropped simulated bet");
                None
            }
        }
    }

    /// Place `count` random bets; returns how many were accepted.
    pub fn tick(
        &mut self,
        factory: &Factory,
        users: &[UserId],
        races: &[Arc<Race>],
        count: usize,
    ) -> usize {
        (0..count)
            .filter(|_| self.place_random(factory, users, races).is_some())
            .count()
    }
}
