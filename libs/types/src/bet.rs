//! Bet and leg types
//!
//! A [`Bet`] is an immutable wager over one or more [`Leg`]s. Bets are only
//! created through [`BetBuilder`], which validates the wager and freezes
//! fixed odds at the moment of placement.

use crate::errors::InvalidBetError;
use crate::ids::{BetId, HorseId, RaceId, UserId};
use crate::numeric::{Odds, Stake};
use crate::race::{Race, RaceVersion};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the odds on a leg are determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OddsType {
    /// Odds frozen at placement time
    FixedOdds,
    /// Odds taken from the race's current version when evaluated
    Live,
}

/// Odds carried by a leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum LegOdds {
    /// Frozen at placement
    Fixed(Odds),
    /// Resolve against the race's current version
    Live,
}

/// One horse/race selection within a bet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leg {
    pub race_id: RaceId,
    pub horse_id: HorseId,
    pub odds: LegOdds,
    /// Race off time as known when the leg was placed
    pub race_time: NaiveDateTime,
}

impl Leg {
    pub fn odds_type(&self) -> OddsType {
        match self.odds {
            LegOdds::Fixed(_) => OddsType::FixedOdds,
            LegOdds::Live => OddsType::Live,
        }
    }

    /// Odds applicable to this leg given the race's current version.
    ///
    /// Fixed legs ignore the version. Live legs return None when the backed
    /// horse is no longer priced.
    pub fn resolve_odds(&self, current: &RaceVersion) -> Option<Odds> {
        match self.odds {
            LegOdds::Fixed(odds) => Some(odds),
            LegOdds::Live => current.odds_for(self.horse_id),
        }
    }

    pub fn backs(&self, horse: HorseId) -> bool {
        self.horse_id == horse
    }
}

/// An immutable placed wager. More than one leg makes it an accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    legs: Vec<Leg>,
    pub stake: Stake,
    pub placed_at: DateTime<Utc>,
}

impl Bet {
    /// Start building a bet
    pub fn builder<'r>(id: BetId, user_id: UserId) -> BetBuilder<'r> {
        BetBuilder::new(id, user_id)
    }

    /// Legs in placement order
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn is_accumulator(&self) -> bool {
        self.legs.len() > 1
    }

    /// Legs placed on the given race
    pub fn legs_on(&self, race_id: RaceId) -> impl Iterator<Item = &Leg> + '_ {
        self.legs.iter().filter(move |l| l.race_id == race_id)
    }

    /// Races this bet touches, in leg order (may repeat)
    pub fn races(&self) -> impl Iterator<Item = RaceId> + '_ {
        self.legs.iter().map(|l| l.race_id)
    }

    /// Off time of the earliest leg
    pub fn earliest_race_time(&self) -> NaiveDateTime {
        // Builder guarantees at least one leg
        self.legs
            .iter()
            .map(|l| l.race_time)
            .min()
            .unwrap_or(NaiveDateTime::MIN)
    }
}

struct PendingLeg<'r> {
    race: &'r Race,
    horse_id: HorseId,
    odds_type: OddsType,
}

/// Validating builder for [`Bet`]
pub struct BetBuilder<'r> {
    id: BetId,
    user_id: UserId,
    legs: Vec<PendingLeg<'r>>,
    stake: Decimal,
    placed_at: Option<DateTime<Utc>>,
}

impl<'r> BetBuilder<'r> {
    pub fn new(id: BetId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            legs: Vec::new(),
            stake: Decimal::ZERO,
            placed_at: None,
        }
    }

    /// Add a leg backing `horse_id` in `race`
    pub fn leg(mut self, race: &'r Race, horse_id: HorseId, odds_type: OddsType) -> Self {
        self.legs.push(PendingLeg {
            race,
            horse_id,
            odds_type,
        });
        self
    }

    pub fn stake(mut self, stake: Decimal) -> Self {
        self.stake = stake;
        self
    }

    /// Placement time; defaults to now
    pub fn placed_at(mut self, placed_at: DateTime<Utc>) -> Self {
        self.placed_at = Some(placed_at);
        self
    }

    /// Validate and freeze the bet.
    ///
    /// Fixed-odds legs copy the backed horse's odds from each race's current
    /// version at this instant.
    pub fn build(self) -> Result<Bet, InvalidBetError> {
        if self.legs.is_empty() {
            return Err(InvalidBetError::NoLegs);
        }

        let stake = Stake::try_new(self.stake)
            .ok_or(InvalidBetError::NonPositiveStake { stake: self.stake })?;

        let mut legs = Vec::with_capacity(self.legs.len());
        for pending in self.legs {
            let current = pending.race.current_version();
            let offered = current
                .odds_for(pending.horse_id)
                .ok_or(InvalidBetError::NotARunner {
                    race_id: pending.race.id(),
                    horse_id: pending.horse_id,
                })?;

            let odds = match pending.odds_type {
                OddsType::FixedOdds => LegOdds::Fixed(offered),
                OddsType::Live => LegOdds::Live,
            };

            legs.push(Leg {
                race_id: pending.race.id(),
                horse_id: pending.horse_id,
                odds,
                race_time: current.race_time,
            });
        }

        Ok(Bet {
            id: self.id,
            user_id: self.user_id,
            legs,
            stake,
            placed_at: self.placed_at.unwrap_or_else(Utc::now),
        })
    }
}
