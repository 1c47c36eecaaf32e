//! Error types for the wagering book
//!
//! Comprehensive error taxonomy using thiserror

use crate::ids::{BetId, EventId, HorseId, RaceId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Bet construction failures. Raised before a bet enters any store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidBetError {
    #[error("Bet has no legs")]
    NoLegs,

    #[error("Stake must be positive, got {stake}")]
    NonPositiveStake { stake: Decimal },

    #[error("{horse_id} is not a runner in {race_id}")]
    NotARunner { race_id: RaceId, horse_id: HorseId },
}

/// Race version and settlement errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RaceError {
    #[error("Version for {race_id} created at {attempted} precedes current version at {previous}")]
    OutOfOrderVersion {
        race_id: RaceId,
        previous: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    #[error("{horse_id} is not a runner in {race_id}")]
    UnknownRunner { race_id: RaceId, horse_id: HorseId },

    #[error("{race_id} already settled")]
    AlreadySettled { race_id: RaceId },
}

/// A stored entity refers to something the book cannot find
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MissingReferenceError {
    #[error("Race not found: {race_id}")]
    Race { race_id: RaceId },

    #[error("Horse not found: {horse_id}")]
    Horse { horse_id: HorseId },

    #[error("Event not found: {event_id}")]
    Event { event_id: EventId },

    #[error("User not found: {user_id}")]
    User { user_id: UserId },

    #[error("No current odds for {horse_id} in {race_id} (bet {bet_id})")]
    UnpricedRunner {
        bet_id: BetId,
        race_id: RaceId,
        horse_id: HorseId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_bet_display() {
        let err = InvalidBetError::NonPositiveStake {
            stake: Decimal::from(-3),
        };
        assert_eq!(err.to_string(), "Stake must be positive, got -3");
    }

    #[test]
    fn test_missing_reference_display() {
        let err = MissingReferenceError::UnpricedRunner {
            bet_id: BetId::new(4),
            race_id: RaceId::new(2),
            horse_id: HorseId::new(9),
        };
        assert!(err.to_string().contains("horse-9"));
        assert!(err.to_string().contains("race-2"));
    }
}
