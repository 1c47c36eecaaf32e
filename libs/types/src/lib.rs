//! Types library for the live wagering book
//!
//! Core domain types shared by the risk engine and the simulation tools.
//! Entities are immutable once built; the only mutation points are
//! appending race versions and settling a race.
//!
//! # Modules
//! - `ids`: Numeric identifiers (HorseId, RaceId, EventId, UserId, BetId)
//! - `numeric`: Fixed-point decimal types (Odds, Stake)
//! - `horse`: Horse identity
//! - `race`: Versioned races
//! - `event`: Race meetings
//! - `bet`: Bets, legs and the validating builder
//! - `user`: User accounts and their bet index
//! - `risk`: Per-race liability reports
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod horse;
pub mod race;
pub mod event;
pub mod bet;
pub mod user;
pub mod risk;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::horse::*;
    pub use crate::race::*;
    pub use crate::event::*;
    pub use crate::bet::*;
    pub use crate::user::*;
    pub use crate::risk::*;
    pub use crate::errors::*;
}
