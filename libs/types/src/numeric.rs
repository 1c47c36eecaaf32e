//! Fixed-point decimal types for odds and stakes
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors),
//! so two recalculations over the same bets produce identical liabilities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal odds offered on a runner.
///
/// Decimal odds include the returned stake: a winning stake of 10 at odds
/// 3.0 returns 30, of which 20 is profit. Odds below 1.0 are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Odds(Decimal);

impl Odds {
    /// Evens (2.0)
    pub const EVENS: Odds = Odds(Decimal::TWO);

    /// Create odds, returning None if below 1.0
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parse odds from a decimal string
    pub fn parse(s: &str) -> Option<Self> {
        Decimal::from_str(s).ok().and_then(Self::try_new)
    }

    /// Get the underlying decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Profit multiplier on a winning stake: `odds - 1`
    pub fn net_multiplier(&self) -> Decimal {
        self.0 - Decimal::ONE
    }
}

impl TryFrom<Decimal> for Odds {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or_else(|| format!("odds must be at least 1.0, got {}", value))
    }
}

impl From<Odds> for Decimal {
    fn from(odds: Odds) -> Self {
        odds.0
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount wagered on a bet. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Stake(Decimal);

impl Stake {
    /// Create a stake, returning None unless strictly positive
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Create a whole-unit stake
    pub fn from_u64(value: u64) -> Option<Self> {
        Self::try_new(Decimal::from(value))
    }

    /// Parse a stake from a decimal string
    pub fn parse(s: &str) -> Option<Self> {
        Decimal::from_str(s).ok().and_then(Self::try_new)
    }

    /// Get the underlying decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Stake {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or_else(|| format!("stake must be positive, got {}", value))
    }
}

impl From<Stake> for Decimal {
    fn from(stake: Stake) -> Self {
        stake.0
    }
}

impl fmt::Display for Stake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
