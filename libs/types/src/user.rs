//! User accounts and their bet index

use crate::bet::Bet;
use crate::ids::{BetId, UserId};
use std::sync::Arc;

/// A user account with its placed bets.
///
/// Bets are kept ordered by the off time of their earliest leg; bets with
/// the same earliest leg keep placement order. Bets are never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    bets: Vec<Arc<Bet>>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bets: Vec::new(),
        }
    }

    /// Add a bet to the index
    pub fn place(&mut self, bet: Arc<Bet>) {
        let earliest = bet.earliest_race_time();
        let at = self
            .bets
            .partition_point(|b| b.earliest_race_time() <= earliest);
        self.bets.insert(at, bet);
    }

    /// Copy of this account with one more bet.
    ///
    /// Stored accounts are shared immutably, so placement replaces the
    /// stored value with this copy. Bets themselves are shared, not cloned.
    pub fn with_bet(&self, bet: Arc<Bet>) -> Self {
        let mut next = self.clone();
        next.place(bet);
        next
    }

    /// Bets ordered by earliest leg
    pub fn known_bets(&self) -> &[Arc<Bet>] {
        &self.bets
    }

    pub fn bet(&self, id: BetId) -> Option<&Arc<Bet>> {
        self.bets.iter().find(|b| b.id == id)
    }

    pub fn bet_count(&self) -> usize {
        self.bets.len()
    }
}
