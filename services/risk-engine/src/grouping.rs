//! Race grouping
//!
//! Fans each bet out into one `(race → {bet})` association per leg and
//! merges associations for the same race by set union. Union is
//! associative and commutative, so the bets may be split into any number
//! of partitions, grouped independently and merged in any order.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use types::bet::Bet;
use types::ids::{BetId, RaceId};

/// A set of bets keyed by bet id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BetSet(BTreeMap<BetId, Arc<Bet>>);

impl BetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(bet: &Arc<Bet>) -> Self {
        let mut set = Self::new();
        set.insert(bet);
        set
    }

    pub fn insert(&mut self, bet: &Arc<Bet>) {
        self.0.entry(bet.id).or_insert_with(|| Arc::clone(bet));
    }

    /// Set union, reusing the larger side's allocation
    pub fn union(self, other: BetSet) -> BetSet {
        let (mut big, small) = if self.0.len() >= other.0.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (id, bet) in small.0 {
            big.0.entry(id).or_insert(bet);
        }
        big
    }

    pub fn contains(&self, id: BetId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = BetId> + '_ {
        self.0.keys().copied()
    }

    /// Bets in id order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Bet>> + '_ {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Race → bets with at least one leg on that race
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaceAssociations(BTreeMap<RaceId, BetSet>);

impl RaceAssociations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one association
    pub fn absorb(mut self, race_id: RaceId, bets: BetSet) -> Self {
        let merged = match self.0.remove(&race_id) {
            Some(existing) => existing.union(bets),
            None => bets,
        };
        self.0.insert(race_id, merged);
        self
    }

    /// Merge two partial groupings
    pub fn merge(self, other: RaceAssociations) -> Self {
        let (big, small) = if self.0.len() >= other.0.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .0
            .into_iter()
            .fold(big, |acc, (race_id, bets)| acc.absorb(race_id, bets))
    }

    pub fn get(&self, race_id: RaceId) -> Option<&BetSet> {
        self.0.get(&race_id)
    }

    pub fn races(&self) -> impl Iterator<Item = RaceId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RaceId, &BetSet)> + '_ {
        self.0.iter().map(|(r, b)| (*r, b))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One association per leg of the bet
pub fn fan_out(bet: &Arc<Bet>) -> impl Iterator<Item = (RaceId, BetSet)> + '_ {
    bet.races().map(move |race_id| (race_id, BetSet::singleton(bet)))
}

/// Group bets by race, keeping only races accepted by `keep`.
///
/// Runs as a parallel fold over the bets followed by a merge of the
/// per-worker partial groupings.
pub fn group_by_race<F>(bets: &[Arc<Bet>], keep: F) -> RaceAssociations
where
    F: Fn(RaceId) -> bool + Sync,
{
    bets.par_iter()
        .fold(RaceAssociations::new, |acc, bet| {
            fan_out(bet)
                .filter(|(race_id, _)| keep(*race_id))
                .fold(acc, |acc, (race_id, set)| acc.absorb(race_id, set))
        })
        .reduce(RaceAssociations::new, RaceAssociations::merge)
}
