//! Versioned race types
//!
//! A race is an append-only arena of immutable [`RaceVersion`] snapshots plus
//! an index that always points at the latest one. Readers take an `Arc` to a
//! version and keep a consistent view of runners and odds no matter how many
//! versions are appended afterwards.

use crate::errors::RaceError;
use crate::ids::{HorseId, RaceId};
use crate::numeric::Odds;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Immutable snapshot of a race's runners and offered odds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceVersion {
    /// Position of this snapshot in the race's version sequence (0-based)
    pub version: u32,
    /// When this snapshot was appended
    pub created_at: DateTime<Utc>,
    /// Scheduled off time
    pub race_time: NaiveDateTime,
    /// Runner → offered odds. The key set is the field of runners.
    pub odds: BTreeMap<HorseId, Odds>,
}

impl RaceVersion {
    /// Runners in this snapshot, in id order
    pub fn runners(&self) -> impl Iterator<Item = HorseId> + '_ {
        self.odds.keys().copied()
    }

    /// Number of runners
    pub fn runner_count(&self) -> usize {
        self.odds.len()
    }

    pub fn is_runner(&self, horse: HorseId) -> bool {
        self.odds.contains_key(&horse)
    }

    /// Offered odds for a runner, if it is in the field
    pub fn odds_for(&self, horse: HorseId) -> Option<Odds> {
        self.odds.get(&horse).copied()
    }

    /// Calendar date the race is run on
    pub fn race_date(&self) -> NaiveDate {
        self.race_time.date()
    }
}

/// A race: an ordered, append-only sequence of [`RaceVersion`]s.
#[derive(Debug)]
pub struct Race {
    id: RaceId,
    versions: RwLock<Vec<Arc<RaceVersion>>>,
    current: AtomicUsize,
    winner: OnceLock<HorseId>,
}

impl Race {
    /// Create a race with its initial version
    pub fn new(
        id: RaceId,
        odds: BTreeMap<HorseId, Odds>,
        race_time: NaiveDateTime,
        created_at: DateTime<Utc>,
    ) -> Self {
        let initial = RaceVersion {
            version: 0,
            created_at,
            race_time,
            odds,
        };

        Self {
            id,
            versions: RwLock::new(vec![Arc::new(initial)]),
            current: AtomicUsize::new(0),
            winner: OnceLock::new(),
        }
    }

    pub fn id(&self) -> RaceId {
        self.id
    }

    /// Append a new immutable version and make it current.
    ///
    /// Versions must be appended in creation-time order; an append stamped
    /// earlier than the current version is rejected.
    pub fn append_version(
        &self,
        odds: BTreeMap<HorseId, Odds>,
        race_time: NaiveDateTime,
        created_at: DateTime<Utc>,
    ) -> Result<Arc<RaceVersion>, RaceError> {
        let mut versions = self.versions.write();
        let previous = versions.len() - 1;
        let latest = &versions[previous];

        if created_at < latest.created_at {
            return Err(RaceError::OutOfOrderVersion {
                race_id: self.id,
                previous: latest.created_at,
                attempted: created_at,
            });
        }

        let version = Arc::new(RaceVersion {
            version: versions.len() as u32,
            created_at,
            race_time,
            odds,
        });
        versions.push(Arc::clone(&version));
        self.current.store(previous + 1, Ordering::Release);

        Ok(version)
    }

    /// The most recently appended version
    pub fn current_version(&self) -> Arc<RaceVersion> {
        let index = self.current.load(Ordering::Acquire);
        // The arena only grows, so a published index is always in bounds.
        Arc::clone(&self.versions.read()[index])
    }

    /// A specific historical version
    pub fn version(&self, version: u32) -> Option<Arc<RaceVersion>> {
        self.versions.read().get(version as usize).cloned()
    }

    pub fn version_count(&self) -> usize {
        self.current.load(Ordering::Acquire) + 1
    }

    /// Record the race result. A race can be settled once.
    pub fn settle(&self, winner: HorseId) -> Result<(), RaceError> {
        if !self.current_version().is_runner(winner) {
            return Err(RaceError::UnknownRunner {
                race_id: self.id,
                horse_id: winner,
            });
        }
        self.winner
            .set(winner)
            .map_err(|_| RaceError::AlreadySettled { race_id: self.id })
    }

    /// Winner, if the race has been settled
    pub fn winner(&self) -> Option<HorseId> {
        self.winner.get().copied()
    }
}
