//! Per-cycle race snapshot
//!
//! Captures the current version of every race once at cycle start, so all
//! stages of a cycle agree on race dates, runners and live odds even while
//! new versions are being appended. The registered horse ids are captured
//! alongside, so legs naming an unknown horse can be excluded.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use types::horse::Horse;
use types::ids::{HorseId, RaceId};
use types::race::{Race, RaceVersion};

use crate::store::ObjectStore;

#[derive(Debug, Clone, Default)]
pub struct RaceSnapshot {
    versions: HashMap<RaceId, Arc<RaceVersion>>,
    horses: HashSet<HorseId>,
}

impl RaceSnapshot {
    /// Snapshot every race and every registered horse id
    ///
    /// Races are read before horses: a race only names horses that were
    /// registered before it was created.
    pub fn capture(
        races: &dyn ObjectStore<RaceId, Arc<Race>>,
        horses: &dyn ObjectStore<HorseId, Arc<Horse>>,
    ) -> Self {
        let snapshot = Self::from_races(races.all_values().iter().map(|r| r.as_ref()));
        snapshot.with_horses(horses.keys(&|_, _| true))
    }

    /// Snapshot the given races; every horse that has run in any of their
    /// versions counts as known
    pub fn from_races<'a>(races: impl IntoIterator<Item = &'a Race>) -> Self {
        let mut versions = HashMap::new();
        let mut horses = HashSet::new();
        for race in races {
            let current = race.current_version();
            for number in 0..=current.version {
                if let Some(version) = race.version(number) {
                    horses.extend(version.runners());
                }
            }
            versions.insert(race.id(), current);
        }
        Self { versions, horses }
    }

    /// Replace the known horse set
    pub fn with_horses(mut self, horses: impl IntoIterator<Item = HorseId>) -> Self {
        self.horses = horses.into_iter().collect();
        self
    }

    pub fn get(&self, race_id: RaceId) -> Option<&Arc<RaceVersion>> {
        self.versions.get(&race_id)
    }

    pub fn has_horse(&self, horse_id: HorseId) -> bool {
        self.horses.contains(&horse_id)
    }

    /// Date the race runs on, if known
    pub fn race_date(&self, race_id: RaceId) -> Option<NaiveDate> {
        self.versions.get(&race_id).map(|v| v.race_date())
    }

    /// Races running on `date` with their captured versions, in id order
    pub fn races_on(&self, date: NaiveDate) -> Vec<(RaceId, &Arc<RaceVersion>)> {
        let mut out: Vec<(RaceId, &Arc<RaceVersion>)> = self
            .versions
            .iter()
            .filter(|(_, v)| v.race_date() == date)
            .map(|(id, v)| (*id, v))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
