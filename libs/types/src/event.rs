//! Race meetings

use crate::ids::{EventId, RaceId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A race on an event card, keyed by its scheduled time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    pub race_time: NaiveDateTime,
    pub race_id: RaceId,
}

/// A named meeting on a calendar date with its card of races.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub date: NaiveDate,
    card: Vec<CardEntry>,
}

impl Event {
    pub fn new(id: EventId, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            date,
            card: Vec::new(),
        }
    }

    /// Add a race to the card, keeping the card ordered by race time.
    ///
    /// Races with equal times keep insertion order.
    pub fn add_race(&mut self, race_id: RaceId, race_time: NaiveDateTime) {
        let at = self.card.partition_point(|e| e.race_time <= race_time);
        self.card.insert(at, CardEntry { race_time, race_id });
    }

    /// Race ids in running order
    pub fn races(&self) -> impl Iterator<Item = RaceId> + '_ {
        self.card.iter().map(|e| e.race_id)
    }

    pub fn card(&self) -> &[CardEntry] {
        &self.card
    }

    /// Opening race of the meeting
    pub fn first_race(&self) -> Option<RaceId> {
        self.card.first().map(|e| e.race_id)
    }

    pub fn race_count(&self) -> usize {
        self.card.len()
    }
}
