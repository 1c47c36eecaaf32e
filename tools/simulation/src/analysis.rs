//! Winner statistics over historical meetings
//!
//! Counts, per horse, the meetings whose opening race it won, and picks
//! out the horses that did so more than once.

use risk_engine::context::BookContext;
use risk_engine::store::ObjectStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use types::event::Event;
use types::ids::HorseId;

/// Opening-race wins per horse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WinnerTally {
    wins: BTreeMap<HorseId, u64>,
    /// Meetings skipped because the opening race is unsettled or unknown
    pub skipped: usize,
}

impl WinnerTally {
    /// Tally the winners of each meeting's first race
    pub fn first_race_winners(book: &BookContext, events: &[Arc<Event>]) -> Self {
        let mut tally = Self::default();

        for event in events {
            let Some(race_id) = event.first_race() else {
                tally.skipped += 1;
                continue;
            };
            let winner = match book.race(race_id) {
                Ok(race) => race.winner(),
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "Opening race missing from book");
                    None
                }
            };
            match winner {
                Some(horse) => tally.record(horse),
                None => tally.skipped += 1,
            }
        }

        debug!(horses = tally.wins.len(), skipped = tally.skipped, "Tallied first-race winners");
        tally
    }

    pub fn record(&mut self, horse: HorseId) {
        *self.wins.entry(horse).or_insert(0) += 1;
    }

    pub fn wins(&self, horse: HorseId) -> u64 {
        self.wins.get(&horse).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HorseId, u64)> + '_ {
        self.wins.iter().map(|(h, n)| (*h, *n))
    }

    /// Horses with more than one win
    pub fn multiple_winners(&self) -> BTreeMap<HorseId, u64> {
        self.wins
            .iter()
            .filter(|(_, n)| **n > 1)
            .map(|(h, n)| (*h, *n))
            .collect()
    }

    /// Winning horses, most wins first; ties in id order
    pub fn ranked(&self) -> Vec<HorseId> {
        let mut ranked: Vec<(HorseId, u64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().map(|(h, _)| h).collect()
    }

    /// Write the tally into a winners store
    pub fn save(&self, store: &dyn ObjectStore<HorseId, u64>) {
        for (horse, wins) in self.iter() {
            store.put(horse, wins);
        }
    }

    pub fn len(&self) -> usize {
        self.wins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::HistoricalLoader;
    use risk_engine::context::Factory;
    use risk_engine::identity::LocalIdGenerator;
    use risk_engine::store::StoreBackend;
    use std::io::Cursor;

    fn meeting(date: &str, winner: Option<&str>) -> String {
        let winner = winner
            .map(|w| format!(r#","winner":"{}""#, w))
            .unwrap_or_default();
        format!(
            r#"{{"name":"Meeting {date}","date":"{date}","races":[{{"time":"14:00"{winner},"runners":[{{"name":"Arkle","odds":"2.0"}},{{"name":"Red Rum","odds":"3.0"}}]}}]}}"#
        )
    }

    fn load(lines: &[String]) -> (Factory, Vec<Arc<Event>>) {
        let factory = Factory::new(
            Arc::new(LocalIdGenerator::new()),
            BookContext::new(StoreBackend::Local),
        );
        let history = HistoricalLoader::new(&factory)
            .load(Cursor::new(lines.join("\n")))
            .unwrap();
        (factory, history.events)
    }

    fn id_of(factory: &Factory, name: &str) -> HorseId {
        factory
            .book()
            .horses
            .values(&|_, h| h.name == name)
            .first()
            .unwrap()
            .id
    }

    #[test]
    fn test_tally_and_multiple_winners() {
        let (factory, events) = load(&[
            meeting("2016-06-01", Some("Arkle")),
            meeting("2016-06-02", Some("Red Rum")),
            meeting("2016-06-03", Some("Arkle")),
            meeting("2016-06-04", None),
        ]);
        let arkle = id_of(&factory, "Arkle");
        let red_rum = id_of(&factory, "Red Rum");

        let tally = WinnerTally::first_race_winners(factory.book(), &events);
        assert_eq!(tally.wins(arkle), 2);
        assert_eq!(tally.wins(red_rum), 1);
        assert_eq!(tally.skipped, 1);
        assert_eq!(tally.ranked(), vec![arkle, red_rum]);

        let multiple = tally.multiple_winners();
        assert_eq!(multiple.len(), 1);
        assert_eq!(multiple[&arkle], 2);
    }

    #[test]
    fn test_save_to_store() {
        let mut tally = WinnerTally::default();
        tally.record(HorseId::new(4));
        tally.record(HorseId::new(4));
        tally.record(HorseId::new(9));

        let store = StoreBackend::Partitioned.open::<HorseId, u64>();
        tally.save(store.as_ref());
        assert_eq!(store.get(&HorseId::new(4)), Some(2));
        assert_eq!(store.keys(&|_, n| *n > 1), vec![HorseId::new(4)]);
    }

    #[test]
    fn test_empty_history() {
        let tally = WinnerTally::first_race_winners(&BookContext::new(StoreBackend::Local), &[]);
        assert!(tally.is_empty());
        assert!(tally.multiple_winners().is_empty());
    }
}
