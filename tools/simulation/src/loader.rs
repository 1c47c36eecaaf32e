//! Historical meeting loader
//!
//! Reads line-delimited JSON, one meeting per line:
//!
//! ```json
//! {"name": "Derby Day", "date": "2016-06-04",
//!  "races": [{"time": "14:00", "winner": "Harzand",
//!             "runners": [{"name": "Harzand", "odds": "14.0"}, ...]}]}
//! ```
//!
//! Horses are deduplicated by name across the whole file. Races are created
//! through the factory and settled when a winner is given. Blank lines are
//! skipped; any other bad line stops the load with its line number.

use chrono::{NaiveDate, NaiveTime};
use risk_engine::context::Factory;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use types::errors::{MissingReferenceError, RaceError};
use types::event::Event;
use types::horse::Horse;
use types::ids::HorseId;
use types::numeric::Odds;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: read failed: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: malformed record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: {reason}")]
    Invalid { line: usize, reason: String },
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    name: String,
    date: NaiveDate,
    races: Vec<RaceRecord>,
}

#[derive(Debug, Deserialize)]
struct RaceRecord {
    time: String,
    runners: Vec<RunnerRecord>,
    #[serde(default)]
    winner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunnerRecord {
    name: String,
    odds: Odds,
}

/// What a load added to the book
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Events in file order
    pub events: Vec<Arc<Event>>,
    pub races: usize,
    pub settled: usize,
}

impl History {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Loads historical meetings into the book
pub struct HistoricalLoader<'a> {
    factory: &'a Factory,
    horses: HashMap<String, Arc<Horse>>,
}

impl<'a> HistoricalLoader<'a> {
    pub fn new(factory: &'a Factory) -> Self {
        Self {
            factory,
            horses: HashMap::new(),
        }
    }

    /// Distinct horses seen so far
    pub fn horse_count(&self) -> usize {
        self.horses.len()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<History, LoaderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoaderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let history = self.load(BufReader::new(file))?;
        info!(
            path = %path.display(),
            events = history.events.len(),
            races = history.races,
            horses = self.horses.len(),
            "Loaded historical races"
        );
        Ok(history)
    }

    /// Load every record from a reader
    pub fn load(&mut self, reader: impl BufRead) -> Result<History, LoaderError> {
        let mut history = History::default();

        for (index, text) in reader.lines().enumerate() {
            let line = index + 1;
            let text = text.map_err(|source| LoaderError::Read { line, source })?;
            if text.trim().is_empty() {
                continue;
            }
            let record: EventRecord = serde_json::from_str(&text)
                .map_err(|source| LoaderError::Parse { line, source })?;
            self.add_event(record, line, &mut history)?;
        }

        Ok(history)
    }

    fn add_event(
        &mut self,
        record: EventRecord,
        line: usize,
        history: &mut History,
    ) -> Result<(), LoaderError> {
        let invalid = |reason: String| LoaderError::Invalid { line, reason };

        let mut event = self.factory.event(record.name, record.date);
        for race_record in record.races {
            let time = parse_time(&race_record.time)
                .ok_or_else(|| invalid(format!("bad race time {:?}", race_record.time)))?;

            let odds: BTreeMap<HorseId, Odds> = race_record
                .runners
                .iter()
                .map(|r| (self.horse(&r.name).id, r.odds))
                .collect();
            let race = self.factory.race(odds, record.date.and_time(time));

            if let Some(name) = &race_record.winner {
                let winner = self.horse(name).id;
                race.settle(winner).map_err(|e| match e {
                    RaceError::UnknownRunner { .. } => {
                        invalid(format!("winner {:?} is not a runner", name))
                    }
                    other => invalid(other.to_string()),
                })?;
                history.settled += 1;
            }

            event = self
                .factory
                .add_race_to_event(event.id, &race)
                .map_err(|e: MissingReferenceError| invalid(e.to_string()))?;
            history.races += 1;
        }

        debug!(event_id = %event.id, name = %event.name, races = event.race_count(), "Loaded event");
        history.events.push(event);
        Ok(())
    }

    /// Horse by name, created on first sight
    fn horse(&mut self, name: &str) -> Arc<Horse> {
        if let Some(horse) = self.horses.get(name) {
            return Arc::clone(horse);
        }
        let horse = self.factory.horse(name);
        self.horses.insert(name.to_string(), Arc::clone(&horse));
        horse
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}
