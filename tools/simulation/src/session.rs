//! Live session
//!
//! Wires the book together the way the `live-bet` loop runs it: load
//! history, tally winners, create users and the future meeting, then
//! alternate simulated bets with risk recalculation.

use chrono::NaiveDate;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use risk_engine::context::{BookContext, Factory};
use risk_engine::engine::{CycleSummary, EngineError, RiskEngine};
use risk_engine::identity::LocalIdGenerator;
use risk_engine::store::SharedStore;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use types::errors::MissingReferenceError;
use types::ids::{HorseId, RaceId, UserId};

use crate::analysis::WinnerTally;
use crate::book::{self, FutureEvent};
use crate::bots::punter::Punter;
use crate::config::{ConfigError, SimulationConfig};
use crate::loader::{HistoricalLoader, History, LoaderError};
use crate::odds::OddsGenerator;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Missing(#[from] MissingReferenceError),
}

/// A running simulated book
pub struct LiveSession {
    factory: Factory,
    engine: RiskEngine,
    punter: Punter,
    odds: OddsGenerator,
    rng: ChaCha8Rng,
    users: Vec<UserId>,
    meeting: FutureEvent,
    history: History,
    winners: WinnerTally,
    winner_store: SharedStore<HorseId, u64>,
    reprice_ratio: f64,
    bets_per_tick: usize,
    today: NaiveDate,
}

impl LiveSession {
    /// Build the book for a session starting on `today`
    pub fn setup(config: &SimulationConfig, today: NaiveDate) -> Result<Self, SessionError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let factory = Factory::new(
            Arc::new(LocalIdGenerator::new()),
            BookContext::new(config.store),
        );

        let history = match &config.history {
            Some(path) => HistoricalLoader::new(&factory).load_file(path)?,
            None => History::default(),
        };
        let winners = WinnerTally::first_race_winners(factory.book(), &history.events);
        let winner_store: SharedStore<HorseId, u64> = config.store.open();
        winners.save(winner_store.as_ref());

        let users = book::create_users(&factory, config.users);

        let mut odds = OddsGenerator::new(rng.gen());
        let pool = book::runner_pool(&factory, &winners.ranked(), config.meeting.pool_size);
        let meeting_date = config.engine.target_day.resolve(today);
        let meeting = book::create_future_event(
            &factory,
            &config.meeting,
            meeting_date,
            &pool,
            &mut odds,
            &mut rng,
        )?;

        let engine = RiskEngine::with_config(factory.book().clone(), config.engine.clone())?;
        let punter = Punter::new(config.punter.clone(), rng.gen());

        info!(
            seed = ?config.seed,
            users = users.len(),
            historical_events = history.events.len(),
            past_winners = winners.len(),
            meeting = %meeting.event.name,
            date = %meeting_date,
            "Live session ready"
        );

        Ok(Self {
            factory,
            engine,
            punter,
            odds,
            rng,
            users,
            meeting,
            history,
            winners,
            winner_store,
            reprice_ratio: config.reprice_ratio,
            bets_per_tick: config.bets_per_tick,
            today,
        })
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    pub fn meeting(&self) -> &FutureEvent {
        &self.meeting
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn winners(&self) -> &WinnerTally {
        &self.winners
    }

    pub fn winner_store(&self) -> &SharedStore<HorseId, u64> {
        &self.winner_store
    }

    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Place one tick of simulated bets, occasionally repricing a race.
    ///
    /// Returns the number of bets accepted.
    pub fn add_simulated_bets(&mut self) -> usize {
        if self.rng.gen_bool(self.reprice_ratio) {
            self.reprice_random_race();
        }
        self.punter.tick(
            &self.factory,
            &self.users,
            &self.meeting.races,
            self.bets_per_tick,
        )
    }

    fn reprice_random_race(&mut self) {
        let index = self.rng.gen_range(0..self.meeting.races.len().max(1));
        let Some(race) = self.meeting.races.get(index) else {
            return;
        };
        let drifted = self.odds.drift(&race.current_version().odds);
        match self.factory.reprice(race.id(), drifted) {
            Ok(version) => info!(race_id = %race.id(), version = version.version, "Repriced race"),
            Err(e) => warn!(race_id = %race.id(), error = %e, "Reprice failed"),
        }
    }

    /// Recalculate every report for the meeting date
    pub fn recalculate(&self, cancel: &AtomicBool) -> Result<CycleSummary, EngineError> {
        self.engine.recalculate_until(self.today, cancel)
    }

    /// Latest report per race of the meeting, in running order
    pub fn summary(&self) -> SessionSummary {
        let races = self
            .meeting
            .races
            .iter()
            .map(|race| {
                let current = race.current_version();
                let report = self.engine.report(race.id());
                RaceLine {
                    race_id: race.id(),
                    off: current.race_time.format("%H:%M").to_string(),
                    version: current.version,
                    bets: report.as_ref().map_or(0, |r| r.bet_count),
                    worst_case: report
                        .as_ref()
                        .and_then(|r| r.worst_case())
                        .map(|(horse, exposure)| (self.horse_name(horse), exposure)),
                    stale: report.as_ref().is_some_and(|r| r.stale),
                    reported: report.is_some(),
                }
            })
            .collect();

        SessionSummary {
            meeting: self.meeting.event.name.clone(),
            date: self.meeting.event.date,
            cycles: self.engine.cycles_started(),
            bets_placed: self.punter.bets_placed,
            bets_rejected: self.punter.bets_rejected,
            races,
        }
    }

    fn horse_name(&self, horse: HorseId) -> String {
        self.factory
            .book()
            .horse(horse)
            .map(|h| h.name.clone())
            .unwrap_or_else(|_| horse.to_string())
    }
}

/// One race in the session summary
#[derive(Debug, Clone, Serialize)]
pub struct RaceLine {
    pub race_id: RaceId,
    pub off: String,
    pub version: u32,
    pub bets: usize,
    /// Runner with the largest book loss and that loss
    pub worst_case: Option<(String, Decimal)>,
    pub stale: bool,
    pub reported: bool,
}

/// End-of-session report
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub meeting: String,
    pub date: NaiveDate,
    pub cycles: u64,
    pub bets_placed: usize,
    pub bets_rejected: usize,
    pub races: Vec<RaceLine>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} on {}", self.meeting, self.date)?;
        writeln!(
            f,
            "{} cycles, {} bets placed, {} rejected",
            self.cycles, self.bets_placed, self.bets_rejected
        )?;
        writeln!(f, "{:<6} {:>8} {:>4} {:>6}  worst case", "off", "race", "ver", "bets")?;
        for line in &self.races {
            let worst = match (&line.worst_case, line.reported) {
                (_, false) => "no report".to_string(),
                (Some((horse, exposure)), true) => format!("{} {}", horse, exposure),
                (None, true) => "-".to_string(),
            };
            let flag = if line.stale { " (stale)" } else { "" };
            writeln!(
                f,
                "{:<6} {:>8} {:>4} {:>6}  {}{}",
                line.off,
                line.race_id.to_string(),
                line.version,
                line.bets,
                worst,
                flag
            )?;
        }
        Ok(())
    }
}
