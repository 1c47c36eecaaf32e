//! Risk Engine — orchestrator
//!
//! Runs one recalculation cycle over the book:
//! 1. Selection: snapshot users, races and horses, pick users and bets with
//!    a leg on the target date
//! 2. Grouping: fan bets out to the target-date races they touch
//! 3. Aggregation: per-race, per-runner net exposure
//! 4. Publication: replace each race's report, or flag it stale on failure
//!
//! Stages 1–3 run on the engine's worker pool. A cycle can be abandoned
//! between stages; nothing is published until aggregation is complete.

use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use types::ids::RaceId;
use types::risk::RiskReport;

use crate::context::BookContext;
use crate::events::{CycleEvent, CycleEventType};
use crate::grouping::{self, BetSet};
use crate::liability::{self, AggregationError, RaceLiability};
use crate::report::RiskReportSink;
use crate::selection::{self, ScanMode};
use crate::snapshot::RaceSnapshot;

/// Which race date a cycle reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDay {
    /// Next occurrence of the weekday, strictly after today
    Next(Weekday),
    /// A fixed date
    On(NaiveDate),
}

impl TargetDay {
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            TargetDay::Next(weekday) => next_weekday(today, *weekday),
            TargetDay::On(date) => *date,
        }
    }
}

/// First date after `today` falling on `weekday`
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let from = today.weekday().num_days_from_monday();
    let to = weekday.num_days_from_monday();
    let ahead = match (to + 7 - from) % 7 {
        0 => 7,
        n => n,
    };
    today + Days::new(u64::from(ahead))
}

/// Risk engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskEngineConfig {
    /// Race date each cycle reports on
    pub target_day: TargetDay,
    /// Leg scan policy during selection
    pub scan_mode: ScanMode,
    /// Worker threads for the cycle pipeline (0 = one per core)
    pub workers: usize,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            target_day: TargetDay::Next(Weekday::Sat),
            scan_mode: ScanMode::EarlyExit,
            workers: 0,
        }
    }
}

/// Pipeline stage, used to report where a cycle was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Selection,
    Grouping,
    Aggregation,
    Publication,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Cycle {cycle} cancelled before {stage:?}")]
    Cancelled { cycle: u64, stage: Stage },
}

/// Outcome of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub cycle: u64,
    pub target_date: NaiveDate,
    pub users_selected: usize,
    pub bets_selected: usize,
    pub races_published: usize,
    /// Races whose previous report was kept and flagged stale
    pub stale_races: Vec<RaceId>,
    /// Distinct bets left out of aggregation for missing references
    pub bets_excluded: usize,
    pub events: Vec<CycleEvent>,
    pub elapsed: Duration,
}

/// Risk engine service
pub struct RiskEngine {
    book: BookContext,
    sink: RiskReportSink,
    config: RiskEngineConfig,
    pool: rayon::ThreadPool,
    cycles: AtomicU64,
}

impl RiskEngine {
    /// Create a new risk engine with default configuration
    pub fn new(book: BookContext) -> Result<Self, EngineError> {
        Self::with_config(book, RiskEngineConfig::default())
    }

    /// Create a new risk engine with custom configuration
    pub fn with_config(book: BookContext, config: RiskEngineConfig) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("risk-worker-{}", i))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;

        info!(
            workers = pool.current_num_threads(),
            scan_mode = ?config.scan_mode,
            target_day = ?config.target_day,
            "RiskEngine initialized"
        );

        Ok(Self {
            sink: RiskReportSink::new(Arc::clone(&book.reports)),
            book,
            config,
            pool,
            cycles: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &RiskEngineConfig {
        &self.config
    }

    pub fn sink(&self) -> &RiskReportSink {
        &self.sink
    }

    /// Latest report for a race
    pub fn report(&self, race_id: RaceId) -> Option<Arc<RiskReport>> {
        self.sink.latest(race_id)
    }

    /// Number of cycles started so far
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Run one full cycle
    pub fn recalculate(&self, today: NaiveDate) -> Result<CycleSummary, EngineError> {
        self.recalculate_until(today, &AtomicBool::new(false))
    }

    /// Run one cycle, abandoning it between stages once `cancel` is set
    pub fn recalculate_until(
        &self,
        today: NaiveDate,
        cancel: &AtomicBool,
    ) -> Result<CycleSummary, EngineError> {
        self.pool.install(|| self.run_cycle(today, cancel))
    }

    fn run_cycle(&self, today: NaiveDate, cancel: &AtomicBool) -> Result<CycleSummary, EngineError> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        let target = self.config.target_day.resolve(today);
        let mode = self.config.scan_mode;
        let mut events = Vec::new();

        info!(cycle, target = %target, "Starting risk recalculation");

        let checkpoint = |stage: Stage| {
            if cancel.load(Ordering::Acquire) {
                warn!(cycle, stage = ?stage, "Risk recalculation cancelled");
                Err(EngineError::Cancelled { cycle, stage })
            } else {
                Ok(())
            }
        };

        // ── Selection ──
        checkpoint(Stage::Selection)?;
        // Users before races before horses: every bet read can then resolve
        // the races and horses that existed when it was placed.
        let users = self.book.users.all_values();
        let races = RaceSnapshot::capture(self.book.races.as_ref(), self.book.horses.as_ref());
        let users: Vec<_> = users
            .into_iter()
            .filter(|user| selection::user_bets_on(user, target, &races, mode))
            .collect();
        let selection = selection::select_bets(&users, target, &races, mode);

        // Legs that cannot be resolved here are reported once, during
        // aggregation of the target-date races they touch.
        for (bet_id, reason) in &selection.missing {
            debug!(cycle, bet_id = %bet_id, reason = %reason, "Unresolvable leg during selection");
        }

        // ── Grouping ──
        checkpoint(Stage::Grouping)?;
        let target_races = races.races_on(target);
        let on_target: HashSet<RaceId> = target_races.iter().map(|(id, _)| *id).collect();
        let associations = grouping::group_by_race(&selection.bets, |r| on_target.contains(&r));

        // ── Aggregation ──
        checkpoint(Stage::Aggregation)?;
        let empty = BetSet::new();
        let results: Vec<(RaceId, Result<RaceLiability, AggregationError>)> = target_races
            .par_iter()
            .map(|(race_id, current)| {
                let bets = associations.get(*race_id).unwrap_or(&empty);
                (*race_id, liability::aggregate_race(*race_id, current, bets, &races))
            })
            .collect();

        // ── Publication ──
        checkpoint(Stage::Publication)?;
        let mut races_published = 0;
        let mut stale_races = Vec::new();
        let mut excluded = BTreeSet::new();

        for (race_id, result) in results {
            match result {
                Ok(liability) => {
                    for (bet_id, reason) in &liability.excluded {
                        // An accumulator can be excluded from several races
                        if !excluded.insert(*bet_id) {
                            continue;
                        }
                        events.push(CycleEvent::new(
                            cycle,
                            CycleEventType::BetExcluded {
                                bet_id: Some(*bet_id),
                                race_id: Some(race_id),
                                reason: reason.to_string(),
                            },
                            Utc::now(),
                        ));
                    }

                    let runners = liability.exposures.len();
                    let bets = liability.bet_count;
                    self.sink.publish(RiskReport::new(
                        race_id,
                        liability.exposures,
                        bets,
                        cycle,
                        liability.race_version,
                        Utc::now(),
                    ));
                    races_published += 1;
                    debug!(cycle, race_id = %race_id, runners, bets, "Published risk report");
                    events.push(CycleEvent::new(
                        cycle,
                        CycleEventType::ReportPublished { race_id, runners, bets },
                        Utc::now(),
                    ));
                }
                Err(err) => {
                    let had_previous = self.sink.mark_stale(race_id).is_some();
                    warn!(
                        cycle,
                        race_id = %race_id,
                        error = %err,
                        had_previous,
                        "Race aggregation failed; keeping previous report"
                    );
                    stale_races.push(race_id);
                    events.push(CycleEvent::new(
                        cycle,
                        CycleEventType::ReportStale {
                            race_id,
                            reason: err.to_string(),
                        },
                        Utc::now(),
                    ));
                }
            }
        }

        let bets_excluded = excluded.len();
        let elapsed = started.elapsed();
        info!(
            cycle,
            target = %target,
            users = users.len(),
            bets = selection.bets.len(),
            published = races_published,
            stale = stale_races.len(),
            excluded = bets_excluded,
            elapsed_ms = elapsed.as_millis() as u64,
            "Risk recalculation complete"
        );

        Ok(CycleSummary {
            cycle,
            target_date: target,
            users_selected: users.len(),
            bets_selected: selection.bets.len(),
            races_published,
            stale_races,
            bets_excluded,
            events,
            elapsed,
        })
    }
}
