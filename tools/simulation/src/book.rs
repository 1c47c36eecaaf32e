//! Scenario setup: users, runner pool and the future meeting

use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use risk_engine::context::Factory;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use types::errors::MissingReferenceError;
use types::event::Event;
use types::ids::{HorseId, UserId};
use types::race::Race;

use crate::config::MeetingConfig;
use crate::odds::OddsGenerator;

/// The simulated meeting bets are placed on
#[derive(Debug, Clone)]
pub struct FutureEvent {
    pub event: Arc<Event>,
    /// Races in running order
    pub races: Vec<Arc<Race>>,
}

/// Create `count` users named `punter-1`, `punter-2`, ...
pub fn create_users(factory: &Factory, count: usize) -> Vec<UserId> {
    (1..=count)
        .map(|i| factory.user(format!("punter-{}", i)).id)
        .collect()
}

/// Pick `size` horses for the meeting.
///
/// Preferred horses (usually past winners) come first, then other horses
/// already in the book; any shortfall is filled with new horses.
pub fn runner_pool(factory: &Factory, preferred: &[HorseId], size: usize) -> Vec<HorseId> {
    let mut seen = HashSet::new();
    let mut pool: Vec<HorseId> = preferred
        .iter()
        .copied()
        .filter(|h| seen.insert(*h))
        .take(size)
        .collect();

    if pool.len() < size {
        for horse in factory.book().horses.keys(&|id, _| !seen.contains(id)) {
            if pool.len() == size {
                break;
            }
            pool.push(horse);
        }
    }

    while pool.len() < size {
        let horse = factory.horse(format!("Novice {}", pool.len() + 1));
        pool.push(horse.id);
    }

    pool
}

/// Create the meeting on `date` with its full card.
///
/// Each race draws up to `runners_per_race` runners from the pool and is
/// priced by the odds generator.
pub fn create_future_event<R: Rng>(
    factory: &Factory,
    meeting: &MeetingConfig,
    date: NaiveDate,
    pool: &[HorseId],
    odds: &mut OddsGenerator,
    rng: &mut R,
) -> Result<FutureEvent, MissingReferenceError> {
    let mut race_time = date.and_time(meeting.first_race_time().unwrap_or_default());

    let mut event = factory.event(meeting.name.clone(), date);
    let mut races = Vec::with_capacity(meeting.races);

    for _ in 0..meeting.races {
        let runners: Vec<HorseId> = pool
            .choose_multiple(rng, meeting.runners_per_race)
            .copied()
            .collect();
        let race = factory.race(odds.price(&runners), race_time);
        event = factory.add_race_to_event(event.id, &race)?;
        races.push(race);

        race_time += Duration::minutes(i64::from(meeting.interval_minutes));
    }

    info!(
        event_id = %event.id,
        name = %event.name,
        date = %date,
        races = races.len(),
        "Created future event"
    );

    Ok(FutureEvent { event, races })
}
