//! Book context and entity factory
//!
//! [`BookContext`] bundles the stores the book is made of and is handed to
//! everything that needs them; nothing resolves stores from global state.
//! [`Factory`] creates entities with fresh identifiers and registers them
//! in the context.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use types::bet::{Bet, BetBuilder};
use types::errors::{MissingReferenceError, RaceError};
use types::event::Event;
use types::horse::Horse;
use types::ids::{BetId, EventId, HorseId, RaceId, UserId};
use types::numeric::Odds;
use types::race::{Race, RaceVersion};
use types::risk::RiskReport;
use types::user::User;

use crate::identity::{IdGenerator, Namespace};
use crate::store::{SharedStore, StoreBackend};

/// The shared stores of the book
#[derive(Clone)]
pub struct BookContext {
    pub horses: SharedStore<HorseId, Arc<Horse>>,
    pub races: SharedStore<RaceId, Arc<Race>>,
    pub events: SharedStore<EventId, Arc<Event>>,
    pub users: SharedStore<UserId, Arc<User>>,
    pub reports: SharedStore<RaceId, Arc<RiskReport>>,
}

impl BookContext {
    /// Open empty stores on the chosen backend
    pub fn new(backend: StoreBackend) -> Self {
        Self {
            horses: backend.open(),
            races: backend.open(),
            events: backend.open(),
            users: backend.open(),
            reports: backend.open(),
        }
    }

    pub fn race(&self, race_id: RaceId) -> Result<Arc<Race>, MissingReferenceError> {
        self.races
            .get(&race_id)
            .ok_or(MissingReferenceError::Race { race_id })
    }

    pub fn horse(&self, horse_id: HorseId) -> Result<Arc<Horse>, MissingReferenceError> {
        self.horses
            .get(&horse_id)
            .ok_or(MissingReferenceError::Horse { horse_id })
    }

    pub fn user(&self, user_id: UserId) -> Result<Arc<User>, MissingReferenceError> {
        self.users
            .get(&user_id)
            .ok_or(MissingReferenceError::User { user_id })
    }
}

impl std::fmt::Debug for BookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookContext")
            .field("horses", &self.horses.len())
            .field("races", &self.races.len())
            .field("events", &self.events.len())
            .field("users", &self.users.len())
            .field("reports", &self.reports.len())
            .finish()
    }
}

/// Creates book entities with fresh ids and stores them
#[derive(Clone)]
pub struct Factory {
    ids: Arc<dyn IdGenerator>,
    book: BookContext,
}

impl Factory {
    pub fn new(ids: Arc<dyn IdGenerator>, book: BookContext) -> Self {
        Self { ids, book }
    }

    pub fn book(&self) -> &BookContext {
        &self.book
    }

    pub fn horse(&self, name: impl Into<String>) -> Arc<Horse> {
        let id = HorseId::new(self.ids.next_id(Namespace::Horse));
        let horse = Arc::new(Horse::new(id, name));
        self.book.horses.put(id, Arc::clone(&horse));
        horse
    }

    /// Create a race whose first version is stamped now
    pub fn race(&self, odds: BTreeMap<HorseId, Odds>, race_time: NaiveDateTime) -> Arc<Race> {
        self.race_created_at(odds, race_time, Utc::now())
    }

    pub fn race_created_at(
        &self,
        odds: BTreeMap<HorseId, Odds>,
        race_time: NaiveDateTime,
        created_at: DateTime<Utc>,
    ) -> Arc<Race> {
        let id = RaceId::new(self.ids.next_id(Namespace::Race));
        let race = Arc::new(Race::new(id, odds, race_time, created_at));
        self.book.races.put(id, Arc::clone(&race));
        race
    }

    /// Append new odds to a stored race
    pub fn reprice(
        &self,
        race_id: RaceId,
        odds: BTreeMap<HorseId, Odds>,
    ) -> Result<Arc<RaceVersion>, RepriceError> {
        let race = self.book.race(race_id)?;
        let race_time = race.current_version().race_time;
        Ok(race.append_version(odds, race_time, Utc::now())?)
    }

    pub fn event(&self, name: impl Into<String>, date: NaiveDate) -> Arc<Event> {
        let id = EventId::new(self.ids.next_id(Namespace::Event));
        let event = Arc::new(Event::new(id, name, date));
        self.book.events.put(id, Arc::clone(&event));
        event
    }

    /// Put a stored race on an event's card
    pub fn add_race_to_event(
        &self,
        event_id: EventId,
        race: &Race,
    ) -> Result<Arc<Event>, MissingReferenceError> {
        let race_id = race.id();
        let race_time = race.current_version().race_time;
        self.book
            .events
            .update(&event_id, &|event| {
                let mut next = event.as_ref().clone();
                next.add_race(race_id, race_time);
                Arc::new(next)
            })
            .ok_or(MissingReferenceError::Event { event_id })
    }

    pub fn user(&self, name: impl Into<String>) -> Arc<User> {
        let id = UserId::new(self.ids.next_id(Namespace::User));
        let user = Arc::new(User::new(id, name));
        self.book.users.put(id, Arc::clone(&user));
        user
    }

    /// Start a bet for a user with a fresh bet id
    pub fn bet<'r>(&self, user_id: UserId) -> BetBuilder<'r> {
        Bet::builder(BetId::new(self.ids.next_id(Namespace::Bet)), user_id)
    }

    /// Record a built bet against its user.
    ///
    /// The stored user is replaced with a copy holding the new bet, so
    /// readers holding the previous value keep a consistent snapshot.
    pub fn place(&self, bet: Bet) -> Result<Arc<Bet>, MissingReferenceError> {
        let user_id = bet.user_id;
        let bet = Arc::new(bet);
        self.book
            .users
            .update(&user_id, &|user| Arc::new(user.with_bet(Arc::clone(&bet))))
            .ok_or(MissingReferenceError::User { user_id })?;
        Ok(bet)
    }
}

/// Failure to append odds to a stored race
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepriceError {
    #[error(transparent)]
    Missing(#[from] MissingReferenceError),

    #[error(transparent)]
    Race(#[from] RaceError),
}
