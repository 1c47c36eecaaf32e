//! Identity generation
//!
//! Hands out fresh numeric identifiers per entity kind. The local generator
//! keeps its counters in-process; the shared generator keeps them in a
//! sharded counter map that every clone of the generator sees, so several
//! producers can mint ids from one sequence.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Entity kind an identifier is minted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Horse,
    Race,
    Event,
    User,
    Bet,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Horse,
        Namespace::Race,
        Namespace::Event,
        Namespace::User,
        Namespace::Bet,
    ];

    fn slot(self) -> usize {
        match self {
            Namespace::Horse => 0,
            Namespace::Race => 1,
            Namespace::Event => 2,
            Namespace::User => 3,
            Namespace::Bet => 4,
        }
    }
}

/// Source of unique identifiers. Ids start at 1 and are never reused
/// within a namespace.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, namespace: Namespace) -> u64;
}

/// In-process atomic counters
#[derive(Debug, Default)]
pub struct LocalIdGenerator {
    counters: [AtomicU64; 5],
}

impl LocalIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for LocalIdGenerator {
    fn next_id(&self, namespace: Namespace) -> u64 {
        self.counters[namespace.slot()].fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Counters held in a shared sharded map
#[derive(Debug, Clone, Default)]
pub struct SharedIdGenerator {
    counters: Arc<DashMap<Namespace, u64>>,
}

impl SharedIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last id handed out in a namespace (0 if none)
    pub fn high_water(&self, namespace: Namespace) -> u64 {
        self.counters.get(&namespace).map(|c| *c).unwrap_or(0)
    }
}

impl IdGenerator for SharedIdGenerator {
    fn next_id(&self, namespace: Namespace) -> u64 {
        let mut counter = self.counters.entry(namespace).or_insert(0);
        *counter += 1;
        *counter
    }
}
