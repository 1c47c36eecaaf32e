//! Cycle event definitions
//!
//! Events recorded by each recalculation cycle for monitoring and audit:
//! what was published, what went stale and which bets were left out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::ids::{BetId, RaceId};
use uuid::Uuid;

/// Event emitted by a recalculation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleEvent {
    pub event_id: Uuid,
    pub cycle: u64,
    pub event_type: CycleEventType,
    pub timestamp: DateTime<Utc>,
}

/// Cycle event classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleEventType {
    /// A race's report was replaced
    ReportPublished { race_id: RaceId, runners: usize, bets: usize },
    /// A race failed to aggregate; its previous report is kept and flagged
    ReportStale { race_id: RaceId, reason: String },
    /// A bet was left out because something it references is missing
    BetExcluded {
        bet_id: Option<BetId>,
        race_id: Option<RaceId>,
        reason: String,
    },
}

impl CycleEvent {
    pub fn new(cycle: u64, event_type: CycleEventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            cycle,
            event_type,
            timestamp,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.event_type, CycleEventType::ReportStale { .. })
    }
}
