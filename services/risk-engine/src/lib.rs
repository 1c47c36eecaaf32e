//! Risk Engine Service
//!
//! Recalculates the book's liability on every race of a target day:
//! - Pluggable object stores for horses, races, events, users and reports
//! - Snapshot-consistent selection of target-day bets
//! - Parallel race grouping and per-runner exposure aggregation
//! - Report publication with stale marking on per-race failure

pub mod store;
pub mod identity;
pub mod context;
pub mod snapshot;
pub mod selection;
pub mod grouping;
pub mod liability;
pub mod report;
pub mod events;
pub mod engine;

pub use context::{BookContext, Factory};
pub use engine::{RiskEngine, RiskEngineConfig, TargetDay};
pub use store::StoreBackend;
