//! Simulation & Live Book Framework
//!
//! Drives the risk engine with a simulated book: historical meetings, a
//! future meeting to bet on, seeded punters and the live recalculation loop.
//!
//! # Modules
//! - `config` — TOML simulation config and logging setup
//! - `odds` — Seeded odds pricing and drift
//! - `bots` — Random punter bot
//! - `loader` — Line-delimited JSON historical meeting loader
//! - `analysis` — First-race winner tally and multiple winners
//! - `book` — Users, runner pool and future meeting setup
//! - `session` — Live session driving bets and recalculation

pub mod config;
pub mod odds;
pub mod bots;
pub mod loader;
pub mod analysis;
pub mod book;
pub mod session;

/// Crate version constant
pub const VERSION: &str = "1.0.0";
