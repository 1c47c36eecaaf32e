//! Stress test: 100,000 bets
//!
//! Places 100k simulated bets across 1,000 users on one meeting, runs a
//! recalculation, asserts every bet is accounted for and reports timing.

use chrono::NaiveDate;
use simulation::bots::punter::PunterConfig;
use simulation::config::SimulationConfig;
use simulation::session::LiveSession;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

#[test]
#[ignore] // Run with: cargo test --test stress_bets -- --ignored
fn test_100k_bets() {
    let config = SimulationConfig {
        seed: Some(42),
        users: 1_000,
        bets_per_tick: 10_000,
        reprice_ratio: 0.0,
        punter: PunterConfig {
            accumulator_ratio: 0.0,
            ..PunterConfig::default()
        },
        ..SimulationConfig::default()
    };
    let mut session =
        LiveSession::setup(&config, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()).unwrap();

    let start = Instant::now();
    let mut placed = 0;
    for _ in 0..10 {
        placed += session.add_simulated_bets();
    }
    let placing = start.elapsed();
    assert_eq!(placed, 100_000);

    let start = Instant::now();
    let summary = session.recalculate(&AtomicBool::new(false)).unwrap();
    let recalculating = start.elapsed();

    assert_eq!(summary.bets_selected, 100_000);
    assert_eq!(summary.races_published, 18);
    let counted: usize = session.engine().sink().all().iter().map(|r| r.bet_count).sum();
    assert_eq!(counted, 100_000);

    println!(
        "placed 100k bets in {:?}, recalculated in {:?} ({} users selected)",
        placing, recalculating, summary.users_selected
    );
}
