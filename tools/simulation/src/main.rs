//! `live-bet`: run the simulated book until Ctrl-C
//!
//! Usage: `live-bet [config.toml]`

use anyhow::{Context, Result};
use chrono::Local;
use simulation::config::SimulationConfig;
use simulation::session::LiveSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use risk_engine::engine::EngineError;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => SimulationConfig::default(),
    };
    config.logging.init();

    let mut session = LiveSession::setup(&config, Local::now().date_naive())
        .context("setting up live session")?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                cancel.store(true, Ordering::Release);
            }
        });
    }

    let mut ticker = tokio::time::interval(config.cycle_interval());
    while !cancel.load(Ordering::Acquire) {
        ticker.tick().await;

        let placed = session.add_simulated_bets();
        let result = tokio::task::block_in_place(|| session.recalculate(&cancel));

        match result {
            Ok(summary) => info!(
                cycle = summary.cycle,
                placed,
                published = summary.races_published,
                stale = summary.stale_races.len(),
                "Cycle done"
            ),
            Err(EngineError::Cancelled { cycle, stage }) => {
                info!(cycle, stage = ?stage, "Cycle abandoned");
                break;
            }
            Err(e) => {
                error!(error = %e, "Cycle failed");
                return Err(e.into());
            }
        }
    }

    println!("{}", session.summary());
    Ok(())
}
