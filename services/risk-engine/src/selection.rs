//! Date-scoped bet selection
//!
//! Picks the bets that have at least one leg on a race run on the target
//! date. Legs are scanned in placement order; in [`ScanMode::EarlyExit`]
//! the scan of a bet stops at the first leg whose race date is before the
//! target, relying on legs being placed in running order.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use types::bet::Bet;
use types::errors::MissingReferenceError;
use types::ids::BetId;
use types::user::User;

use crate::snapshot::RaceSnapshot;

/// How far a bet's legs are scanned for a target-date match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Stop scanning a bet at the first leg dated before the target
    #[default]
    EarlyExit,
    /// Examine every leg of every bet
    Exhaustive,
}

/// Outcome of scanning one bet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetScan {
    pub on_target: bool,
    /// Legs whose race is not in the snapshot
    pub missing: Vec<MissingReferenceError>,
}

/// Scan a bet's legs for one on the target date.
///
/// Legs whose race cannot be found are recorded and skipped.
pub fn scan_bet(bet: &Bet, target: NaiveDate, races: &RaceSnapshot, mode: ScanMode) -> BetScan {
    let mut missing = Vec::new();

    for leg in bet.legs() {
        let Some(date) = races.race_date(leg.race_id) else {
            missing.push(MissingReferenceError::Race {
                race_id: leg.race_id,
            });
            continue;
        };

        if date == target {
            return BetScan {
                on_target: true,
                missing,
            };
        }
        if date < target && mode == ScanMode::EarlyExit {
            break;
        }
    }

    BetScan {
        on_target: false,
        missing,
    }
}

/// Does any of the user's bets touch the target date?
pub fn user_bets_on(user: &User, target: NaiveDate, races: &RaceSnapshot, mode: ScanMode) -> bool {
    user.known_bets()
        .iter()
        .any(|b| scan_bet(b, target, races, mode).on_target)
}

/// Bets relevant to the target date, each listed once
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub bets: Vec<Arc<Bet>>,
    pub missing: Vec<(BetId, MissingReferenceError)>,
}

/// Select target-date bets across a user population.
///
/// Users are scanned in parallel; the result keeps user order and each
/// user's bet order.
pub fn select_bets(
    users: &[Arc<User>],
    target: NaiveDate,
    races: &RaceSnapshot,
    mode: ScanMode,
) -> Selection {
    let per_user: Vec<Selection> = users
        .par_iter()
        .map(|user| {
            let mut selection = Selection::default();
            for bet in user.known_bets() {
                let scan = scan_bet(bet, target, races, mode);
                if scan.on_target {
                    selection.bets.push(Arc::clone(bet));
                }
                selection
                    .missing
                    .extend(scan.missing.into_iter().map(|m| (bet.id, m)));
            }
            selection
        })
        .collect();

    per_user
        .into_iter()
        .fold(Selection::default(), |mut acc, s| {
            acc.bets.extend(s.bets);
            acc.missing.extend(s.missing);
            acc
        })
}
