//! Historical loader over a file on disk

use chrono::NaiveDate;
use risk_engine::context::{BookContext, Factory};
use risk_engine::identity::LocalIdGenerator;
use risk_engine::store::StoreBackend;
use simulation::analysis::WinnerTally;
use simulation::config::SimulationConfig;
use simulation::loader::{HistoricalLoader, LoaderError};
use simulation::session::LiveSession;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn meeting(date: &str, winner: &str) -> String {
    format!(
        r#"{{"name":"Epsom {date}","date":"{date}","races":[{{"time":"14:00","winner":"{winner}","runners":[{{"name":"Golden Horn","odds":"2.0"}},{{"name":"Jack Hobbs","odds":"4.5"}},{{"name":"Storm the Stars","odds":"9.0"}}]}},{{"time":"14:40","runners":[{{"name":"Jack Hobbs","odds":"3.0"}}]}}]}}"#
    )
}

fn history_file(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_load_file_and_tally() {
    let file = history_file(&[
        meeting("2015-06-06", "Golden Horn"),
        meeting("2016-06-04", "Jack Hobbs"),
        meeting("2017-06-03", "Golden Horn"),
    ]);
    let factory = Factory::new(
        Arc::new(LocalIdGenerator::new()),
        BookContext::new(StoreBackend::Partitioned),
    );

    let mut loader = HistoricalLoader::new(&factory);
    let history = loader.load_file(file.path()).unwrap();

    assert_eq!(history.events.len(), 3);
    assert_eq!(history.races, 6);
    assert_eq!(history.settled, 3);
    assert_eq!(loader.horse_count(), 3);
    assert_eq!(history.events[1].date, NaiveDate::from_ymd_opt(2016, 6, 4).unwrap());

    let tally = WinnerTally::first_race_winners(factory.book(), &history.events);
    let multiple = tally.multiple_winners();
    assert_eq!(multiple.len(), 1);
    let (horse, wins) = multiple.into_iter().next().unwrap();
    assert_eq!(factory.book().horse(horse).unwrap().name, "Golden Horn");
    assert_eq!(wins, 2);
}

#[test]
fn test_missing_file() {
    let factory = Factory::new(
        Arc::new(LocalIdGenerator::new()),
        BookContext::new(StoreBackend::Local),
    );
    let dir = tempfile::tempdir().unwrap();
    let err = HistoricalLoader::new(&factory)
        .load_file(dir.path().join("historical_races.json"))
        .unwrap_err();
    assert!(matches!(err, LoaderError::Open { .. }));
}

#[test]
fn test_session_runners_drawn_from_history() {
    let file = history_file(&[
        meeting("2015-06-06", "Golden Horn"),
        meeting("2016-06-04", "Golden Horn"),
    ]);
    let config = SimulationConfig {
        seed: Some(5),
        history: Some(file.path().to_path_buf()),
        users: 2,
        ..SimulationConfig::default()
    };

    let session =
        LiveSession::setup(&config, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()).unwrap();

    assert_eq!(session.history().events.len(), 2);
    let golden_horn = session.winners().ranked()[0];
    assert_eq!(session.winners().wins(golden_horn), 2);
    assert_eq!(session.winner_store().get(&golden_horn), Some(2));

    // Three historical horses plus seven novices make the pool of ten
    assert_eq!(session.factory().book().horses.len(), 10);
    assert_eq!(session.meeting().races.len(), 18);
}

#[test]
fn test_session_fails_on_malformed_history() {
    let file = history_file(&[meeting("2015-06-06", "Golden Horn"), "not json".to_string()]);
    let config = SimulationConfig {
        history: Some(file.path().to_path_buf()),
        ..SimulationConfig::default()
    };

    let result = LiveSession::setup(&config, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    assert!(result.is_err());
    assert!(result.err().unwrap().to_string().contains("Line 2"));
}
