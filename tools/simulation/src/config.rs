//! Simulation configuration
//!
//! Loaded from a TOML file; every field has a default so the live loop
//! runs without one.

use crate::bots::punter::PunterConfig;
use risk_engine::store::StoreBackend;
use risk_engine::RiskEngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Install the global tracing subscriber. `RUST_LOG` overrides `level`.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        if self.format == "json" {
            fmt().json().with_env_filter(filter).init();
        } else {
            fmt().with_env_filter(filter).init();
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

/// Shape of the simulated future meeting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    pub name: String,
    /// Races on the card
    pub races: usize,
    /// First race off time, "HH:MM"
    pub first_race: String,
    /// Minutes between races
    pub interval_minutes: u32,
    /// Size of the horse pool the card draws from
    pub pool_size: usize,
    /// Maximum runners per race
    pub runners_per_race: usize,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            name: "Racing from Epsom".into(),
            races: 18,
            first_race: "11:00".into(),
            interval_minutes: 10,
            pool_size: 10,
            runners_per_race: 4,
        }
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// RNG seed; entropy when absent
    pub seed: Option<u64>,
    /// Line-delimited JSON file of past meetings
    pub history: Option<PathBuf>,
    /// Number of simulated users
    pub users: usize,
    /// Bets placed before each recalculation
    pub bets_per_tick: usize,
    /// Pause between cycles, in milliseconds
    pub cycle_interval_ms: u64,
    /// Chance that a cycle reprices one race
    pub reprice_ratio: f64,
    /// Store backend for every book store
    pub store: StoreBackend,
    pub meeting: MeetingConfig,
    pub punter: PunterConfig,
    pub engine: RiskEngineConfig,
    pub logging: LoggingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            history: None,
            users: 100,
            bets_per_tick: 100,
            cycle_interval_ms: 1000,
            reprice_ratio: 0.2,
            store: StoreBackend::default(),
            meeting: MeetingConfig::default(),
            punter: PunterConfig::default(),
            engine: RiskEngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Read and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate TOML text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.reprice_ratio) {
            return Err(ConfigError::Invalid {
                field: "reprice_ratio",
                reason: format!("must be within 0..=1, got {}", self.reprice_ratio),
            });
        }
        if self.meeting.runners_per_race == 0 {
            return Err(ConfigError::Invalid {
                field: "meeting.runners_per_race",
                reason: "must be at least 1".into(),
            });
        }
        if self.cycle_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "cycle_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Invalid {
                field: "logging.format",
                reason: format!("expected one of {:?}, got {:?}", LOG_FORMATS, self.logging.format),
            });
        }
        if self.meeting.first_race_time().is_none() {
            return Err(ConfigError::Invalid {
                field: "meeting.first_race",
                reason: format!("expected HH:MM, got {:?}", self.meeting.first_race),
            });
        }
        self.punter.validate()
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }
}

impl MeetingConfig {
    pub fn first_race_time(&self) -> Option<chrono::NaiveTime> {
        chrono::NaiveTime::parse_from_str(&self.first_race, "%H:%M").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_engine::selection::ScanMode;
    use risk_engine::TargetDay;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config.users, 100);
        assert_eq!(config.meeting.races, 18);
        assert_eq!(config.meeting.runners_per_race, 4);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.store, StoreBackend::Local);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_full_config() {
        let text = r#"
            seed = 42
            history = "/tmp/historical_races.json"
            users = 5
            bets_per_tick = 20
            cycle_interval_ms = 250
            store = "partitioned"

            [meeting]
            name = "Racing from Ascot"
            first_race = "13:30"

            [punter]
            accumulator_ratio = 0.5

            [engine]
            scan_mode = "exhaustive"
            workers = 2

            [engine.target_day]
            next = "Sun"

            [logging]
            level = "debug"
            format = "json"
        "#;
        let config = SimulationConfig::parse(text).unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.users, 5);
        assert_eq!(config.cycle_interval(), Duration::from_millis(250));
        assert_eq!(config.store, StoreBackend::Partitioned);
        assert_eq!(config.meeting.name, "Racing from Ascot");
        assert_eq!(config.meeting.races, 18);
        assert_eq!(config.punter.accumulator_ratio, 0.5);
        assert_eq!(config.engine.scan_mode, ScanMode::Exhaustive);
        assert_eq!(config.engine.target_day, TargetDay::Next(chrono::Weekday::Sun));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            SimulationConfig::parse("reprice_ratio = 1.5"),
            Err(ConfigError::Invalid { field: "reprice_ratio", .. })
        ));
        assert!(matches!(
            SimulationConfig::parse("[meeting]\nfirst_race = \"noon\""),
            Err(ConfigError::Invalid { field: "meeting.first_race", .. })
        ));
        assert!(matches!(
            SimulationConfig::parse("cycle_interval_ms = 0"),
            Err(ConfigError::Invalid { field: "cycle_interval_ms", .. })
        ));
        assert!(matches!(
            SimulationConfig::parse("[logging]\nformat = \"jsonl\""),
            Err(ConfigError::Invalid { field: "logging.format", .. })
        ));
        assert!(matches!(
            SimulationConfig::parse("users = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
