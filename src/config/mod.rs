//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::util::time::{tick_interval, TICK_INTERVAL_MS};

/// Runtime configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Period between engine ticks
    pub tick_interval: Duration,
    /// Fixed seed for reproducible runs; entropy when unset
    pub rng_seed: Option<u64>,
    /// Bots the demo binary registers before starting a battle
    pub demo_players: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let tick_ms: u64 = parse_or(&lookup, "TICK_INTERVAL_MS", TICK_INTERVAL_MS)?;
        if tick_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "TICK_INTERVAL_MS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            tick_interval: Duration::from_millis(tick_ms),
            rng_seed: lookup("RNG_SEED")
                .map(|raw| parse_value("RNG_SEED", raw))
                .transpose()?,
            demo_players: parse_or(&lookup, "DEMO_PLAYERS", 4)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tick_interval: tick_interval(),
            rng_seed: None,
            demo_players: 4,
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => parse_value(key, raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
