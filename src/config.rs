//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::ExpiryMode;
use crate::error::{ConfigError, Result};

/// Environment variable for the cache interval in milliseconds.
pub const INTERVAL_VAR: &str = "POKECACHE_INTERVAL_MS";
/// Environment variable for the sweep tick in milliseconds.
pub const SWEEP_INTERVAL_VAR: &str = "POKECACHE_SWEEP_INTERVAL_MS";
/// Environment variable for the expiry mode.
pub const EXPIRY_MODE_VAR: &str = "POKECACHE_EXPIRY_MODE";

/// Ten minutes.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Age after which entries become eligible for removal
    pub interval: Duration,
    /// Tick of the background sweep
    pub sweep_interval: Duration,
    /// Whether lookups enforce `interval` themselves
    pub expiry_mode: ExpiryMode,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `POKECACHE_INTERVAL_MS` - Entry lifetime (default: 600000)
    /// - `POKECACHE_SWEEP_INTERVAL_MS` - Sweep tick (default: the entry lifetime)
    /// - `POKECACHE_EXPIRY_MODE` - `best-effort` or `strict` (default: best-effort)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let interval =
            parse_interval(INTERVAL_VAR, lookup(INTERVAL_VAR))?.unwrap_or(DEFAULT_INTERVAL);
        let sweep_interval =
            parse_interval(SWEEP_INTERVAL_VAR, lookup(SWEEP_INTERVAL_VAR))?.unwrap_or(interval);
        let expiry_mode = match lookup(EXPIRY_MODE_VAR) {
            Some(value) => parse_mode(&value)?,
            None => ExpiryMode::default(),
        };

        Ok(Self {
            interval,
            sweep_interval,
            expiry_mode,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            sweep_interval: DEFAULT_INTERVAL,
            expiry_mode: ExpiryMode::BestEffort,
        }
    }
}

fn parse_interval(var: &str, value: Option<String>) -> Result<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var: var.to_string(),
        value: value.clone(),
    })?;

    if millis == 0 {
        return Err(ConfigError::ZeroInterval(var.to_string()));
    }
    Ok(Some(Duration::from_millis(millis)))
}

fn parse_mode(value: &str) -> Result<ExpiryMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "best-effort" | "best_effort" => Ok(ExpiryMode::BestEffort),
        "strict" => Ok(ExpiryMode::Strict),
        _ => Err(ConfigError::InvalidMode(value.to_string())),
    }
}
