//! Application settings loaded from config.toml
//!
//! The `[recurring]` table controls how often sessions re-run the recurring processor,
//! how far a single run may catch up per template, and which users get a session as
//! soon as the bot starts. Every key is optional; a missing file yields the defaults.

use crate::{
    core::{processor::DEFAULT_CATCH_UP_LIMIT, scheduler::DEFAULT_INTERVAL},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Recurring processor settings
    #[serde(default)]
    pub recurring: RecurringConfig,
}

/// Settings for the recurring processor and its sessions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecurringConfig {
    /// Minutes between periodic runs of an active session
    pub interval_minutes: u64,
    /// Most occurrences one template may post in a single run
    pub max_occurrences_per_template: usize,
    /// Users whose session starts with the bot
    pub auto_start_users: Vec<String>,
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL.as_secs() / 60,
            max_occurrences_per_template: DEFAULT_CATCH_UP_LIMIT,
            auto_start_users: Vec::new(),
        }
    }
}

impl RecurringConfig {
    /// Interval between periodic runs.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// Rejects values the processor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 {
            return Err(Error::Config {
                message: "recurring.interval_minutes must be at least 1".to_string(),
            });
        }
        if self.max_occurrences_per_template == 0 {
            return Err(Error::Config {
                message: "recurring.max_occurrences_per_template must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses and validates configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.recurring.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    parse_config(&contents)
}

/// Loads configuration from `path`, falling back to defaults when the file is absent.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        load_config(path_ref)
    } else {
        info!("No config file at {:?}, using defaults", path_ref);
        Ok(Config::default())
    }
}
