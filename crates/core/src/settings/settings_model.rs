//! Lifecycle settings model.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_ARCHIVE_AFTER_DAYS, DEFAULT_PROCESSING_BATCH_LIMIT, DEFAULT_SWEEP_INITIAL_DELAY_SECS,
    DEFAULT_SWEEP_INTERVAL_SECS, MAX_ARCHIVE_AFTER_DAYS,
};
use crate::errors::{Error, Result};

const ENV_ARCHIVE_AFTER_DAYS: &str = "PW_ARCHIVE_AFTER_DAYS";
const ENV_PROCESSING_BATCH_LIMIT: &str = "PW_PROCESSING_BATCH_LIMIT";
const ENV_SWEEP_INTERVAL_SECS: &str = "PW_SWEEP_INTERVAL_SECS";
const ENV_SWEEP_INITIAL_DELAY_SECS: &str = "PW_SWEEP_INITIAL_DELAY_SECS";

/// Tunables for the flyer lifecycle and its periodic archive sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleSettings {
    /// Flyers whose validity started more than this many days ago are archived by the sweep.
    pub archive_after_days: i64,
    /// Batch size of `get_default_flyers_for_processing`.
    pub processing_batch_limit: i64,
    pub sweep_interval_secs: u64,
    pub sweep_initial_delay_secs: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            archive_after_days: DEFAULT_ARCHIVE_AFTER_DAYS,
            processing_batch_limit: DEFAULT_PROCESSING_BATCH_LIMIT,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            sweep_initial_delay_secs: DEFAULT_SWEEP_INITIAL_DELAY_SECS,
        }
    }
}

impl LifecycleSettings {
    /// Builds settings from `PW_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let settings = Self {
            archive_after_days: parse_or(
                &lookup,
                ENV_ARCHIVE_AFTER_DAYS,
                defaults.archive_after_days,
            )?,
            processing_batch_limit: parse_or(
                &lookup,
                ENV_PROCESSING_BATCH_LIMIT,
                defaults.processing_batch_limit,
            )?,
            sweep_interval_secs: parse_or(
                &lookup,
                ENV_SWEEP_INTERVAL_SECS,
                defaults.sweep_interval_secs,
            )?,
            sweep_initial_delay_secs: parse_or(
                &lookup,
                ENV_SWEEP_INITIAL_DELAY_SECS,
                defaults.sweep_initial_delay_secs,
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.archive_after_days <= 0 || self.archive_after_days > MAX_ARCHIVE_AFTER_DAYS {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be between 1 and {}, got {}",
                ENV_ARCHIVE_AFTER_DAYS, MAX_ARCHIVE_AFTER_DAYS, self.archive_after_days
            )));
        }
        if self.processing_batch_limit <= 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be positive, got {}",
                ENV_PROCESSING_BATCH_LIMIT, self.processing_batch_limit
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be positive",
                ENV_SWEEP_INTERVAL_SECS
            )));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| Error::InvalidConfigValue(format!("{}={}", key, raw))),
    }
}
