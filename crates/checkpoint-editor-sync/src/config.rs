//! Tunables for an edit session.

use std::time::Duration;

use checkpoint_editor_core::DEFAULT_MAX_UNDO_STEPS;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Session configuration.
///
/// Durations are plain millisecond counts so the struct round-trips through
/// JSON and environment variables unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period before a typed field is written.
    pub debounce_ms: u64,
    /// Maximum undo depth.
    pub max_undo_steps: usize,
    /// Per-write timeout; `0` disables it.
    pub write_timeout_ms: u64,
    /// Timeout for the initial read when opening a chain; `0` disables it.
    pub load_timeout_ms: u64,
    /// How long `Saved` stays visible before reverting to `Idle`.
    pub saved_linger_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            max_undo_steps: DEFAULT_MAX_UNDO_STEPS,
            write_timeout_ms: 10_000,
            load_timeout_ms: 10_000,
            saved_linger_ms: 1_500,
        }
    }
}

fn optional(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl SyncConfig {
    /// Parse a JSON object; absent keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Load config from environment variables.
    ///
    /// - `CHECKPOINT_DEBOUNCE_MS`
    /// - `CHECKPOINT_MAX_UNDO_STEPS`
    /// - `CHECKPOINT_WRITE_TIMEOUT_MS`
    /// - `CHECKPOINT_LOAD_TIMEOUT_MS`
    /// - `CHECKPOINT_SAVED_LINGER_MS`
    ///
    /// Unset variables keep their defaults; unparsable ones are an error.
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SyncError> {
        fn parse<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> Result<T, SyncError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| SyncError::Config(format!("{key}: invalid value {raw:?}"))),
                None => Ok(default),
            }
        }

        let defaults = Self::default();
        Ok(Self {
            debounce_ms: parse(&lookup, "CHECKPOINT_DEBOUNCE_MS", defaults.debounce_ms)?,
            max_undo_steps: parse(&lookup, "CHECKPOINT_MAX_UNDO_STEPS", defaults.max_undo_steps)?,
            write_timeout_ms: parse(
                &lookup,
                "CHECKPOINT_WRITE_TIMEOUT_MS",
                defaults.write_timeout_ms,
            )?,
            load_timeout_ms: parse(&lookup, "CHECKPOINT_LOAD_TIMEOUT_MS", defaults.load_timeout_ms)?,
            saved_linger_ms: parse(&lookup, "CHECKPOINT_SAVED_LINGER_MS", defaults.saved_linger_ms)?,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        optional(self.write_timeout_ms)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        optional(self.load_timeout_ms)
    }

    pub fn saved_linger(&self) -> Duration {
        Duration::from_millis(self.saved_linger_ms)
    }
}
