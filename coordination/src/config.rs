//! Poll settings
//!
//! Settings are plain serde data loaded from TOML and optionally overridden by
//! `POLLS_*` environment variables. The coordinator never caches them across
//! frames: it asks a [`SettingsProvider`] for a fresh snapshot each time it
//! needs a value, so a [`SharedSettings`] can be swapped at runtime.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weighting::{Badge, VoteWeights, WeightingPolicy};

/// Result type alias for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised while loading or validating settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("{badge} weight must be at least 1, got {value}")]
    InvalidWeight { badge: Badge, value: u32 },
}

/// User-facing poll settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Seconds the cover phase is shown before voting opens
    pub cover_duration: u32,
    /// Seconds voting stays open
    pub poll_duration: u32,
    /// Seconds the results are shown before the winner fires
    pub results_duration: u32,

    pub subscriber_weight: u32,
    pub vip_weight: u32,
    pub founder_weight: u32,
    pub moderator_weight: u32,

    /// Use the highest badge only instead of summing badge weights
    pub tiered_votes: bool,
    /// Announce the choices in chat when a poll starts
    pub choices_in_chat: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            cover_duration: 5,
            poll_duration: 300,
            results_duration: 5,
            subscriber_weight: 1,
            vip_weight: 1,
            founder_weight: 1,
            moderator_weight: 1,
            tiered_votes: true,
            choices_in_chat: false,
        }
    }
}

impl PollSettings {
    /// Load settings from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut settings: Self = toml::from_str(&raw)?;
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> SettingsResult<Self> {
        let mut settings = Self::default();
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Override fields from `POLLS_*` environment variables
    pub fn apply_env(&mut self) -> SettingsResult<()> {
        env_number("POLLS_COVER_DURATION", &mut self.cover_duration)?;
        env_number("POLLS_POLL_DURATION", &mut self.poll_duration)?;
        env_number("POLLS_RESULTS_DURATION", &mut self.results_duration)?;
        env_number("POLLS_SUBSCRIBER_WEIGHT", &mut self.subscriber_weight)?;
        env_number("POLLS_VIP_WEIGHT", &mut self.vip_weight)?;
        env_number("POLLS_FOUNDER_WEIGHT", &mut self.founder_weight)?;
        env_number("POLLS_MODERATOR_WEIGHT", &mut self.moderator_weight)?;
        env_flag("POLLS_TIERED_VOTES", &mut self.tiered_votes)?;
        env_flag("POLLS_CHOICES_IN_CHAT", &mut self.choices_in_chat)?;
        Ok(())
    }

    /// Reject weights below 1
    pub fn validate(&self) -> SettingsResult<()> {
        let weights = self.vote_weights();
        for badge in Badge::ALL {
            let value = weights.badge_weight(badge);
            if value == 0 {
                return Err(SettingsError::InvalidWeight { badge, value });
            }
        }
        Ok(())
    }

    /// Weighting configuration derived from these settings
    pub fn vote_weights(&self) -> VoteWeights {
        VoteWeights {
            subscriber: self.subscriber_weight,
            vip: self.vip_weight,
            founder: self.founder_weight,
            moderator: self.moderator_weight,
            policy: if self.tiered_votes {
                WeightingPolicy::Tiered
            } else {
                WeightingPolicy::Additive
            },
        }
    }
}

fn env_number(var: &str, slot: &mut u32) -> SettingsResult<()> {
    if let Ok(raw) = std::env::var(var) {
        *slot = raw.trim().parse().map_err(|_| SettingsError::InvalidEnv {
            var: var.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

fn env_flag(var: &str, slot: &mut bool) -> SettingsResult<()> {
    if let Ok(raw) = std::env::var(var) {
        *slot = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(SettingsError::InvalidEnv {
                    var: var.to_string(),
                    value: raw,
                })
            }
        };
    }
    Ok(())
}

/// Source of the current settings snapshot
pub trait SettingsProvider: Send + Sync {
    fn snapshot(&self) -> PollSettings;
}

impl SettingsProvider for PollSettings {
    fn snapshot(&self) -> PollSettings {
        self.clone()
    }
}

/// Live-reloadable settings shared between the settings UI and the coordinator
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<PollSettings>>,
}

impl SharedSettings {
    pub fn new(settings: PollSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the settings wholesale
    pub fn replace(&self, settings: PollSettings) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = settings;
    }

    /// Mutate the settings in place
    pub fn update(&self, f: impl FnOnce(&mut PollSettings)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard);
    }
}

impl SettingsProvider for SharedSettings {
    fn snapshot(&self) -> PollSettings {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = PollSettings::default();
        assert_eq!(settings.cover_duration, 5);
        assert_eq!(settings.poll_duration, 300);
        assert_eq!(settings.results_duration, 5);
        assert!(settings.tiered_votes);
        assert!(!settings.choices_in_chat);
        assert_eq!(settings.vote_weights().policy, WeightingPolicy::Tiered);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_duration = 60\ntiered_votes = false\nvip_weight = 3").unwrap();

        let settings = PollSettings::load(file.path()).unwrap();
        assert_eq!(settings.poll_duration, 60);
        assert_eq!(settings.vip_weight, 3);
        assert_eq!(settings.cover_duration, 5);
        assert_eq!(settings.vote_weights().policy, WeightingPolicy::Additive);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PollSettings::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn test_load_rejects_zero_weight() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "moderator_weight = 0").unwrap();

        let err = PollSettings::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidWeight {
                badge: Badge::Moderator,
                value: 0
            }
        ));
    }

    #[test]
    fn test_shared_settings_live_update() {
        let shared = SharedSettings::new(PollSettings::default());
        let before = shared.snapshot();

        shared.update(|s| s.poll_duration = 10);
        assert_eq!(before.poll_duration, 300);
        assert_eq!(shared.snapshot().poll_duration, 10);

        shared.replace(PollSettings {
            choices_in_chat: true,
            ..PollSettings::default()
        });
        assert!(shared.snapshot().choices_in_chat);
        assert_eq!(shared.snapshot().poll_duration, 300);
    }
}
