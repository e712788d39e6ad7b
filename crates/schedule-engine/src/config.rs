//! TOML configuration for the scheduler and its host binaries.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::suggest::{StepPolicy, SuggestOptions};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub suggest: SuggestConfig,
    pub log: LogConfig,
}

/// `[suggest]` section, mirrored into [`SuggestOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    pub max_suggestions: usize,
    pub horizon_days: i64,
    pub lookaround_days: u32,
    pub max_iterations: usize,
    pub step: StepPolicy,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        let options = SuggestOptions::default();
        Self {
            max_suggestions: options.max_suggestions,
            horizon_days: options.horizon.num_days(),
            lookaround_days: options.lookaround_days,
            max_iterations: options.max_iterations,
            step: options.step,
        }
    }
}

impl SuggestConfig {
    pub fn to_options(&self) -> SuggestOptions {
        SuggestOptions {
            max_suggestions: self.max_suggestions,
            horizon: Duration::try_days(self.horizon_days).unwrap_or(Duration::MAX),
            lookaround_days: self.lookaround_days,
            max_iterations: self.max_iterations,
            step: self.step,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ScheduleConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ScheduleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let suggest = &self.suggest;
        if suggest.max_suggestions == 0 {
            return Err(ScheduleError::InvalidConfig(
                "suggest.max_suggestions must be at least 1".to_string(),
            ));
        }
        if suggest.max_iterations == 0 {
            return Err(ScheduleError::InvalidConfig(
                "suggest.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(1..=36_500).contains(&suggest.horizon_days) {
            return Err(ScheduleError::InvalidConfig(format!(
                "suggest.horizon_days must be between 1 and 36500, got {}",
                suggest.horizon_days
            )));
        }
        if suggest.lookaround_days > 3_660 {
            return Err(ScheduleError::InvalidConfig(format!(
                "suggest.lookaround_days must be at most 3660, got {}",
                suggest.lookaround_days
            )));
        }
        if self.log.level.trim().is_empty() {
            return Err(ScheduleError::InvalidConfig(
                "log.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
