//! Configuration loading.
//!
//! Settings come from a TOML file (default: the platform config directory,
//! `clickloop/config.toml`), then environment overrides. Every field is
//! optional in the file.
//!
//! ```toml
//! step_time = 0.1
//! save_file = "test.json"
//!
//! [replay]
//! max_cycles = 100   # 0 = no limit
//! settle_ms = 20
//! cycle_pause_ms = 100
//! ```

use crate::error::{Error, Result};
use crate::replay::{DEFAULT_MAX_CYCLES, ReplayConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest accepted step time, in seconds.
pub const MIN_STEP_TIME: f64 = 0.001;
/// Largest accepted step time, in seconds.
pub const MAX_STEP_TIME: f64 = 10.0;

/// Check a step time in seconds and convert it.
pub fn step_time_from_secs(secs: f64) -> Result<Duration> {
    if !(MIN_STEP_TIME..=MAX_STEP_TIME).contains(&secs) {
        return Err(Error::InvalidStepTime(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Replay loop settings as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Cycle ceiling; 0 disables it.
    pub max_cycles: u32,
    pub settle_ms: u64,
    pub cycle_pause_ms: u64,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            settle_ms: 20,
            cycle_pause_ms: 100,
        }
    }
}

impl ReplaySettings {
    /// Convert to the engine's [`ReplayConfig`]; `max_cycles = 0` becomes no limit.
    pub fn to_replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            max_cycles: (self.max_cycles > 0).then_some(self.max_cycles),
            settle: Duration::from_millis(self.settle_ms),
            cycle_pause: Duration::from_millis(self.cycle_pause_ms),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds paused after every injected action.
    pub step_time: f64,
    /// Default macro file name.
    pub save_file: String,
    pub replay: ReplaySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_time: 0.1,
            save_file: "test.json".to_string(),
            replay: ReplaySettings::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "clickloop")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Validated step time.
    pub fn step_duration(&self) -> Result<Duration> {
        step_time_from_secs(self.step_time)
    }

    /// Apply `CLICKLOOP_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("CLICKLOOP_STEP_TIME") {
            self.step_time = value
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("CLICKLOOP_STEP_TIME={value}: {e}")))?;
        }
        if let Some(value) = lookup("CLICKLOOP_MAX_CYCLES") {
            self.replay.max_cycles = value
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("CLICKLOOP_MAX_CYCLES={value}: {e}")))?;
        }
        Ok(())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            log::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
            config = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        } else {
            log::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.step_duration()?;
    Ok(config)
}
