//! Pipeline configuration, loadable from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use duat_schema::card::MAX_SAND_COST;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Content pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    pub content_root: PathBuf,
    pub enable_validation: bool,
    /// Seconds a file must stay quiet before it is reloaded.
    pub debounce_delay: f64,
    /// Attach file size and throughput figures to file reports.
    pub performance_tracking: bool,
    /// Run a full cross-reference pass after this many reloads.
    pub full_validation_interval: Option<u32>,
    /// Capacity of the watcher and reload channels.
    pub channel_capacity: usize,
    pub tuning: BalanceTuning,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("content"),
            enable_validation: true,
            debounce_delay: 0.5,
            performance_tracking: false,
            full_validation_interval: None,
            channel_capacity: 256,
            tuning: BalanceTuning::default(),
        }
    }
}

impl ContentConfig {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.debounce_delay.is_finite() || self.debounce_delay <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "debounce_delay",
                reason: format!("must be a positive number of seconds, got {}", self.debounce_delay),
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "channel_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.full_validation_interval == Some(0) {
            return Err(ConfigError::Invalid {
                field: "full_validation_interval",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        self.tuning.validate()
    }

    pub fn debounce_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.debounce_delay).unwrap_or(Duration::from_millis(500))
    }
}

/// Upper bound for [`BalanceTuning::damage_per_sand`].
pub const MAX_DAMAGE_PER_SAND: u32 = 1000;
/// Upper bound for [`BalanceTuning::ability_cost_sand_factor`].
pub const MAX_ABILITY_COST_FACTOR: u32 = 100;

/// Thresholds behind the balance and progression heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BalanceTuning {
    /// Weight of `max_health` in the enemy difficulty metric.
    pub difficulty_health_weight: f64,
    /// Weight of `max_sand` in the enemy difficulty metric.
    pub difficulty_sand_weight: f64,
    /// An hour regresses when its difficulty falls below this fraction of
    /// the previous populated hour.
    pub difficulty_regression_tolerance: f64,
    pub deck_min_average_cost: f64,
    pub deck_max_average_cost: f64,
    /// Damage allowed per point of sand cost before a card looks overtuned.
    pub damage_per_sand: u32,
    pub max_health_per_sand: f64,
    /// Enemy ability costs may total this multiple of `max_sand`.
    pub ability_cost_sand_factor: u32,
    pub min_playable_deck_size: usize,
}

impl Default for BalanceTuning {
    fn default() -> Self {
        Self {
            difficulty_health_weight: 1.0,
            difficulty_sand_weight: 10.0,
            difficulty_regression_tolerance: 0.8,
            deck_min_average_cost: 1.5,
            deck_max_average_cost: 3.5,
            damage_per_sand: 10,
            max_health_per_sand: 20.0,
            ability_cost_sand_factor: 2,
            min_playable_deck_size: 15,
        }
    }
}

impl BalanceTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.difficulty_regression_tolerance) {
            return Err(ConfigError::Invalid {
                field: "tuning.difficulty_regression_tolerance",
                reason: "must lie between 0.0 and 1.0".to_string(),
            });
        }
        for (field, value) in [
            ("tuning.difficulty_health_weight", self.difficulty_health_weight),
            ("tuning.difficulty_sand_weight", self.difficulty_sand_weight),
            ("tuning.max_health_per_sand", self.max_health_per_sand),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be a finite, non-negative number".to_string(),
                });
            }
        }
        let max_cost = f64::from(MAX_SAND_COST);
        for (field, value) in [
            ("tuning.deck_min_average_cost", self.deck_min_average_cost),
            ("tuning.deck_max_average_cost", self.deck_max_average_cost),
        ] {
            if !(0.0..=max_cost).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must lie between 0 and {MAX_SAND_COST}"),
                });
            }
        }
        if !(1..=MAX_DAMAGE_PER_SAND).contains(&self.damage_per_sand) {
            return Err(ConfigError::Invalid {
                field: "tuning.damage_per_sand",
                reason: format!("must lie between 1 and {MAX_DAMAGE_PER_SAND}"),
            });
        }
        if !(1..=MAX_ABILITY_COST_FACTOR).contains(&self.ability_cost_sand_factor) {
            return Err(ConfigError::Invalid {
                field: "tuning.ability_cost_sand_factor",
                reason: format!("must lie between 1 and {MAX_ABILITY_COST_FACTOR}"),
            });
        }
        if self.deck_min_average_cost > self.deck_max_average_cost {
            return Err(ConfigError::Invalid {
                field: "tuning.deck_min_average_cost",
                reason: "must not exceed deck_max_average_cost".to_string(),
            });
        }
        Ok(())
    }
}
