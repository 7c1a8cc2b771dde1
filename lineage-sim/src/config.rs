//! Host configuration: the core settings plus integration tuning.
//!
//! A single TOML file carries both. Core sections (`[general]`, `[memory]`,
//! `[policy]`, ...) sit at the top level; integration knobs live under
//! `[integration]`.

use std::path::Path;

use lineage_core::LineageError;
use lineage_core::config::LineageConfig;
use lineage_core::error::Result;
use serde::{Deserialize, Serialize};

/// Everything a [`Registry`](crate::registry::Registry) needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Core settings.
    #[serde(flatten)]
    pub core: LineageConfig,
    /// Snapshot and effect tuning.
    #[serde(default)]
    pub integration: IntegrationConfig,
}

impl SimConfig {
    /// Parse from a TOML string.
    ///
    /// # Errors
    /// Returns [`LineageError::Config`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| LineageError::Config(e.to_string()))
    }

    /// Parse from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// Thresholds and rates used when building snapshots and applying effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Healing items are only consumed below this health fraction.
    #[serde(default = "default_heal_threshold")]
    pub heal_threshold: f32,
    /// Mana items are only consumed below this mana fraction.
    #[serde(default = "default_mana_threshold")]
    pub mana_threshold: f32,
    /// Health fraction under which the `low_health` flag is set.
    #[serde(default = "default_low_health")]
    pub low_health_threshold: f32,
    /// Stat points spent by one `distribute_stat_points` decision.
    #[serde(default = "default_stat_points")]
    pub max_stat_points_per_tick: u32,
    /// Seconds between decisions of one entity.
    #[serde(default = "default_decision_interval")]
    pub decision_interval: f64,
    /// Fraction of the distance to neutral mood recovered per second.
    #[serde(default = "default_mood_decay")]
    pub mood_decay_per_sec: f32,
    /// World units per second, reported in movement outcomes.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            heal_threshold: default_heal_threshold(),
            mana_threshold: default_mana_threshold(),
            low_health_threshold: default_low_health(),
            max_stat_points_per_tick: default_stat_points(),
            decision_interval: default_decision_interval(),
            mood_decay_per_sec: default_mood_decay(),
            move_speed: default_move_speed(),
        }
    }
}

fn default_heal_threshold() -> f32 { 0.35 }
fn default_mana_threshold() -> f32 { 0.25 }
fn default_low_health() -> f32 { 0.3 }
fn default_stat_points() -> u32 { 3 }
fn default_decision_interval() -> f64 { 0.1 }
fn default_mood_decay() -> f32 { 0.1 }
fn default_move_speed() -> f32 { 4.0 }
