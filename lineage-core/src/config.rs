//! Configuration for the lineage decision core.
//!
//! Maps directly to `lineage.toml`. Every field has a default, so an empty
//! file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::persistence::StorageCodec;
use crate::types::EntityKind;

/// Top-level lineage configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineageConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-kind memory capacity and learning rates.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Rule evaluation settings.
    #[serde(default)]
    pub decision: DecisionConfig,
    /// Policy backend selection.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Background training of the learned backend.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Slot storage settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Logging output.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl LineageConfig {
    /// Parse a TOML document; omitted keys take their defaults.
    ///
    /// # Errors
    /// Returns `LineageError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::LineageError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Process-wide switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the decision core runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base seed for per-entity sampling RNGs.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            seed: default_seed(),
        }
    }
}

/// Capacity and learning rate for one kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningProfile {
    /// Maximum number of current memory entries.
    pub capacity: usize,
    /// Maximum number of archived generations.
    pub archive_capacity: usize,
    /// Fraction of each entry's learning value credited as experience.
    pub learning_rate: f32,
}

/// Per-kind memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Player-controlled entities.
    #[serde(default = "default_player_profile")]
    pub player: LearningProfile,
    /// Hostile creatures.
    #[serde(default = "default_enemy_profile")]
    pub enemy: LearningProfile,
    /// Neutral NPCs.
    #[serde(default = "default_npc_profile")]
    pub npc: LearningProfile,
}

impl MemoryConfig {
    /// Profile for an entity kind.
    #[must_use]
    pub fn profile(&self, kind: EntityKind) -> LearningProfile {
        match kind {
            EntityKind::Player => self.player,
            EntityKind::Enemy => self.enemy,
            EntityKind::Npc => self.npc,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            player: default_player_profile(),
            enemy: default_enemy_profile(),
            npc: default_npc_profile(),
        }
    }
}

/// Rule-based decision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Confidence attached to every rule-based decision.
    #[serde(default = "default_confidence")]
    pub default_confidence: f32,
    /// Decisions kept per entity for diagnostics.
    #[serde(default = "default_history")]
    pub history_capacity: usize,
    /// Distance at which a target is noticed.
    #[serde(default = "default_detection_range")]
    pub detection_range: f32,
    /// Distance at which a target can be struck.
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            default_confidence: default_confidence(),
            history_capacity: default_history(),
            detection_range: default_detection_range(),
            attack_range: default_attack_range(),
        }
    }
}

/// Which backend the factory tries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Learned softmax policy, falling back to rules.
    Learned,
    /// Condition/priority rules.
    #[default]
    Rule,
    /// Always idle.
    Idle,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Learned => write!(f, "learned"),
            Self::Rule => write!(f, "rule"),
            Self::Idle => write!(f, "idle"),
        }
    }
}

/// Policy backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Backend tried first at registration.
    #[serde(default)]
    pub preferred: PolicyKind,
    /// Softmax temperature for the learned backend.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            preferred: PolicyKind::default(),
            temperature: default_temperature(),
        }
    }
}

/// Background training worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Whether the worker is started at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Runtime worker threads.
    #[serde(default = "default_1_usize")]
    pub worker_threads: usize,
    /// Simulation seconds between batch submissions.
    #[serde(default = "default_interval")]
    pub interval_secs: f64,
    /// Maximum examples per batch.
    #[serde(default = "default_batch")]
    pub batch_size: usize,
    /// How many of the newest entries a batch is sampled from.
    #[serde(default = "default_window")]
    pub recent_window: usize,
    /// Upper bound on a single epoch.
    #[serde(default = "default_epoch_timeout")]
    pub epoch_timeout_ms: u64,
    /// Gradient step size.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Pending batches before new submissions are dropped.
    #[serde(default = "default_queue")]
    pub queue_capacity: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_threads: 1,
            interval_secs: default_interval(),
            batch_size: default_batch(),
            recent_window: default_window(),
            epoch_timeout_ms: default_epoch_timeout(),
            learning_rate: default_learning_rate(),
            queue_capacity: default_queue(),
        }
    }
}

/// Slot storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Whether memories are saved and loaded at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Slot used when an entity does not name one.
    #[serde(default = "default_slot")]
    pub default_slot: String,
    /// Encoding of the stored record.
    #[serde(default)]
    pub codec: StorageCodec,
    /// Put the journal in WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store a CRC-32 per slot and verify it on read.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_db_path(),
            default_slot: default_slot(),
            codec: StorageCodec::default(),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
    /// Warn when a registry tick exceeds this many milliseconds.
    #[serde(default = "default_tick_budget")]
    pub tick_budget_ms: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            tick_budget_ms: default_tick_budget(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_seed() -> u64 { 0x5EED_1E9A }
fn default_db_path() -> String { "lineage.db".to_string() }
fn default_slot() -> String { "default".to_string() }
fn default_confidence() -> f32 { 0.8 }
fn default_history() -> usize { 32 }
fn default_detection_range() -> f32 { 15.0 }
fn default_attack_range() -> f32 { 2.0 }
fn default_temperature() -> f32 { 1.0 }
fn default_1_usize() -> usize { 1 }
fn default_interval() -> f64 { 5.0 }
fn default_batch() -> usize { 64 }
fn default_window() -> usize { 256 }
fn default_epoch_timeout() -> u64 { 250 }
fn default_learning_rate() -> f32 { 0.05 }
fn default_queue() -> usize { 8 }
fn default_tick_budget() -> f64 { 2.0 }

fn default_player_profile() -> LearningProfile {
    LearningProfile { capacity: 1000, archive_capacity: 50, learning_rate: 0.8 }
}

fn default_enemy_profile() -> LearningProfile {
    LearningProfile { capacity: 500, archive_capacity: 100, learning_rate: 0.3 }
}

fn default_npc_profile() -> LearningProfile {
    LearningProfile { capacity: 300, archive_capacity: 20, learning_rate: 0.5 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = LineageConfig::from_toml("").expect("parse");
        assert_eq!(cfg.memory.enemy.capacity, 500);
        assert_eq!(cfg.memory.player.archive_capacity, 50);
        assert_eq!(cfg.policy.preferred, PolicyKind::Rule);
        assert!((cfg.decision.default_confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_sections_override() {
        let cfg = LineageConfig::from_toml(
            r#"
            [policy]
            preferred = "learned"

            [memory.npc]
            capacity = 3
            archive_capacity = 2
            learning_rate = 0.25

            [persistence]
            codec = "message_pack"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.policy.preferred, PolicyKind::Learned);
        assert_eq!(cfg.memory.profile(EntityKind::Npc).capacity, 3);
        assert_eq!(cfg.memory.profile(EntityKind::Enemy).capacity, 500);
        assert_eq!(cfg.persistence.codec, StorageCodec::MessagePack);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = LineageConfig::from_toml("[policy\npreferred = 3").expect_err("should fail");
        assert!(matches!(err, crate::LineageError::Config(_)));
    }
}
