//! Generation archive: one record per finished lifecycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::entry::MemoryEntry;
use crate::types::{EntityId, SimTime};

/// Final stat snapshot attached to a generation (stat name → value).
pub type StatSheet = BTreeMap<String, f64>;

/// Why a generation ended.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    /// Killed in the world, optionally by a known entity.
    Killed {
        /// Who landed the final blow, if known.
        by: Option<EntityId>,
    },
    /// Removed from the registry by the host.
    #[default]
    Unregistered,
    /// Registry shut down while the entity was alive.
    Shutdown,
    /// Anything else, described by the host.
    Other(String),
}

impl std::fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Killed { by: Some(killer) } => write!(f, "killed by {killer}"),
            Self::Killed { by: None } => write!(f, "killed"),
            Self::Unregistered => write!(f, "unregistered"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Everything one lifecycle of an entity learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Sequence number within the entity's lineage, starting at 0.
    pub generation_id: u32,
    /// Entity that lived this generation.
    pub entity_id: EntityId,
    /// Simulation time the generation began.
    pub start_time: SimTime,
    /// Simulation time the generation ended.
    pub end_time: SimTime,
    /// Experience accumulated during the generation.
    pub total_experience: f32,
    /// Entries held at end-of-life, in store order.
    pub entries: Vec<MemoryEntry>,
    /// Stats at end-of-life.
    pub final_stats: StatSheet,
    /// How it ended.
    pub cause: TerminationCause,
    /// Wall-clock archival time.
    pub archived_at: DateTime<Utc>,
}

impl GenerationRecord {
    /// Fraction of archived entries that succeeded.
    #[must_use]
    pub fn success_rate(&self) -> f32 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let ok = self.entries.iter().filter(|e| e.success).count();
        ok as f32 / self.entries.len() as f32
    }

    /// Lifetime of the generation in simulation seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}
