//! Per-entity memory store.
//!
//! A [`MemoryStore`] is exclusively owned by its entity. It records
//! [`MemoryEntry`]s as actions resolve, keeps the most useful ones under a
//! capacity bound, answers relevance queries, and at end-of-life folds the
//! whole lifecycle into a [`GenerationRecord`] for the long-term archive.

pub mod entry;
pub mod generation;
pub mod stats;
pub mod summary;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LearningProfile;
use crate::error::Result;
use crate::eviction;
use crate::persistence::{SlotStore, StorageCodec, StoredSlot};
use crate::retrieval::{self, RankedEntry};
use crate::types::{ContextMap, EntityId, EntityKind, SimTime};

pub use entry::{MemoryCategory, MemoryEntry};
pub use generation::{GenerationRecord, StatSheet, TerminationCause};
pub use stats::MemoryStats;
pub use summary::MemorySummary;

/// The durable part of a store: what survives a save/load cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMemory {
    /// Owner.
    pub entity_id: EntityId,
    /// Owner's kind at save time.
    pub kind: EntityKind,
    /// Lifetime counters.
    pub stats: MemoryStats,
    /// Id the next generation will carry.
    pub generation_id: u32,
    /// Archived generations, oldest first.
    pub archive: Vec<GenerationRecord>,
}

/// One entity's experience, current and ancestral.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entity_id: EntityId,
    kind: EntityKind,
    profile: LearningProfile,
    entries: Vec<MemoryEntry>,
    stats: MemoryStats,
    generation_id: u32,
    generation_started: SimTime,
    current_experience: f32,
    archive: Vec<GenerationRecord>,
}

impl MemoryStore {
    /// Create an empty store starting generation 0 at time `now`.
    #[must_use]
    pub fn new(
        entity_id: EntityId,
        kind: EntityKind,
        profile: LearningProfile,
        now: SimTime,
    ) -> Self {
        Self {
            entity_id,
            kind,
            profile,
            entries: Vec::new(),
            stats: MemoryStats::default(),
            generation_id: 0,
            generation_started: now,
            current_experience: 0.0,
            archive: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Record a resolved action and return the stored entry.
    ///
    /// Entries past capacity are evicted lowest learning value first.
    pub fn add_entry(
        &mut self,
        category: MemoryCategory,
        context: ContextMap,
        action: impl Into<String>,
        outcome: ContextMap,
        success: bool,
        now: SimTime,
    ) -> MemoryEntry {
        let entry = MemoryEntry::new(category, context, action, outcome, success, now);
        self.insert(entry.clone());
        entry
    }

    /// Append a prepared entry, crediting experience and enforcing capacity.
    ///
    /// Returns the entries evicted to make room (possibly including `entry`
    /// itself if it was the least valuable).
    pub fn insert(&mut self, entry: MemoryEntry) -> Vec<MemoryEntry> {
        let gain = entry.learning_value * self.profile.learning_rate;
        self.current_experience += gain;
        self.stats.record(&entry, gain);

        debug!(
            entity = %self.entity_id,
            category = %entry.category,
            action = %entry.action,
            success = entry.success,
            value = entry.learning_value,
            "memory recorded"
        );

        self.entries.push(entry);
        eviction::evict_entries(&mut self.entries, self.profile.capacity)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Top `limit` entries of `category`, most relevant to `context` first.
    ///
    /// Equal scores keep store order.
    #[must_use]
    pub fn query_relevant(
        &self,
        category: MemoryCategory,
        context: &ContextMap,
        limit: usize,
        now: SimTime,
    ) -> Vec<RankedEntry<'_>> {
        let mut ranked: Vec<RankedEntry<'_>> = self
            .entries
            .iter()
            .filter(|e| e.category == category)
            .map(|entry| RankedEntry {
                entry,
                score: retrieval::relevance(entry, context, now),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(limit);
        ranked
    }

    /// The newest `n` entries, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[MemoryEntry] {
        &self.entries[self.entries.len().saturating_sub(n)..]
    }

    /// Pattern summary for policy backends.
    #[must_use]
    pub fn summary(&self) -> MemorySummary {
        let mut summary = MemorySummary::analyse(&self.entries);
        summary.generation_id = self.generation_id;
        summary.current_experience = self.current_experience;
        summary.success_rate = self.stats.success_rate();
        summary
    }

    // ------------------------------------------------------------------
    // Generations
    // ------------------------------------------------------------------

    /// Close the current generation and archive it.
    ///
    /// `final_stats` of `None` archives the store's own counters.
    pub fn end_generation(
        &mut self,
        cause: TerminationCause,
        final_stats: Option<StatSheet>,
        now: SimTime,
    ) -> GenerationRecord {
        self.stats.total_generations += 1;
        let record = GenerationRecord {
            generation_id: self.generation_id,
            entity_id: self.entity_id,
            start_time: self.generation_started,
            end_time: now,
            total_experience: self.current_experience,
            entries: std::mem::take(&mut self.entries),
            final_stats: final_stats.unwrap_or_else(|| self.stats.to_sheet()),
            cause,
            archived_at: chrono::Utc::now(),
        };

        self.archive.push(record.clone());
        let dropped = eviction::evict_generations(&mut self.archive, self.profile.archive_capacity);

        info!(
            entity = %self.entity_id,
            generation = record.generation_id,
            experience = record.total_experience,
            entries = record.entries.len(),
            cause = %record.cause,
            archive_evicted = dropped.len(),
            "generation archived"
        );

        self.generation_id += 1;
        self.generation_started = now;
        self.current_experience = 0.0;
        record
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Durable view of this store.
    #[must_use]
    pub fn to_persisted(&self) -> PersistedMemory {
        PersistedMemory {
            entity_id: self.entity_id,
            kind: self.kind,
            stats: self.stats.clone(),
            generation_id: self.generation_id,
            archive: self.archive.clone(),
        }
    }

    /// Replace lineage state with `persisted`, keeping current entries.
    ///
    /// The archive is trimmed to this store's archive capacity.
    pub fn restore(&mut self, persisted: PersistedMemory) {
        self.stats = persisted.stats;
        self.generation_id = persisted.generation_id;
        self.archive = persisted.archive;
        eviction::evict_generations(&mut self.archive, self.profile.archive_capacity);
    }

    /// Encode and write this store to `slot`.
    ///
    /// # Errors
    /// Returns an error if encoding or the write fails.
    pub fn save(&self, store: &mut dyn SlotStore, slot: &str, codec: StorageCodec) -> Result<()> {
        let data = codec.encode(&self.to_persisted())?;
        store.write_slot(slot, self.entity_id, StoredSlot { codec, data })
    }

    /// Read `slot` and restore from it. Returns `false` if the slot is empty.
    ///
    /// # Errors
    /// Returns an error if the read or decoding fails; the store is left
    /// untouched in that case.
    pub fn load(&mut self, store: &dyn SlotStore, slot: &str) -> Result<bool> {
        let Some(stored) = store.read_slot(slot, self.entity_id)? else {
            return Ok(false);
        };
        let persisted: PersistedMemory = stored.codec.decode(&stored.data)?;
        self.restore(persisted);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Owner.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Owner's kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Current entries, in store order.
    #[must_use]
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Number of current entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no current entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of current entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.profile.capacity
    }

    /// Id of the generation in progress.
    #[must_use]
    pub fn generation_id(&self) -> u32 {
        self.generation_id
    }

    /// Experience gained in the generation in progress.
    #[must_use]
    pub fn current_experience(&self) -> f32 {
        self.current_experience
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    /// Archived generations, in archive order.
    #[must_use]
    pub fn archive(&self) -> &[GenerationRecord] {
        &self.archive
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
