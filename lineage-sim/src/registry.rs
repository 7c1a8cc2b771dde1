//! Process-scoped registry: entity lifecycle and the per-tick update loop.
//!
//! ## Tick pipeline (per entity, every `decision_interval` seconds)
//!
//! | Step      | Reads                          | Writes                      |
//! |-----------|--------------------------------|-----------------------------|
//! | Snapshot  | collaborators, mood, knowledge | -                           |
//! | Decide    | snapshot, memory summary       | backend cooldowns           |
//! | Apply     | decision                       | collaborators, event bus    |
//! | Record    | effect outcome                 | memory store, knowledge     |
//!
//! A failure or panic in any step skips that entity for the tick and bumps
//! its error counter. Nothing escapes [`Registry::update`].

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use lineage_core::action::Action;
use lineage_core::behavior::{BehaviorCatalog, presets};
use lineage_core::config::PolicyKind;
use lineage_core::decision::Decision;
use lineage_core::error::{LineageError, Result};
use lineage_core::knowledge::SharedKnowledge;
use lineage_core::memory::{MemoryEntry, MemoryStore, StatSheet, TerminationCause};
use lineage_core::metrics::{CounterSnapshot, LineageCounters, TickBudgetMonitor};
use lineage_core::persistence::{PersistenceEngine, SlotStore, StorageCodec};
use lineage_core::policy::{PolicyBackend, PolicyFactory};
use lineage_core::training::{TrainingBatch, TrainingWorker};
use lineage_core::types::{EntityId, EntityKind, Mood, Personality, ProfileTag, SimTime, Tendency};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::collaborators::Collaborators;
use crate::config::SimConfig;
use crate::effects::{self, EffectContext};
use crate::events::{DomainEvent, EventBus};
use crate::integration::{SnapshotSources, SnapshotSubject, build_snapshot};
use crate::mood::MoodLedger;

// ---------------------------------------------------------------------------
// Registration data
// ---------------------------------------------------------------------------

/// What the host supplies when registering an entity.
#[derive(Debug, Clone, Default)]
pub struct EntityData {
    /// Role; selects the learning profile.
    pub kind: EntityKind,
    /// Behavior profile; selects the preset catalog.
    pub profile: ProfileTag,
    /// Trait values driving stat and skill preferences.
    pub personality: Personality,
    /// Custom catalog replacing the preset.
    pub catalog: Option<BehaviorCatalog>,
    /// Storage slot; the configured default if unset.
    pub slot: Option<String>,
}

impl EntityData {
    /// Data for a `kind` entity using the `profile` preset.
    #[must_use]
    pub fn new(kind: EntityKind, profile: ProfileTag) -> Self {
        Self {
            kind,
            profile,
            ..Self::default()
        }
    }

    /// Set the personality.
    #[must_use]
    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = personality;
        self
    }

    /// Use `catalog` instead of the profile preset.
    #[must_use]
    pub fn with_catalog(mut self, catalog: BehaviorCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Persist under `slot`.
    #[must_use]
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }
}

/// A registered entity.
#[derive(Debug)]
struct EntityRecord {
    data: EntityData,
    memory: MemoryStore,
    backend: Box<dyn PolicyBackend>,
    decision_timer: f64,
    last_decision: Option<Decision>,
    errors: u64,
    decisions: u64,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Read-only view of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    /// Entity id.
    pub id: EntityId,
    /// Role.
    pub kind: EntityKind,
    /// Behavior profile.
    pub profile: ProfileTag,
    /// Backend chosen at registration.
    pub backend: PolicyKind,
    /// Current generation.
    pub generation_id: u32,
    /// Entries in the current generation.
    pub memory_len: usize,
    /// Decision applied on the last tick that produced one.
    pub last_decision: Option<Decision>,
    /// Ticks that failed for this entity.
    pub error_count: u64,
    /// Decisions made by this entity.
    pub decisions: u64,
    /// Current mood.
    pub mood: Mood,
    /// Personality leaning.
    pub tendency: Tendency,
}

/// Aggregate registry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryMetrics {
    /// Registrations accepted since init.
    pub total_registered: u64,
    /// Currently registered.
    pub active_entities: usize,
    /// Decisions applied.
    pub decisions_made: u64,
    /// Entity ticks that failed.
    pub errors: u64,
    /// Entity ticks without a decision.
    pub idle_ticks: u64,
    /// Calls to [`Registry::update`] that ran.
    pub ticks: u64,
    /// Every counter.
    pub counters: CounterSnapshot,
}

/// What [`Registry::shutdown`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Generations archived.
    pub archived: usize,
    /// Memory records written.
    pub saved: usize,
    /// Memory records that failed to write.
    pub save_failures: usize,
    /// Whether a training worker was stopped.
    pub training_stopped: bool,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns every registered entity and drives their decisions.
pub struct Registry {
    config: SimConfig,
    collaborators: Collaborators,
    bus: Arc<EventBus>,
    moods: Arc<MoodLedger>,
    knowledge: Arc<SharedKnowledge>,
    counters: Arc<LineageCounters>,
    monitor: TickBudgetMonitor,
    factory: PolicyFactory,
    training: Option<TrainingWorker>,
    store: Option<Box<dyn SlotStore>>,
    entities: BTreeMap<EntityId, EntityRecord>,
    now: SimTime,
    since_training: f64,
    rng: StdRng,
    total_registered: u64,
    ticks: u64,
}

impl Registry {
    /// Build the registry and subscribe its mood ledger to `bus`.
    ///
    /// Starts the training worker when the learned backend is preferred and
    /// training is enabled, and opens the SQLite store when persistence is
    /// enabled. Neither failing is fatal: the registry falls back to rule
    /// backends or runs without persistence.
    ///
    /// # Errors
    /// Returns [`LineageError::Config`] for a negative or non-finite
    /// decision interval.
    pub fn init(
        config: SimConfig,
        collaborators: Collaborators,
        bus: Arc<EventBus>,
    ) -> Result<Self> {
        let interval = config.integration.decision_interval;
        if !interval.is_finite() || interval < 0.0 {
            return Err(LineageError::Config(format!(
                "decision_interval must be >= 0, got {interval}"
            )));
        }

        let core = &config.core;
        let counters = Arc::new(LineageCounters::new());

        let training = if core.policy.preferred == PolicyKind::Learned && core.training.enabled {
            match TrainingWorker::start(&core.training, Arc::clone(&counters)) {
                Ok(worker) => Some(worker),
                Err(e) => {
                    warn!(error = %e, "training worker failed to start");
                    None
                }
            }
        } else {
            None
        };

        let mut factory = PolicyFactory::new(
            core.policy.clone(),
            core.decision.clone(),
            core.general.seed,
            Arc::clone(&counters),
        );
        if let Some(worker) = &training {
            factory = factory.with_model(worker.handle());
        }

        let store: Option<Box<dyn SlotStore>> = if core.persistence.enabled {
            match PersistenceEngine::open(&core.persistence.path, &core.persistence) {
                Ok(engine) => Some(Box::new(engine)),
                Err(e) => {
                    warn!(
                        path = %core.persistence.path,
                        error = %e,
                        "persistence unavailable, running without saves"
                    );
                    None
                }
            }
        } else {
            None
        };

        let moods = Arc::new(MoodLedger::new());
        for name in DomainEvent::NAMES {
            let moods = Arc::clone(&moods);
            bus.subscribe(name, move |payload| {
                if let Some(event) = DomainEvent::from_payload(name, payload) {
                    moods.apply(&event);
                }
            });
        }

        info!(
            backend = %core.policy.preferred,
            training = training.is_some(),
            persistence = store.is_some(),
            "registry initialised"
        );

        Ok(Self {
            monitor: TickBudgetMonitor::new(core.telemetry.tick_budget_ms),
            rng: StdRng::seed_from_u64(core.general.seed),
            config,
            collaborators,
            bus,
            moods,
            knowledge: Arc::new(SharedKnowledge::new()),
            counters,
            factory,
            training,
            store,
            entities: BTreeMap::new(),
            now: 0.0,
            since_training: 0.0,
            total_registered: 0,
            ticks: 0,
        })
    }

    /// Replace the slot store (for example with an in-memory one).
    #[must_use]
    pub fn with_slot_store(mut self, store: Box<dyn SlotStore>) -> Self {
        self.store = Some(store);
        self
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Register `id`. Returns `false` without changing anything if it is
    /// already registered.
    ///
    /// A saved memory record in the entity's slot is restored; if it cannot
    /// be read the entity starts with empty memory.
    pub fn register(&mut self, id: EntityId, data: EntityData) -> bool {
        if self.entities.contains_key(&id) {
            debug!(error = %LineageError::RegistrationConflict(id), "registration rejected");
            return false;
        }

        let profile = self.config.core.memory.profile(data.kind);
        let mut memory = MemoryStore::new(id, data.kind, profile, self.now);
        if let Some(store) = &self.store {
            let slot = slot_for(&data, &self.config.core.persistence.default_slot);
            match memory.load(store.as_ref(), slot) {
                Ok(true) => debug!(
                    entity = %id,
                    slot,
                    generation = memory.generation_id(),
                    "memory restored"
                ),
                Ok(false) => {}
                Err(e) => {
                    LineageCounters::bump(&self.counters.load_failures);
                    warn!(entity = %id, slot, error = %e, "memory load failed, starting empty");
                }
            }
        }

        let catalog = data.catalog.clone().unwrap_or_else(|| presets::catalog_for(data.profile));
        let backend = self.factory.build(id, catalog);

        info!(
            entity = %id,
            kind = %data.kind,
            profile = %data.profile,
            backend = %backend.kind(),
            "entity registered"
        );

        self.moods.track(id);
        self.entities.insert(
            id,
            EntityRecord {
                data,
                memory,
                backend,
                decision_timer: 0.0,
                last_decision: None,
                errors: 0,
                decisions: 0,
            },
        );
        self.total_registered += 1;
        true
    }

    /// Unregister `id`, archiving its generation as
    /// [`TerminationCause::Unregistered`].
    pub fn unregister(&mut self, id: EntityId) -> bool {
        self.unregister_with_cause(id, TerminationCause::Unregistered)
    }

    /// Unregister `id`, archiving its generation with `cause` and saving it.
    /// Returns `false` if it was not registered.
    pub fn unregister_with_cause(&mut self, id: EntityId, cause: TerminationCause) -> bool {
        let Some(mut record) = self.entities.remove(&id) else {
            return false;
        };
        self.retire(id, &mut record, cause);
        true
    }

    /// Archive, save and forget one entity. Returns the save result, or
    /// `None` when no slot store is configured.
    fn retire(
        &mut self,
        id: EntityId,
        record: &mut EntityRecord,
        cause: TerminationCause,
    ) -> Option<bool> {
        let sheet = final_stats(&self.collaborators, id, &record.memory);
        record.memory.end_generation(cause, Some(sheet), self.now);
        LineageCounters::bump(&self.counters.generations_archived);

        let saved = self.store.as_deref_mut().map(|store| {
            let slot = slot_for(&record.data, &self.config.core.persistence.default_slot);
            let codec = self.config.core.persistence.codec;
            save_memory(store, &record.memory, slot, codec, &self.counters)
        });

        self.moods.untrack(id);
        self.knowledge.forget(id);
        info!(entity = %id, generation = record.memory.generation_id(), "entity unregistered");
        saved
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance by `delta_time` seconds and tick every due entity.
    ///
    /// Negative or non-finite deltas count as 0. Never fails: per-entity
    /// errors and panics are counted and the entity idles for the tick.
    pub fn update(&mut self, delta_time: f64) {
        let dt = if delta_time.is_finite() && delta_time >= 0.0 {
            delta_time
        } else {
            warn!(delta_time, "invalid delta time, treating as 0");
            0.0
        };
        if !self.config.core.general.enabled {
            return;
        }

        let started = Instant::now();
        self.now += dt;
        self.ticks += 1;
        self.moods.decay(dt, self.config.integration.mood_decay_per_sec);

        let ctx = TickContext {
            collaborators: &self.collaborators,
            knowledge: &self.knowledge,
            bus: &self.bus,
            moods: &self.moods,
            counters: &self.counters,
            config: &self.config,
            now: self.now,
        };
        let interval = self.config.integration.decision_interval;

        for (&id, record) in &mut self.entities {
            record.decision_timer -= dt;
            if record.decision_timer > 0.0 {
                continue;
            }
            record.decision_timer = interval;

            match panic::catch_unwind(AssertUnwindSafe(|| tick_entity(id, record, &ctx))) {
                Ok(Ok(Some(decision))) => {
                    record.decisions += 1;
                    LineageCounters::bump(&self.counters.decisions);
                    record.last_decision = Some(decision);
                }
                Ok(Ok(None)) => {
                    LineageCounters::bump(&self.counters.idle_ticks);
                    record.last_decision = None;
                }
                Ok(Err(e)) => {
                    record.errors += 1;
                    record.last_decision = None;
                    LineageCounters::bump(&self.counters.entity_errors);
                    debug!(entity = %id, error = %e, errors = record.errors, "entity tick failed");
                }
                Err(_) => {
                    record.errors += 1;
                    record.last_decision = None;
                    LineageCounters::bump(&self.counters.entity_errors);
                    warn!(entity = %id, errors = record.errors, "entity tick panicked, skipped");
                }
            }
        }

        self.since_training += dt;
        if self.since_training >= self.config.core.training.interval_secs {
            self.since_training = 0.0;
            self.submit_training();
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if self.monitor.record(elapsed_ms) {
            debug!(
                elapsed_ms,
                budget_ms = self.monitor.budget_ms(),
                entities = self.entities.len(),
                "tick over budget"
            );
        }
    }

    /// Sample recent memories from every entity into one bounded batch.
    fn submit_training(&mut self) {
        let Some(worker) = &self.training else {
            return;
        };
        let training = &self.config.core.training;
        let mut examples = Vec::new();
        for (&id, record) in &self.entities {
            let batch = TrainingBatch::sample(id, record.memory.entries(), training, &mut self.rng);
            examples.extend(batch.examples);
        }
        if examples.is_empty() {
            return;
        }
        examples.shuffle(&mut self.rng);
        examples.truncate(training.batch_size);
        let size = examples.len();
        if worker.submit(TrainingBatch {
            entity_id: None,
            examples,
        }) {
            debug!(size, "training batch submitted");
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write `id`'s memory record to its slot.
    ///
    /// # Errors
    /// [`LineageError::EntityNotFound`] if unregistered,
    /// [`LineageError::Persistence`] if no slot store is configured, or the
    /// underlying write error.
    pub fn save(&mut self, id: EntityId) -> Result<()> {
        let record = self.entities.get(&id).ok_or(LineageError::EntityNotFound(id))?;
        let store = self
            .store
            .as_deref_mut()
            .ok_or_else(|| LineageError::Persistence("no slot store configured".to_string()))?;
        let slot = slot_for(&record.data, &self.config.core.persistence.default_slot);
        match record.memory.save(store, slot, self.config.core.persistence.codec) {
            Ok(()) => {
                LineageCounters::bump(&self.counters.saves_completed);
                Ok(())
            }
            Err(e) => {
                LineageCounters::bump(&self.counters.save_failures);
                warn!(entity = %id, slot, error = %e, "memory save failed");
                Err(e)
            }
        }
    }

    /// Restore `id`'s lineage state from its slot. `Ok(false)` if the slot
    /// is empty.
    ///
    /// # Errors
    /// Same cases as [`Registry::save`]; on a read or decode error the
    /// entity's memory is unchanged.
    pub fn load(&mut self, id: EntityId) -> Result<bool> {
        let record = self.entities.get_mut(&id).ok_or(LineageError::EntityNotFound(id))?;
        let store = self
            .store
            .as_deref()
            .ok_or_else(|| LineageError::Persistence("no slot store configured".to_string()))?;
        let slot = slot_for(&record.data, &self.config.core.persistence.default_slot);
        record.memory.load(store, slot).inspect_err(|e| {
            LineageCounters::bump(&self.counters.load_failures);
            warn!(entity = %id, slot, error = %e, "memory load failed");
        })
    }

    /// Archive and save every entity, then stop the training worker.
    #[must_use]
    pub fn shutdown(mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let entities = std::mem::take(&mut self.entities);
        for (id, mut record) in entities {
            report.archived += 1;
            match self.retire(id, &mut record, TerminationCause::Shutdown) {
                Some(true) => report.saved += 1,
                Some(false) => report.save_failures += 1,
                None => {}
            }
        }
        if let Some(worker) = self.training.take() {
            worker.shutdown();
            report.training_stopped = true;
        }
        info!(
            archived = report.archived,
            saved = report.saved,
            save_failures = report.save_failures,
            "registry shut down"
        );
        report
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// View of one entity.
    #[must_use]
    pub fn get_state(&self, id: EntityId) -> Option<EntityState> {
        let record = self.entities.get(&id)?;
        Some(EntityState {
            id,
            kind: record.data.kind,
            profile: record.data.profile,
            backend: record.backend.kind(),
            generation_id: record.memory.generation_id(),
            memory_len: record.memory.len(),
            last_decision: record.last_decision.clone(),
            error_count: record.errors,
            decisions: record.decisions,
            mood: self.moods.get(id),
            tendency: record.data.personality.tendency(),
        })
    }

    /// Aggregate counts.
    #[must_use]
    pub fn metrics(&self) -> RegistryMetrics {
        let counters = self.counters.snapshot();
        RegistryMetrics {
            total_registered: self.total_registered,
            active_entities: self.entities.len(),
            decisions_made: counters.decisions,
            errors: counters.entity_errors,
            idle_ticks: counters.idle_ticks,
            ticks: self.ticks,
            counters,
        }
    }

    /// Memory store of `id`.
    #[must_use]
    pub fn memory(&self, id: EntityId) -> Option<&MemoryStore> {
        self.entities.get(&id).map(|r| &r.memory)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Registered entity count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Simulation time accumulated from `update` deltas.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The event bus the registry listens on.
    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Shared threat and territory knowledge.
    #[must_use]
    pub fn knowledge(&self) -> &Arc<SharedKnowledge> {
        &self.knowledge
    }

    /// Raw counters.
    #[must_use]
    pub fn counters(&self) -> &Arc<LineageCounters> {
        &self.counters
    }

    /// Tick timing.
    #[must_use]
    pub fn monitor(&self) -> &TickBudgetMonitor {
        &self.monitor
    }

    /// Version of the published model, if training runs.
    #[must_use]
    pub fn model_version(&self) -> Option<u64> {
        self.training.as_ref().map(|w| w.handle().version())
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entities.len())
            .field("now", &self.now)
            .field("training", &self.training.is_some())
            .field("persistence", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Per-entity tick
// ---------------------------------------------------------------------------

/// Shared, read-only state for one pass over the entities.
struct TickContext<'a> {
    collaborators: &'a Collaborators,
    knowledge: &'a SharedKnowledge,
    bus: &'a EventBus,
    moods: &'a MoodLedger,
    counters: &'a LineageCounters,
    config: &'a SimConfig,
    now: SimTime,
}

fn tick_entity(
    id: EntityId,
    record: &mut EntityRecord,
    ctx: &TickContext<'_>,
) -> Result<Option<Decision>> {
    let sources = SnapshotSources {
        collaborators: ctx.collaborators,
        knowledge: ctx.knowledge,
        decision: &ctx.config.core.decision,
        integration: &ctx.config.integration,
    };
    let subject = SnapshotSubject {
        id,
        kind: record.data.kind,
        profile: record.data.profile,
    };
    let snapshot = build_snapshot(subject, ctx.moods.get(id), ctx.now, &sources)?;
    let summary = record.memory.summary();

    let Some(decision) = record.backend.select_action(&snapshot, &summary)? else {
        return Ok(None);
    };

    let effect_ctx = EffectContext {
        collaborators: ctx.collaborators,
        config: &ctx.config.integration,
        bus: ctx.bus,
        tendency: record.data.personality.tendency(),
        profile: record.data.profile,
    };
    let outcome = effects::apply(&decision, &snapshot, &effect_ctx)?;

    if snapshot.threat_detected {
        if let Some(target) = snapshot.target {
            ctx.knowledge.report_threat(target.id, snapshot.position, ctx.now);
        }
    }
    ctx.knowledge.record_outcome(decision.action, outcome.success);
    ctx.knowledge.visit(snapshot.position);

    if decision.action != Action::Idle {
        let mut context = snapshot.to_context(&summary);
        context.extend(outcome.context);
        let entry = MemoryEntry::new(
            decision.action.category(),
            context,
            decision.action.as_str(),
            outcome.outcome,
            outcome.success,
            ctx.now,
        );
        let evicted = record.memory.insert(entry);
        LineageCounters::bump(&ctx.counters.memories_recorded);
        if !evicted.is_empty() {
            ctx.counters.memories_evicted.fetch_add(evicted.len() as u64, Ordering::Relaxed);
        }
    }

    debug!(
        entity = %id,
        behavior = %decision.behavior_id,
        action = %decision.action,
        confidence = decision.confidence,
        success = outcome.success,
        "decision applied"
    );
    Ok(Some(decision))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn slot_for<'a>(data: &'a EntityData, default_slot: &'a str) -> &'a str {
    data.slot.as_deref().unwrap_or(default_slot)
}

/// Memory counters plus whatever the stats system still reports.
fn final_stats(collaborators: &Collaborators, id: EntityId, memory: &MemoryStore) -> StatSheet {
    let mut sheet = memory.stats().to_sheet();
    let stats = &collaborators.stats;
    if let Some(health) = stats.get_health_fraction(id) {
        sheet.insert("health".to_string(), f64::from(health));
        sheet.insert("mana".to_string(), f64::from(stats.get_mana_fraction(id)));
        sheet.insert("level".to_string(), f64::from(stats.get_level(id)));
        sheet.insert("experience".to_string(), stats.get_experience(id));
    }
    sheet
}

fn save_memory(
    store: &mut dyn SlotStore,
    memory: &MemoryStore,
    slot: &str,
    codec: StorageCodec,
    counters: &LineageCounters,
) -> bool {
    match memory.save(store, slot, codec) {
        Ok(()) => {
            LineageCounters::bump(&counters.saves_completed);
            true
        }
        Err(e) => {
            LineageCounters::bump(&counters.save_failures);
            warn!(entity = %memory.entity_id(), slot, error = %e, "memory save failed");
            false
        }
    }
}
