//! Rule-based decision engine.
//!
//! Maps `(snapshot, memory)` to at most one [`Decision`] per tick. It never
//! mutates game state; the only state it owns is each behavior's
//! `last_fired` time and a bounded diagnostic history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::action::Action;
use crate::behavior::BehaviorCatalog;
use crate::config::DecisionConfig;
use crate::error::Result;
use crate::memory::MemorySummary;
use crate::memory::entry::clamp_unit;
use crate::snapshot::Snapshot;
use crate::types::{EntityId, SimTime};

/// The single action an entity takes this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Acting entity.
    pub entity_id: EntityId,
    /// Behavior that produced the decision.
    pub behavior_id: String,
    /// What to do.
    pub action: Action,
    /// Whom to do it to.
    pub target: Option<EntityId>,
    /// Certainty in `[0, 1]`.
    pub confidence: f32,
    /// Simulation time of the decision.
    pub timestamp: SimTime,
}

impl Decision {
    /// Build a decision, clamping confidence to `[0, 1]`.
    #[must_use]
    pub fn new(
        entity_id: EntityId,
        behavior_id: impl Into<String>,
        action: Action,
        target: Option<EntityId>,
        confidence: f32,
        timestamp: SimTime,
    ) -> Self {
        Self {
            entity_id,
            behavior_id: behavior_id.into(),
            action,
            target,
            confidence: clamp_unit(confidence),
            timestamp,
        }
    }
}

/// Fixed-size ring of recent decisions.
#[derive(Debug, Clone, Default)]
pub struct DecisionHistory {
    entries: VecDeque<Decision>,
    capacity: usize,
}

impl DecisionHistory {
    /// Create a history holding at most `capacity` decisions.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, dropping the oldest past capacity.
    pub fn push(&mut self, decision: Decision) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(decision);
    }

    /// Most recent decision.
    #[must_use]
    pub fn last(&self) -> Option<&Decision> {
        self.entries.back()
    }

    /// Decisions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        self.entries.iter()
    }

    /// Number of stored decisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no decisions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Priority/cooldown evaluator over one entity's catalog.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    catalog: BehaviorCatalog,
    default_confidence: f32,
    history: DecisionHistory,
}

impl DecisionEngine {
    /// Wrap `catalog` with settings from `config`.
    #[must_use]
    pub fn new(catalog: BehaviorCatalog, config: &DecisionConfig) -> Self {
        Self {
            catalog,
            default_confidence: clamp_unit(config.default_confidence),
            history: DecisionHistory::new(config.history_capacity),
        }
    }

    /// Pick the highest-priority eligible behavior, or `None` to idle.
    ///
    /// Equal priorities resolve to the behavior registered first.
    ///
    /// # Errors
    /// Returns the first condition evaluation error; no behavior is marked
    /// fired in that case.
    pub fn decide(
        &mut self,
        snapshot: &Snapshot,
        memory: &MemorySummary,
    ) -> Result<Option<Decision>> {
        let eligible = self.catalog.eligible(snapshot, memory)?;

        let mut chosen: Option<(usize, i32)> = None;
        for index in eligible {
            let Some(behavior) = self.catalog.at(index) else { continue };
            if chosen.is_none_or(|(_, best)| behavior.priority > best) {
                chosen = Some((index, behavior.priority));
            }
        }

        let Some((index, _)) = chosen else {
            trace!(entity = %snapshot.entity_id, "no eligible behavior");
            return Ok(None);
        };
        let Some(behavior) = self.catalog.at(index) else {
            return Ok(None);
        };
        let Some(action) = behavior.primary_action() else {
            return Ok(None);
        };

        let decision = Decision::new(
            snapshot.entity_id,
            behavior.id.clone(),
            action,
            snapshot.target.map(|t| t.id),
            self.default_confidence,
            snapshot.now,
        );
        self.catalog.mark_fired(index, snapshot.now);
        self.history.push(decision.clone());
        Ok(Some(decision))
    }

    /// Behaviors this engine evaluates.
    #[must_use]
    pub fn catalog(&self) -> &BehaviorCatalog {
        &self.catalog
    }

    /// Mutable catalog, for the priority and cooldown levers.
    pub fn catalog_mut(&mut self) -> &mut BehaviorCatalog {
        &mut self.catalog
    }

    /// Recent decisions.
    #[must_use]
    pub fn history(&self) -> &DecisionHistory {
        &self.history
    }
}
