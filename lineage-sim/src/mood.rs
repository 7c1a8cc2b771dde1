//! Per-entity PAD mood folded from domain events.
//!
//! Only tracked (registered) entities accumulate mood; events about anyone
//! else are ignored. Moods relax toward neutral every tick.

use std::collections::HashMap;

use lineage_core::types::{EntityId, Mood};
use parking_lot::Mutex;

use crate::events::DomainEvent;

/// Shared mood table.
#[derive(Debug, Default)]
pub struct MoodLedger {
    moods: Mutex<HashMap<EntityId, Mood>>,
}

impl MoodLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `id` at a neutral mood.
    pub fn track(&self, id: EntityId) {
        self.moods.lock().insert(id, Mood::NEUTRAL);
    }

    /// Stop tracking `id`.
    pub fn untrack(&self, id: EntityId) {
        self.moods.lock().remove(&id);
    }

    /// Current mood; neutral if untracked.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Mood {
        self.moods.lock().get(&id).copied().unwrap_or(Mood::NEUTRAL)
    }

    /// Fold `event` into its entity's mood. Returns whether it was tracked.
    pub fn apply(&self, event: &DomainEvent) -> bool {
        let mut moods = self.moods.lock();
        let Some(mood) = moods.get_mut(&event.entity()) else {
            return false;
        };
        let (p, a, d) = shift_for(event);
        *mood = mood.shifted(p, a, d);
        true
    }

    /// Move every mood toward neutral by `rate * dt` of the remaining gap.
    pub fn decay(&self, dt: f64, rate: f32) {
        let t = (rate * dt as f32).clamp(0.0, 1.0);
        if t <= 0.0 {
            return;
        }
        for mood in self.moods.lock().values_mut() {
            *mood = mood.lerp(&Mood::NEUTRAL, t);
        }
    }

    /// Tracked entity count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moods.lock().len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moods.lock().is_empty()
    }
}

/// `(pleasure, arousal, dominance)` delta for an event.
fn shift_for(event: &DomainEvent) -> (f32, f32, f32) {
    match *event {
        DomainEvent::EntityDamaged { amount, .. } => {
            let s = 0.5 + amount.clamp(0.0, 1.0);
            (-0.2 * s, 0.2 * s, -0.25 * s)
        }
        DomainEvent::EntityHealed { amount, .. } => {
            let s = 0.5 + amount.clamp(0.0, 1.0);
            (0.15 * s, -0.1 * s, 0.1 * s)
        }
        DomainEvent::ItemAcquired { .. } => (0.1, 0.05, 0.0),
        DomainEvent::SkillLearned { .. } => (0.1, 0.0, 0.15),
        DomainEvent::LevelUp { .. } => (0.2, 0.1, 0.2),
        DomainEvent::CombatStarted { .. } => (0.0, 0.3, 0.0),
        DomainEvent::CombatEnded { won: true, .. } => (0.2, -0.2, 0.2),
        DomainEvent::CombatEnded { won: false, .. } => (-0.2, -0.1, -0.3),
    }
}
