//! Named-event bus and the domain events the registry understands.
//!
//! Payloads are plain key/value maps so hosts can emit events without
//! depending on any type from this crate. [`DomainEvent`] gives the typed
//! view used by the mood ledger.

use std::collections::HashMap;
use std::sync::Arc;

use lineage_core::types::{ContextMap, ContextValue, EntityId};
use parking_lot::RwLock;
use uuid::Uuid;

/// Key/value payload of an event.
pub type EventPayload = ContextMap;

type Handler = Arc<dyn Fn(&EventPayload) + Send + Sync>;

/// Synchronous publish/subscribe by event name.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

impl EventBus {
    /// A bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every future `event_name` emission.
    pub fn subscribe<F>(&self, event_name: &str, handler: F)
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(event_name.to_string())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Deliver `payload` to every subscriber of `event_name`, in
    /// subscription order. Returns how many handlers ran.
    ///
    /// Handlers run after the lock is released, so they may emit or
    /// subscribe themselves.
    pub fn emit(&self, event_name: &str, payload: &EventPayload) -> usize {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(event_name)
            .map(|v| v.to_vec())
            .unwrap_or_default();
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Emit a typed event under its canonical name.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        self.emit(event.name(), &event.to_payload())
    }

    /// Subscribers registered for `event_name`.
    #[must_use]
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.handlers.read().get(event_name).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let mut names: Vec<&String> = handlers.keys().collect();
        names.sort();
        f.debug_struct("EventBus").field("events", &names).finish()
    }
}

// ---------------------------------------------------------------------------
// Domain events
// ---------------------------------------------------------------------------

/// Events that shape an entity's mood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainEvent {
    /// Lost `amount` of max health (fraction).
    EntityDamaged {
        /// Who was hurt.
        entity: EntityId,
        /// Fraction of max health lost.
        amount: f32,
    },
    /// Regained `amount` of max health (fraction).
    EntityHealed {
        /// Who was healed.
        entity: EntityId,
        /// Fraction of max health restored.
        amount: f32,
    },
    /// Picked up an item.
    ItemAcquired {
        /// Who received it.
        entity: EntityId,
    },
    /// Learned a skill.
    SkillLearned {
        /// Who learned it.
        entity: EntityId,
    },
    /// Gained a level.
    LevelUp {
        /// Who levelled.
        entity: EntityId,
    },
    /// Entered combat.
    CombatStarted {
        /// Who is fighting.
        entity: EntityId,
    },
    /// Left combat.
    CombatEnded {
        /// Who was fighting.
        entity: EntityId,
        /// Whether they won.
        won: bool,
    },
}

impl DomainEvent {
    /// Every event name, in declaration order.
    pub const NAMES: [&'static str; 7] = [
        "entity_damaged",
        "entity_healed",
        "item_acquired",
        "skill_learned",
        "level_up",
        "combat_started",
        "combat_ended",
    ];

    /// Canonical bus name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EntityDamaged { .. } => "entity_damaged",
            Self::EntityHealed { .. } => "entity_healed",
            Self::ItemAcquired { .. } => "item_acquired",
            Self::SkillLearned { .. } => "skill_learned",
            Self::LevelUp { .. } => "level_up",
            Self::CombatStarted { .. } => "combat_started",
            Self::CombatEnded { .. } => "combat_ended",
        }
    }

    /// Entity the event is about.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        match self {
            Self::EntityDamaged { entity, .. }
            | Self::EntityHealed { entity, .. }
            | Self::ItemAcquired { entity }
            | Self::SkillLearned { entity }
            | Self::LevelUp { entity }
            | Self::CombatStarted { entity }
            | Self::CombatEnded { entity, .. } => *entity,
        }
    }

    /// Flatten into a payload: `entity` as text, plus `amount` or `won`.
    #[must_use]
    pub fn to_payload(&self) -> EventPayload {
        let mut payload = EventPayload::new();
        payload.insert("entity".into(), ContextValue::Text(self.entity().to_string()));
        match self {
            Self::EntityDamaged { amount, .. } | Self::EntityHealed { amount, .. } => {
                payload.insert("amount".into(), ContextValue::from(*amount));
            }
            Self::CombatEnded { won, .. } => {
                payload.insert("won".into(), ContextValue::Flag(*won));
            }
            _ => {}
        }
        payload
    }

    /// Parse a payload emitted under `name`.
    ///
    /// `None` for unknown names or a missing or malformed `entity` key.
    /// Missing `amount` reads as 0 and missing `won` as false.
    #[must_use]
    pub fn from_payload(name: &str, payload: &EventPayload) -> Option<Self> {
        let entity = payload
            .get("entity")
            .and_then(ContextValue::as_text)
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(EntityId)?;
        let amount = payload
            .get("amount")
            .and_then(ContextValue::as_number)
            .unwrap_or(0.0) as f32;
        let won = payload.get("won").and_then(ContextValue::as_flag).unwrap_or(false);

        Some(match name {
            "entity_damaged" => Self::EntityDamaged { entity, amount },
            "entity_healed" => Self::EntityHealed { entity, amount },
            "item_acquired" => Self::ItemAcquired { entity },
            "skill_learned" => Self::SkillLearned { entity },
            "level_up" => Self::LevelUp { entity },
            "combat_started" => Self::CombatStarted { entity },
            "combat_ended" => Self::CombatEnded { entity, won },
            _ => return None,
        })
    }
}
