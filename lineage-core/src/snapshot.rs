//! Per-tick read-only view of an entity, assembled by the host integration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::memory::MemorySummary;
use crate::types::{
    ContextMap, ContextValue, EntityId, EntityKind, Mood, Position, ProfileTag, SimTime,
};

/// The entity's current target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Target entity.
    pub id: EntityId,
    /// Distance from the observer.
    pub distance: f32,
}

/// Everything a policy may look at when deciding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Observer.
    pub entity_id: EntityId,
    /// Observer's kind.
    pub kind: EntityKind,
    /// Observer's behavior profile.
    pub profile: ProfileTag,
    /// Simulation time of the snapshot.
    pub now: SimTime,
    /// World position.
    pub position: Position,
    /// Health as a fraction of max, `[0, 1]`.
    pub health: f32,
    /// Mana as a fraction of max, `[0, 1]`.
    pub mana: f32,
    /// Character level.
    pub level: u32,
    /// Accumulated character experience.
    pub experience: f64,
    /// Current target, if any.
    pub target: Option<TargetInfo>,
    /// Whether a hostile is nearby.
    pub threat_detected: bool,
    /// Discrete situation label: `idle`, `alert`, or `combat`.
    pub state: String,
    /// Emotional modifier folded from recent events.
    pub mood: Mood,
    /// How much other entities have reported the target as a threat, `[0, 1]`.
    pub shared_threat: f32,
    /// Range at which targets are noticed.
    pub detection_range: f32,
    /// Range at which targets can be struck.
    pub attack_range: f32,
    /// Named host flags.
    pub flags: BTreeMap<String, bool>,
}

impl Snapshot {
    /// A neutral snapshot: full health and mana, no target.
    #[must_use]
    pub fn new(entity_id: EntityId, now: SimTime) -> Self {
        Self {
            entity_id,
            kind: EntityKind::default(),
            profile: ProfileTag::default(),
            now,
            position: Position::default(),
            health: 1.0,
            mana: 1.0,
            level: 1,
            experience: 0.0,
            target: None,
            threat_detected: false,
            state: "idle".to_string(),
            mood: Mood::NEUTRAL,
            shared_threat: 0.0,
            detection_range: 15.0,
            attack_range: 2.0,
            flags: BTreeMap::new(),
        }
    }

    /// Set the target and derive `state` from its distance.
    #[must_use]
    pub fn with_target(mut self, target: Option<TargetInfo>) -> Self {
        self.target = target;
        self.state = self.derive_state().to_string();
        self
    }

    /// Set a named flag.
    #[must_use]
    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// `combat` in attack range, `alert` in detection range, else `idle`.
    #[must_use]
    pub fn derive_state(&self) -> &'static str {
        match self.target {
            Some(t) if t.distance <= self.attack_range => "combat",
            Some(t) if t.distance <= self.detection_range => "alert",
            _ => "idle",
        }
    }

    /// Whether the target is within detection range.
    #[must_use]
    pub fn target_in_detection_range(&self) -> bool {
        self.target.is_some_and(|t| t.distance <= self.detection_range)
    }

    /// Whether the target is within attack range.
    #[must_use]
    pub fn target_in_attack_range(&self) -> bool {
        self.target.is_some_and(|t| t.distance <= self.attack_range)
    }

    /// `1` at zero distance, `0` at or past detection range or with no target.
    #[must_use]
    pub fn target_proximity(&self) -> f32 {
        match self.target {
            Some(t) if self.detection_range > 0.0 => {
                (1.0 - t.distance / self.detection_range).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Context map recorded alongside memory entries produced from this snapshot.
    ///
    /// Keys match those read back by the learned backend's feature encoder.
    #[must_use]
    pub fn to_context(&self, memory: &MemorySummary) -> ContextMap {
        let mut ctx = ContextMap::new();
        ctx.insert("health".into(), ContextValue::from(self.health));
        ctx.insert("mana".into(), ContextValue::from(self.mana));
        ctx.insert("level".into(), ContextValue::from(self.level));
        ctx.insert("has_target".into(), ContextValue::from(self.target.is_some()));
        ctx.insert("target_proximity".into(), ContextValue::from(self.target_proximity()));
        ctx.insert("threat_detected".into(), ContextValue::from(self.threat_detected));
        ctx.insert("defensive_bias".into(), ContextValue::from(self.mood.defensive_bias()));
        ctx.insert("confidence".into(), ContextValue::from(self.mood.confidence()));
        ctx.insert("success_rate".into(), ContextValue::from(memory.success_rate));
        ctx.insert("combat_success_rate".into(), ContextValue::from(memory.combat_success_rate));
        ctx.insert("shared_threat".into(), ContextValue::from(self.shared_threat));
        ctx.insert("state".into(), ContextValue::from(self.state.as_str()));
        ctx.insert("profile".into(), ContextValue::from(self.profile.to_string()));
        if let Some(t) = self.target {
            ctx.insert("distance".into(), ContextValue::from(t.distance));
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_follows_target_distance() {
        let id = EntityId::new();
        let near = Snapshot::new(id, 0.0)
            .with_target(Some(TargetInfo { id: EntityId::new(), distance: 1.0 }));
        assert_eq!(near.state, "combat");
        assert!(near.target_in_attack_range());

        let mid = Snapshot::new(id, 0.0)
            .with_target(Some(TargetInfo { id: EntityId::new(), distance: 10.0 }));
        assert_eq!(mid.state, "alert");
        assert!(!mid.target_in_attack_range());
        assert!(mid.target_in_detection_range());

        let none = Snapshot::new(id, 0.0).with_target(None);
        assert_eq!(none.state, "idle");
        assert!(none.target_proximity().abs() < f32::EPSILON);
    }

    #[test]
    fn context_has_feature_keys() {
        let snap = Snapshot::new(EntityId::new(), 0.0);
        let ctx = snap.to_context(&MemorySummary::default());
        assert_eq!(ctx["health"], ContextValue::Number(1.0));
        assert_eq!(ctx["has_target"], ContextValue::Flag(false));
        assert!(!ctx.contains_key("distance"));
    }
}
