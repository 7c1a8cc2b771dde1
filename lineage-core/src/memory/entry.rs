//! Memory entries: "what I did, and how it went".
//!
//! An entry is created whenever an action resolves and is never edited
//! afterwards; the only way it leaves a store is eviction or archival.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContextMap, SimTime};

/// What kind of experience an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// Attacks, chases, flights.
    Combat,
    /// Patrols and wandering.
    Movement,
    /// Learning or using skills, spending stat points.
    SkillUse,
    /// Consuming or equipping items.
    ItemUse,
    /// Idling and passive observation.
    Environment,
    /// Interaction with other entities.
    Social,
}

impl MemoryCategory {
    /// All categories, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Combat,
        Self::Movement,
        Self::SkillUse,
        Self::ItemUse,
        Self::Environment,
        Self::Social,
    ];

    /// Multiplier applied to the base learning value.
    #[must_use]
    pub const fn weight(self) -> f32 {
        match self {
            Self::Combat => 1.5,
            Self::SkillUse => 1.3,
            Self::ItemUse => 1.2,
            Self::Movement => 0.8,
            Self::Environment => 0.7,
            Self::Social => 0.6,
        }
    }

    /// Stable label used in logs and context maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Combat => "combat",
            Self::Movement => "movement",
            Self::SkillUse => "skill_use",
            Self::ItemUse => "item_use",
            Self::Environment => "environment",
            Self::Social => "social",
        }
    }
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Starting point of every learning value before multipliers.
pub const BASE_LEARNING_VALUE: f32 = 0.5;

/// Compute the learning value of an experience, in `[0, 1]`.
///
/// `0.5 × category weight × (1.2 on success, 0.8 on failure)`, then:
/// - outcome `damage_dealt = d` multiplies by `min(1 + d/100, 2)`
/// - outcome `health_lost > 0` multiplies by 1.1
/// - context `skill_used` multiplies by 1.1
/// - context `item_used` multiplies by 1.05
#[must_use]
pub fn learning_value(
    category: MemoryCategory,
    context: &ContextMap,
    outcome: &ContextMap,
    success: bool,
) -> f32 {
    let mut value = f64::from(BASE_LEARNING_VALUE * category.weight());
    value *= if success { 1.2 } else { 0.8 };

    if let Some(damage) = outcome.get("damage_dealt").and_then(|v| v.as_number()) {
        value *= (1.0 + damage.max(0.0) / 100.0).min(2.0);
    }
    if outcome
        .get("health_lost")
        .and_then(|v| v.as_number())
        .is_some_and(|lost| lost > 0.0)
    {
        value *= 1.1;
    }
    if context.contains_key("skill_used") {
        value *= 1.1;
    }
    if context.contains_key("item_used") {
        value *= 1.05;
    }

    clamp_unit(value as f32)
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// A single resolved action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Kind of experience.
    pub category: MemoryCategory,
    /// Simulation time the action resolved.
    pub timestamp: SimTime,
    /// Wall-clock time, for save metadata.
    pub recorded_at: DateTime<Utc>,
    /// Situation the action was taken in.
    pub context: ContextMap,
    /// Action label.
    pub action: String,
    /// What the action produced.
    pub outcome: ContextMap,
    /// Whether the action achieved its aim.
    pub success: bool,
    /// Usefulness for future decisions, in `[0, 1]`.
    pub learning_value: f32,
}

impl MemoryEntry {
    /// Build an entry, deriving its learning value from the inputs.
    #[must_use]
    pub fn new(
        category: MemoryCategory,
        context: ContextMap,
        action: impl Into<String>,
        outcome: ContextMap,
        success: bool,
        timestamp: SimTime,
    ) -> Self {
        let value = learning_value(category, &context, &outcome, success);
        Self::with_learning_value(category, context, action, outcome, success, timestamp, value)
    }

    /// Build an entry with an explicit learning value (clamped to `[0, 1]`).
    #[must_use]
    pub fn with_learning_value(
        category: MemoryCategory,
        context: ContextMap,
        action: impl Into<String>,
        outcome: ContextMap,
        success: bool,
        timestamp: SimTime,
        learning_value: f32,
    ) -> Self {
        Self {
            category,
            timestamp,
            recorded_at: Utc::now(),
            context,
            action: action.into(),
            outcome,
            success,
            learning_value: clamp_unit(learning_value),
        }
    }

    /// Seconds between this entry and `now`, never negative.
    #[must_use]
    pub fn age(&self, now: SimTime) -> f64 {
        (now - self.timestamp).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContextValue;

    fn bare(category: MemoryCategory, success: bool) -> f32 {
        learning_value(category, &ContextMap::new(), &ContextMap::new(), success)
    }

    fn map(pairs: &[(&str, ContextValue)]) -> ContextMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn successful_combat_value() {
        let v = bare(MemoryCategory::Combat, true);
        assert!((v - 0.9).abs() < 1e-6, "0.5 * 1.5 * 1.2 = 0.9, got {v}");
    }

    #[test]
    fn failed_social_value() {
        let v = bare(MemoryCategory::Social, false);
        assert!((v - 0.24).abs() < 1e-6);
    }

    #[test]
    fn damage_bonus_caps_at_double() {
        let outcome = map(&[("damage_dealt", ContextValue::Number(500.0))]);
        let v = learning_value(MemoryCategory::Movement, &ContextMap::new(), &outcome, true);
        // 0.5 * 0.8 * 1.2 * 2.0
        assert!((v - 0.96).abs() < 1e-6);
    }

    #[test]
    fn stacked_bonuses_clamp_to_one() {
        let context = map(&[
            ("skill_used", ContextValue::from("fireball")),
            ("item_used", ContextValue::from("staff")),
        ]);
        let outcome = map(&[
            ("damage_dealt", ContextValue::Number(80.0)),
            ("health_lost", ContextValue::Number(12.0)),
        ]);
        let v = learning_value(MemoryCategory::Combat, &context, &outcome, true);
        assert!((v - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn health_lost_zero_gives_no_bonus() {
        let outcome = map(&[("health_lost", ContextValue::Number(0.0))]);
        let plain = bare(MemoryCategory::ItemUse, true);
        let v = learning_value(MemoryCategory::ItemUse, &ContextMap::new(), &outcome, true);
        assert!((v - plain).abs() < f32::EPSILON);
    }

    #[test]
    fn explicit_value_is_clamped() {
        let e = MemoryEntry::with_learning_value(
            MemoryCategory::Combat,
            ContextMap::new(),
            "attack",
            ContextMap::new(),
            true,
            0.0,
            7.5,
        );
        assert!((e.learning_value - 1.0).abs() < f32::EPSILON);
        assert!(clamp_unit(f32::NAN).abs() < f32::EPSILON);
    }
}
