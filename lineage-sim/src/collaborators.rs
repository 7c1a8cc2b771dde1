//! Contracts of the game systems the registry reads from and acts on.
//!
//! The host implements these over its own ECS or data model. All methods
//! take `&self`: implementations use interior mutability, which lets one
//! world object back all four traits.

use std::sync::Arc;

use lineage_core::snapshot::TargetInfo;
use lineage_core::types::{EntityId, Position};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Attribute a stat point can be spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Melee damage.
    Strength,
    /// Speed and evasion.
    Agility,
    /// Spell power and mana.
    Intelligence,
    /// Maximum health.
    Vitality,
}

impl StatKind {
    /// Every stat, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Strength, Self::Agility, Self::Intelligence, Self::Vitality];

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Agility => "agility",
            Self::Intelligence => "intelligence",
            Self::Vitality => "vitality",
        }
    }
}

/// Health, mana, level and stat allocation.
pub trait StatsProvider: Send + Sync {
    /// Health as a fraction of max; `None` if the entity is unknown.
    fn get_health_fraction(&self, id: EntityId) -> Option<f32>;
    /// Mana as a fraction of max.
    fn get_mana_fraction(&self, id: EntityId) -> f32;
    /// Character level.
    fn get_level(&self, id: EntityId) -> u32;
    /// Accumulated experience points.
    fn get_experience(&self, id: EntityId) -> f64;
    /// Spend one unspent point on `stat`. `false` if none are left.
    fn distribute_stat_point(&self, id: EntityId, stat: StatKind) -> bool;
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Broad item class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Equippable in the weapon slot; compared by `power`.
    Weapon,
    /// Equippable in the armor slot; compared by `defense`.
    Armor,
    /// Restores health by `potency`.
    HealthPotion,
    /// Restores mana by `potency`.
    ManaPotion,
    /// Anything else.
    Misc,
}

/// Equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// Main hand.
    Weapon,
    /// Body.
    Armor,
}

/// An inventory entry as the core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Host handle for the item.
    pub item_ref: String,
    /// Item class.
    pub kind: ItemKind,
    /// Offensive rating.
    pub power: f32,
    /// Defensive rating.
    pub defense: f32,
    /// Restoration amount for consumables.
    pub potency: f32,
    /// Whether it is currently equipped.
    pub equipped: bool,
}

/// Items, equipping and consuming.
pub trait InventoryProvider: Send + Sync {
    /// Everything the entity carries.
    fn list_items(&self, id: EntityId) -> Vec<Item>;
    /// Equip `item_ref` into `slot`.
    fn equip(&self, id: EntityId, item_ref: &str, slot: EquipSlot) -> bool;
    /// Use up `item_ref`.
    fn consume(&self, id: EntityId, item_ref: &str) -> bool;
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// Skill family, matched against an entity's tendency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillSchool {
    /// Weapon techniques.
    Combat,
    /// Guards and wards.
    Defense,
    /// Spells.
    Magic,
    /// Movement and survival.
    Utility,
    /// Persuasion and leadership.
    Social,
}

/// A skill the entity could learn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    /// Host handle for the skill.
    pub skill_ref: String,
    /// Family.
    pub school: SkillSchool,
}

/// Known and learnable skills.
pub trait SkillProvider: Send + Sync {
    /// Skills already known.
    fn list_known(&self, id: EntityId) -> Vec<String>;
    /// Skills the entity currently qualifies for.
    fn list_available(&self, id: EntityId) -> Vec<SkillInfo>;
    /// Learn `skill_ref`.
    fn learn(&self, id: EntityId, skill_ref: &str) -> bool;
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// Result of one attack.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// Whether the attack connected.
    pub hit: bool,
    /// Damage dealt, in health points.
    pub damage_dealt: f32,
    /// Whether the target died.
    pub target_defeated: bool,
}

/// Positions, targeting and attacks.
///
/// The host's combat system is also expected to emit `entity_damaged` and
/// `entity_healed` on the event bus.
pub trait CombatProvider: Send + Sync {
    /// World position.
    fn position(&self, id: EntityId) -> Option<Position>;
    /// Current target and its distance.
    fn current_target(&self, id: EntityId) -> Option<TargetInfo>;
    /// Whether a hostile is nearby.
    fn threat_detected(&self, id: EntityId) -> bool;
    /// Attack `target`.
    fn attack(&self, id: EntityId, target: EntityId) -> AttackOutcome;
}

/// The four collaborators, shared.
#[derive(Clone)]
pub struct Collaborators {
    /// Stats system.
    pub stats: Arc<dyn StatsProvider>,
    /// Inventory system.
    pub inventory: Arc<dyn InventoryProvider>,
    /// Skills system.
    pub skills: Arc<dyn SkillProvider>,
    /// Combat system.
    pub combat: Arc<dyn CombatProvider>,
}

impl Collaborators {
    /// Use one world object for every collaborator.
    pub fn from_world<W>(world: Arc<W>) -> Self
    where
        W: StatsProvider + InventoryProvider + SkillProvider + CombatProvider + 'static,
    {
        Self {
            stats: Arc::clone(&world) as Arc<dyn StatsProvider>,
            inventory: Arc::clone(&world) as Arc<dyn InventoryProvider>,
            skills: Arc::clone(&world) as Arc<dyn SkillProvider>,
            combat: world,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
