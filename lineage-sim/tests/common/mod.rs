//! In-memory game world backing every collaborator trait.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use lineage_core::snapshot::TargetInfo;
use lineage_core::types::{EntityId, Position};
use lineage_sim::collaborators::{
    AttackOutcome, Collaborators, CombatProvider, EquipSlot, InventoryProvider, Item, ItemKind,
    SkillInfo, SkillProvider, StatKind, StatsProvider,
};
use lineage_sim::config::SimConfig;
use parking_lot::Mutex;

/// Per-entity state in the fake world.
#[derive(Debug, Clone)]
pub struct Body {
    pub health: f32,
    pub mana: f32,
    pub level: u32,
    pub experience: f64,
    pub stat_points: u32,
    pub spent: Vec<StatKind>,
    pub items: Vec<Item>,
    pub known: Vec<String>,
    pub available: Vec<SkillInfo>,
    pub position: Position,
    pub target: Option<TargetInfo>,
    pub threat: bool,
    pub attack: AttackOutcome,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            health: 1.0,
            mana: 1.0,
            level: 1,
            experience: 0.0,
            stat_points: 0,
            spent: Vec::new(),
            items: Vec::new(),
            known: Vec::new(),
            available: Vec::new(),
            position: Position::default(),
            target: None,
            threat: false,
            attack: AttackOutcome::default(),
        }
    }
}

#[derive(Default)]
pub struct FakeWorld {
    bodies: Mutex<HashMap<EntityId, Body>>,
    panic_for: Mutex<Option<EntityId>>,
    pub attacks: Mutex<Vec<(EntityId, EntityId)>>,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn spawn(&self, id: EntityId, body: Body) {
        self.bodies.lock().insert(id, body);
    }

    pub fn edit(&self, id: EntityId, f: impl FnOnce(&mut Body)) {
        if let Some(body) = self.bodies.lock().get_mut(&id) {
            f(body);
        }
    }

    pub fn body(&self, id: EntityId) -> Body {
        self.bodies.lock().get(&id).cloned().expect("entity spawned")
    }

    /// Make every stats read for `id` panic.
    pub fn panic_on(&self, id: EntityId) {
        *self.panic_for.lock() = Some(id);
    }
}

impl StatsProvider for FakeWorld {
    fn get_health_fraction(&self, id: EntityId) -> Option<f32> {
        let poisoned = *self.panic_for.lock() == Some(id);
        assert!(!poisoned, "stats system exploded for {id}");
        self.bodies.lock().get(&id).map(|b| b.health)
    }

    fn get_mana_fraction(&self, id: EntityId) -> f32 {
        self.bodies.lock().get(&id).map_or(0.0, |b| b.mana)
    }

    fn get_level(&self, id: EntityId) -> u32 {
        self.bodies.lock().get(&id).map_or(0, |b| b.level)
    }

    fn get_experience(&self, id: EntityId) -> f64 {
        self.bodies.lock().get(&id).map_or(0.0, |b| b.experience)
    }

    fn distribute_stat_point(&self, id: EntityId, stat: StatKind) -> bool {
        let mut bodies = self.bodies.lock();
        let Some(body) = bodies.get_mut(&id) else {
            return false;
        };
        if body.stat_points == 0 {
            return false;
        }
        body.stat_points -= 1;
        body.spent.push(stat);
        true
    }
}

impl InventoryProvider for FakeWorld {
    fn list_items(&self, id: EntityId) -> Vec<Item> {
        self.bodies.lock().get(&id).map(|b| b.items.clone()).unwrap_or_default()
    }

    fn equip(&self, id: EntityId, item_ref: &str, slot: EquipSlot) -> bool {
        let kind = match slot {
            EquipSlot::Weapon => ItemKind::Weapon,
            EquipSlot::Armor => ItemKind::Armor,
        };
        let mut bodies = self.bodies.lock();
        let Some(body) = bodies.get_mut(&id) else {
            return false;
        };
        if !body.items.iter().any(|i| i.item_ref == item_ref && i.kind == kind) {
            return false;
        }
        for item in body.items.iter_mut().filter(|i| i.kind == kind) {
            item.equipped = item.item_ref == item_ref;
        }
        true
    }

    fn consume(&self, id: EntityId, item_ref: &str) -> bool {
        let mut bodies = self.bodies.lock();
        let Some(body) = bodies.get_mut(&id) else {
            return false;
        };
        let Some(index) = body.items.iter().position(|i| i.item_ref == item_ref) else {
            return false;
        };
        let item = body.items.remove(index);
        match item.kind {
            ItemKind::HealthPotion => body.health = (body.health + item.potency).min(1.0),
            ItemKind::ManaPotion => body.mana = (body.mana + item.potency).min(1.0),
            _ => {}
        }
        true
    }
}

impl SkillProvider for FakeWorld {
    fn list_known(&self, id: EntityId) -> Vec<String> {
        self.bodies.lock().get(&id).map(|b| b.known.clone()).unwrap_or_default()
    }

    fn list_available(&self, id: EntityId) -> Vec<SkillInfo> {
        self.bodies.lock().get(&id).map(|b| b.available.clone()).unwrap_or_default()
    }

    fn learn(&self, id: EntityId, skill_ref: &str) -> bool {
        let mut bodies = self.bodies.lock();
        let Some(body) = bodies.get_mut(&id) else {
            return false;
        };
        if body.known.iter().any(|k| k == skill_ref) {
            return false;
        }
        body.known.push(skill_ref.to_string());
        true
    }
}

impl CombatProvider for FakeWorld {
    fn position(&self, id: EntityId) -> Option<Position> {
        self.bodies.lock().get(&id).map(|b| b.position)
    }

    fn current_target(&self, id: EntityId) -> Option<TargetInfo> {
        self.bodies.lock().get(&id).and_then(|b| b.target)
    }

    fn threat_detected(&self, id: EntityId) -> bool {
        self.bodies.lock().get(&id).is_some_and(|b| b.threat)
    }

    fn attack(&self, id: EntityId, target: EntityId) -> AttackOutcome {
        self.attacks.lock().push((id, target));
        self.bodies.lock().get(&id).map(|b| b.attack).unwrap_or_default()
    }
}

pub fn collaborators(world: &Arc<FakeWorld>) -> Collaborators {
    Collaborators::from_world(Arc::clone(world))
}

/// Defaults with the SQLite store and the training worker switched off.
pub fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.core.persistence.enabled = false;
    config.core.training.enabled = false;
    config
}

pub fn weapon(item_ref: &str, power: f32, equipped: bool) -> Item {
    Item {
        item_ref: item_ref.to_string(),
        kind: ItemKind::Weapon,
        power,
        defense: 0.0,
        potency: 0.0,
        equipped,
    }
}

pub fn armor(item_ref: &str, defense: f32, equipped: bool) -> Item {
    Item {
        item_ref: item_ref.to_string(),
        kind: ItemKind::Armor,
        power: 0.0,
        defense,
        potency: 0.0,
        equipped,
    }
}

pub fn potion(item_ref: &str, kind: ItemKind, potency: f32) -> Item {
    Item {
        item_ref: item_ref.to_string(),
        kind,
        power: 0.0,
        defense: 0.0,
        potency,
        equipped: false,
    }
}
