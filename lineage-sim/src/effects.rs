//! Turning a [`Decision`] into collaborator calls.
//!
//! Every handler reports an [`EffectOutcome`] that is recorded as a memory
//! entry. Handlers only act when there is something to do, so re-running
//! one against unchanged game state does nothing and reports failure.

use lineage_core::action::Action;
use lineage_core::decision::Decision;
use lineage_core::error::{LineageError, Result};
use lineage_core::snapshot::Snapshot;
use lineage_core::types::{ContextMap, ContextValue, EntityId, ProfileTag, Tendency};

use crate::collaborators::{Collaborators, EquipSlot, Item, ItemKind, SkillSchool, StatKind};
use crate::config::IntegrationConfig;
use crate::events::{DomainEvent, EventBus};

/// What applying a decision produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOutcome {
    /// Whether the action achieved its aim.
    pub success: bool,
    /// Outcome fields recorded with the memory entry.
    pub outcome: ContextMap,
    /// Extra context fields (`skill_used`, `item_used`).
    pub context: ContextMap,
}

impl EffectOutcome {
    fn new(success: bool) -> Self {
        Self {
            success,
            ..Self::default()
        }
    }

    fn with(mut self, key: &str, value: impl Into<ContextValue>) -> Self {
        self.outcome.insert(key.to_string(), value.into());
        self
    }

    fn with_context(mut self, key: &str, value: impl Into<ContextValue>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    fn skipped(reason: &str) -> Self {
        Self::new(false).with("reason", reason)
    }
}

/// Everything a handler may touch.
#[derive(Debug, Clone, Copy)]
pub struct EffectContext<'a> {
    /// Game systems.
    pub collaborators: &'a Collaborators,
    /// Thresholds.
    pub config: &'a IntegrationConfig,
    /// For follow-up events.
    pub bus: &'a EventBus,
    /// Personality leaning of the acting entity.
    pub tendency: Tendency,
    /// Behavior profile of the acting entity.
    pub profile: ProfileTag,
}

/// Apply `decision`, taken against `snapshot`.
///
/// # Errors
/// Returns [`LineageError::EffectFailed`] if an action that needs a target
/// has none.
pub fn apply(
    decision: &Decision,
    snapshot: &Snapshot,
    ctx: &EffectContext<'_>,
) -> Result<EffectOutcome> {
    let id = decision.entity_id;
    if decision.action.needs_target() && decision.target.is_none() {
        return Err(LineageError::EffectFailed {
            action: decision.action.as_str().to_string(),
            reason: "no target".to_string(),
        });
    }

    Ok(match decision.action {
        Action::Attack => attack(decision, ctx),
        Action::Heal => consume_restorative(
            id,
            ItemKind::HealthPotion,
            snapshot.health,
            ctx.config.heal_threshold,
            ctx,
        ),
        Action::RestoreMana => consume_restorative(
            id,
            ItemKind::ManaPotion,
            snapshot.mana,
            ctx.config.mana_threshold,
            ctx,
        ),
        Action::EquipBest => equip_best(id, ctx),
        Action::DistributeStatPoints => distribute_stat_points(id, ctx),
        Action::LearnSkill => learn_skill(id, ctx),
        Action::Patrol | Action::Wander | Action::Explore | Action::Chase | Action::Flee => {
            let distance = ctx.config.move_speed * ctx.config.decision_interval as f32;
            EffectOutcome::new(true).with("distance_covered", distance)
        }
        Action::Defend | Action::Interact | Action::Idle => EffectOutcome::new(true),
    })
}

fn attack(decision: &Decision, ctx: &EffectContext<'_>) -> EffectOutcome {
    let Some(target) = decision.target else {
        return EffectOutcome::skipped("no_target");
    };
    let result = ctx.collaborators.combat.attack(decision.entity_id, target);
    if result.target_defeated {
        ctx.bus.publish(&DomainEvent::CombatEnded { entity: decision.entity_id, won: true });
    }
    EffectOutcome::new(result.hit)
        .with("damage_dealt", result.damage_dealt)
        .with("target_defeated", result.target_defeated)
}

fn consume_restorative(
    id: EntityId,
    kind: ItemKind,
    current: f32,
    threshold: f32,
    ctx: &EffectContext<'_>,
) -> EffectOutcome {
    if current >= threshold {
        return EffectOutcome::skipped("not_needed");
    }
    let best = ctx
        .collaborators
        .inventory
        .list_items(id)
        .into_iter()
        .filter(|i| i.kind == kind)
        .max_by(|a, b| a.potency.total_cmp(&b.potency));
    let Some(item) = best else {
        return EffectOutcome::skipped("no_item");
    };
    if !ctx.collaborators.inventory.consume(id, &item.item_ref) {
        return EffectOutcome::skipped("consume_failed");
    }
    if kind == ItemKind::HealthPotion {
        let amount = item.potency.clamp(0.0, 1.0);
        ctx.bus.publish(&DomainEvent::EntityHealed { entity: id, amount });
    }
    EffectOutcome::new(true)
        .with("restored", item.potency)
        .with_context("item_used", item.item_ref)
}

/// Strongest item of `kind` by `rating`, and whether it beats the equipped one.
fn upgrade<'i>(items: &'i [Item], kind: ItemKind, rating: fn(&Item) -> f32) -> Option<&'i Item> {
    let equipped = items
        .iter()
        .filter(|i| i.kind == kind && i.equipped)
        .map(rating)
        .fold(None, |best: Option<f32>, r| Some(best.map_or(r, |b| b.max(r))));
    let best = items
        .iter()
        .filter(|i| i.kind == kind && !i.equipped)
        .max_by(|a, b| rating(a).total_cmp(&rating(b)))?;
    match equipped {
        Some(current) if rating(best) <= current => None,
        _ => Some(best),
    }
}

fn equip_best(id: EntityId, ctx: &EffectContext<'_>) -> EffectOutcome {
    let inventory = &ctx.collaborators.inventory;
    let items = inventory.list_items(id);
    let mut equipped = Vec::new();

    if let Some(weapon) = upgrade(&items, ItemKind::Weapon, |i| i.power) {
        if inventory.equip(id, &weapon.item_ref, EquipSlot::Weapon) {
            equipped.push(weapon.item_ref.clone());
        }
    }
    if let Some(armor) = upgrade(&items, ItemKind::Armor, |i| i.defense) {
        if inventory.equip(id, &armor.item_ref, EquipSlot::Armor) {
            equipped.push(armor.item_ref.clone());
        }
    }

    if equipped.is_empty() {
        return EffectOutcome::skipped("nothing_better");
    }
    EffectOutcome::new(true)
        .with("equipped", equipped.join(","))
        .with_context("item_used", equipped[0].clone())
}

/// Stat order an entity spends points in.
#[must_use]
pub fn stat_preference(tendency: Tendency) -> &'static [StatKind] {
    match tendency {
        Tendency::Aggressive => &[StatKind::Strength, StatKind::Agility],
        Tendency::Defensive => &[StatKind::Vitality, StatKind::Strength],
        Tendency::Explorative => &[StatKind::Agility, StatKind::Intelligence],
        Tendency::Social => &[StatKind::Intelligence, StatKind::Vitality],
        Tendency::Balanced => &StatKind::ALL,
    }
}

fn distribute_stat_points(id: EntityId, ctx: &EffectContext<'_>) -> EffectOutcome {
    let order = stat_preference(ctx.tendency);
    let mut spent = 0u32;
    for stat in order.iter().cycle().take(ctx.config.max_stat_points_per_tick as usize) {
        if !ctx.collaborators.stats.distribute_stat_point(id, *stat) {
            break;
        }
        spent += 1;
    }
    if spent == 0 {
        return EffectOutcome::skipped("no_points");
    }
    EffectOutcome::new(true)
        .with("points_spent", spent)
        .with("primary_stat", order[0].as_str())
}

/// Skill school an entity looks for first, if any.
#[must_use]
pub fn school_preference(tendency: Tendency, profile: ProfileTag) -> Option<SkillSchool> {
    match (tendency, profile) {
        (Tendency::Aggressive, _) => Some(SkillSchool::Combat),
        (Tendency::Defensive, _) => Some(SkillSchool::Defense),
        (Tendency::Explorative, _) => Some(SkillSchool::Utility),
        (Tendency::Social, _) => Some(SkillSchool::Social),
        (Tendency::Balanced, ProfileTag::Scholar) => Some(SkillSchool::Magic),
        (Tendency::Balanced, _) => None,
    }
}

fn learn_skill(id: EntityId, ctx: &EffectContext<'_>) -> EffectOutcome {
    let skills = &ctx.collaborators.skills;
    let known = skills.list_known(id);
    let candidates: Vec<_> = skills
        .list_available(id)
        .into_iter()
        .filter(|s| !known.contains(&s.skill_ref))
        .collect();

    let preferred = school_preference(ctx.tendency, ctx.profile);
    let choice = preferred
        .and_then(|school| candidates.iter().find(|s| s.school == school))
        .or_else(|| candidates.first());
    let Some(skill) = choice else {
        return EffectOutcome::skipped("nothing_to_learn");
    };
    if !skills.learn(id, &skill.skill_ref) {
        return EffectOutcome::skipped("learn_failed");
    }
    ctx.bus.publish(&DomainEvent::SkillLearned { entity: id });
    EffectOutcome::new(true)
        .with("result", "skill_learned")
        .with("skill_learned", skill.skill_ref.clone())
        .with_context("skill_used", skill.skill_ref.clone())
        .with_context("skill_name", skill.skill_ref.clone())
}
