//! Effect handlers and snapshot assembly, called directly.

mod common;

use common::{Body, FakeWorld, armor, collaborators, potion, weapon};
use lineage_core::LineageError;
use lineage_core::action::Action;
use lineage_core::config::DecisionConfig;
use lineage_core::decision::Decision;
use lineage_core::knowledge::SharedKnowledge;
use lineage_core::snapshot::{Snapshot, TargetInfo};
use lineage_core::types::{EntityId, EntityKind, Mood, Position, ProfileTag, Tendency};
use lineage_sim::collaborators::{Collaborators, ItemKind, SkillInfo, SkillSchool, StatKind};
use lineage_sim::config::IntegrationConfig;
use lineage_sim::effects::{self, EffectContext, school_preference, stat_preference};
use lineage_sim::events::EventBus;
use lineage_sim::integration::{SnapshotSources, SnapshotSubject, build_snapshot};

fn decide(id: EntityId, action: Action, target: Option<EntityId>) -> Decision {
    Decision::new(id, "test", action, target, 0.8, 0.0)
}

fn ctx<'a>(
    collaborators: &'a Collaborators,
    config: &'a IntegrationConfig,
    bus: &'a EventBus,
) -> EffectContext<'a> {
    EffectContext {
        collaborators,
        config,
        bus,
        tendency: Tendency::Balanced,
        profile: ProfileTag::Balanced,
    }
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn equip_best_is_idempotent() {
    let world = FakeWorld::new();
    let id = EntityId::new();
    world.spawn(
        id,
        Body {
            items: vec![
                weapon("club", 2.0, true),
                weapon("axe", 6.0, false),
                armor("leather", 1.0, true),
            ],
            ..Body::default()
        },
    );
    let collaborators = collaborators(&world);
    let config = IntegrationConfig::default();
    let bus = EventBus::new();
    let ctx = ctx(&collaborators, &config, &bus);
    let snapshot = Snapshot::new(id, 0.0);

    let equip = decide(id, Action::EquipBest, None);
    let first = effects::apply(&equip, &snapshot, &ctx).expect("apply");
    assert!(first.success);
    let after_first = world.body(id).items;

    let second = effects::apply(&equip, &snapshot, &ctx).expect("apply");
    assert!(!second.success);
    assert_eq!(world.body(id).items, after_first);
}

#[test]
fn equal_gear_is_not_an_upgrade() {
    let world = FakeWorld::new();
    let id = EntityId::new();
    world.spawn(
        id,
        Body {
            items: vec![weapon("a", 5.0, true), weapon("b", 5.0, false)],
            ..Body::default()
        },
    );
    let collaborators = collaborators(&world);
    let config = IntegrationConfig::default();
    let bus = EventBus::new();
    let ctx = ctx(&collaborators, &config, &bus);
    let equip = decide(id, Action::EquipBest, None);
    let outcome = effects::apply(&equip, &Snapshot::new(id, 0.0), &ctx).expect("apply");
    assert!(!outcome.success);
}

#[test]
fn potions_only_below_threshold() {
    let world = FakeWorld::new();
    let id = EntityId::new();
    world.spawn(
        id,
        Body {
            mana: 0.5,
            items: vec![potion("blue", ItemKind::ManaPotion, 0.4)],
            ..Body::default()
        },
    );
    let collaborators = collaborators(&world);
    let config = IntegrationConfig::default();
    let bus = EventBus::new();
    let ctx = ctx(&collaborators, &config, &bus);

    let mut snapshot = Snapshot::new(id, 0.0);
    snapshot.mana = 0.5;
    let restore = decide(id, Action::RestoreMana, None);
    let skipped = effects::apply(&restore, &snapshot, &ctx).expect("apply");
    assert!(!skipped.success);
    assert_eq!(world.body(id).items.len(), 1);

    snapshot.mana = 0.1;
    let used = effects::apply(&restore, &snapshot, &ctx).expect("apply");
    assert!(used.success);
    assert!(world.body(id).items.is_empty());
}

#[test]
fn attack_without_target_is_an_error() {
    let world = FakeWorld::new();
    let id = EntityId::new();
    world.spawn(id, Body::default());
    let collaborators = collaborators(&world);
    let config = IntegrationConfig::default();
    let bus = EventBus::new();

    let ctx = ctx(&collaborators, &config, &bus);
    let attack = decide(id, Action::Attack, None);
    let result = effects::apply(&attack, &Snapshot::new(id, 0.0), &ctx);
    assert!(matches!(result, Err(LineageError::EffectFailed { .. })));
    assert!(world.attacks.lock().is_empty());
}

#[test]
fn known_skills_are_not_relearned() {
    let world = FakeWorld::new();
    let id = EntityId::new();
    world.spawn(
        id,
        Body {
            known: vec!["parry".into()],
            available: vec![SkillInfo { skill_ref: "parry".into(), school: SkillSchool::Defense }],
            ..Body::default()
        },
    );
    let collaborators = collaborators(&world);
    let config = IntegrationConfig::default();
    let bus = EventBus::new();
    let ctx = ctx(&collaborators, &config, &bus);
    let learn = decide(id, Action::LearnSkill, None);
    let outcome = effects::apply(&learn, &Snapshot::new(id, 0.0), &ctx).expect("apply");
    assert!(!outcome.success);
}

#[test]
fn preferences_follow_tendency() {
    assert_eq!(stat_preference(Tendency::Defensive)[0], StatKind::Vitality);
    assert_eq!(stat_preference(Tendency::Balanced).len(), 4);
    assert_eq!(
        school_preference(Tendency::Explorative, ProfileTag::Curious),
        Some(SkillSchool::Utility)
    );
    assert_eq!(
        school_preference(Tendency::Balanced, ProfileTag::Scholar),
        Some(SkillSchool::Magic)
    );
    assert_eq!(school_preference(Tendency::Balanced, ProfileTag::Balanced), None);
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn snapshot_reads_collaborators_and_mood() {
    let world = FakeWorld::new();
    let id = EntityId::new();
    let enemy = EntityId::new();
    world.spawn(
        id,
        Body {
            health: 0.1,
            mana: 0.6,
            level: 7,
            position: Position::new(3.0, 4.0, 0.0),
            target: Some(TargetInfo { id: enemy, distance: 1.5 }),
            threat: true,
            ..Body::default()
        },
    );
    let collaborators = collaborators(&world);
    let knowledge = SharedKnowledge::new();
    knowledge.report_threat(enemy, Position::default(), 0.0);
    let decision = DecisionConfig::default();
    let integration = IntegrationConfig::default();
    let sources = SnapshotSources {
        collaborators: &collaborators,
        knowledge: &knowledge,
        decision: &decision,
        integration: &integration,
    };
    let subject = SnapshotSubject { id, kind: EntityKind::Enemy, profile: ProfileTag::Aggressive };
    let shaken = Mood::new(-0.8, 0.6, -0.8);

    let snapshot = build_snapshot(subject, shaken, 1.0, &sources).expect("snapshot");
    assert_eq!(snapshot.level, 7);
    assert_eq!(snapshot.kind, EntityKind::Enemy);
    assert_eq!(snapshot.state, "combat");
    assert!(snapshot.shared_threat > 0.0);
    assert_eq!(snapshot.flags.get("low_health"), Some(&true));
    assert_eq!(snapshot.flags.get("shaken"), Some(&true));
    assert_eq!(snapshot.flags.get("emboldened"), Some(&false));
}

#[test]
fn snapshot_of_unknown_entity_fails() {
    let world = FakeWorld::new();
    let collaborators = collaborators(&world);
    let knowledge = SharedKnowledge::new();
    let decision = DecisionConfig::default();
    let integration = IntegrationConfig::default();
    let sources = SnapshotSources {
        collaborators: &collaborators,
        knowledge: &knowledge,
        decision: &decision,
        integration: &integration,
    };
    let id = EntityId::new();
    let subject = SnapshotSubject { id, kind: EntityKind::Npc, profile: ProfileTag::Balanced };
    assert!(matches!(
        build_snapshot(subject, Mood::NEUTRAL, 0.0, &sources),
        Err(LineageError::EntityNotFound(missing)) if missing == id
    ));
}
