//! Ready-made catalogs per behavior profile.

use super::{Behavior, BehaviorCatalog, Expect};
use crate::action::Action;
use crate::types::ProfileTag;

/// Catalog an entity with `profile` starts with.
#[must_use]
pub fn catalog_for(profile: ProfileTag) -> BehaviorCatalog {
    let (flee_below, attack_priority, learn_priority) = match profile {
        ProfileTag::Aggressive => (0.15, 8, 2),
        ProfileTag::Defensive => (0.45, 5, 2),
        ProfileTag::Scholar => (0.3, 5, 4),
        ProfileTag::Curious | ProfileTag::Balanced => (0.3, 6, 2),
    };

    let mut behaviors = vec![
        Behavior::new("flee", 9)
            .when("threat_detected", Expect::Is(true))
            .when("health", Expect::Below(flee_below))
            .then(Action::Flee),
        Behavior::new("heal", 7)
            .when("health", Expect::Below(0.5))
            .then(Action::Heal)
            .cooldown(3.0),
        Behavior::new("attack", attack_priority)
            .when("target_in_attack_range", Expect::Is(true))
            .then(Action::Attack),
        Behavior::new("restore_mana", 5)
            .when("mana", Expect::Below(0.3))
            .then(Action::RestoreMana)
            .cooldown(3.0),
        Behavior::new("chase", 4)
            .when("target_in_detection_range", Expect::Is(true))
            .when("target_in_attack_range", Expect::Is(false))
            .then(Action::Chase)
            .then(Action::Attack),
        Behavior::new("equip", 3)
            .when("has_target", Expect::Is(false))
            .then(Action::EquipBest)
            .cooldown(30.0),
        Behavior::new("train_stats", 3)
            .when("has_target", Expect::Is(false))
            .then(Action::DistributeStatPoints)
            .cooldown(20.0),
        Behavior::new("study", learn_priority)
            .when("has_target", Expect::Is(false))
            .then(Action::LearnSkill)
            .cooldown(60.0),
    ];

    match profile {
        ProfileTag::Defensive => behaviors.push(
            Behavior::new("brace", 6)
                .when("threat_detected", Expect::Is(true))
                .when("defensive_bias", Expect::Above(0.6))
                .then(Action::Defend),
        ),
        ProfileTag::Curious => behaviors.push(
            Behavior::new("explore", 2)
                .when("has_target", Expect::Is(false))
                .then(Action::Explore)
                .cooldown(5.0),
        ),
        ProfileTag::Balanced => behaviors.push(
            Behavior::new("greet", 2)
                .when("has_target", Expect::Is(true))
                .when("threat_detected", Expect::Is(false))
                .then(Action::Interact)
                .cooldown(10.0),
        ),
        ProfileTag::Aggressive | ProfileTag::Scholar => {}
    }

    behaviors.push(
        Behavior::new("patrol", 1)
            .when("has_target", Expect::Is(false))
            .then(Action::Patrol)
            .then(Action::Wander),
    );

    BehaviorCatalog { behaviors }
}
