//! Property-based tests for the lineage core.
//!
//! Random inputs exercise the memory capacity bound, value ranges,
//! condition soundness, generation bookkeeping and tie-break determinism.

use proptest::prelude::*;

use lineage_core::config::{DecisionConfig, LearningProfile};
use lineage_core::decision::DecisionEngine;
use lineage_core::memory::entry::learning_value;
use lineage_core::memory::{MemoryCategory, MemoryEntry, MemoryStore, TerminationCause};
use lineage_core::snapshot::{Snapshot, TargetInfo};
use lineage_core::types::{ContextMap, ContextValue, EntityId, EntityKind, Mood};
use lineage_core::{Action, Behavior, BehaviorCatalog, Expect, MemorySummary};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_category() -> impl Strategy<Value = MemoryCategory> {
    prop::sample::select(MemoryCategory::ALL.to_vec())
}

fn arb_outcome() -> impl Strategy<Value = ContextMap> {
    (-500.0..500.0f64, -50.0..50.0f64).prop_map(|(damage, lost)| {
        let mut m = ContextMap::new();
        m.insert("damage_dealt".into(), ContextValue::Number(damage));
        m.insert("health_lost".into(), ContextValue::Number(lost));
        m
    })
}

fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    (
        0.0..1.0f32,
        0.0..1.0f32,
        any::<bool>(),
        prop::option::of(0.0..40.0f32),
        -1.0..1.0f32,
        -1.0..1.0f32,
        -1.0..1.0f32,
    )
        .prop_map(|(health, mana, threat, distance, p, a, d)| {
            let mut s = Snapshot::new(EntityId::new(), 10.0);
            s.health = health;
            s.mana = mana;
            s.threat_detected = threat;
            s.mood = Mood::new(p, a, d);
            s.with_target(distance.map(|distance| TargetInfo { id: EntityId::new(), distance }))
        })
}

fn profile(capacity: usize, archive_capacity: usize) -> LearningProfile {
    LearningProfile {
        capacity,
        archive_capacity,
        learning_rate: 0.5,
    }
}

// ---------------------------------------------------------------------------
// Property: a store never holds more than its capacity
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn store_never_exceeds_capacity(
        capacity in 1usize..20,
        values in prop::collection::vec(0.0..1.0f32, 0..60),
    ) {
        let mut store =
            MemoryStore::new(EntityId::new(), EntityKind::Npc, profile(capacity, 5), 0.0);
        for (i, v) in values.iter().enumerate() {
            store.insert(MemoryEntry::with_learning_value(
                MemoryCategory::Movement,
                ContextMap::new(),
                "wander",
                ContextMap::new(),
                true,
                i as f64,
                *v,
            ));
            prop_assert!(store.len() <= capacity);
        }
        prop_assert_eq!(store.len(), values.len().min(capacity));
    }
}

// ---------------------------------------------------------------------------
// Property: eviction keeps the most valuable entries
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn eviction_keeps_top_values(values in prop::collection::vec(0.0..1.0f32, 1..40)) {
        let capacity = 5;
        let mut store =
            MemoryStore::new(EntityId::new(), EntityKind::Npc, profile(capacity, 5), 0.0);
        for (i, v) in values.iter().enumerate() {
            store.insert(MemoryEntry::with_learning_value(
                MemoryCategory::Combat,
                ContextMap::new(),
                "attack",
                ContextMap::new(),
                true,
                i as f64,
                *v,
            ));
        }
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        sorted.truncate(capacity);
        let kept_min =
            store.entries().iter().map(|e| e.learning_value).fold(f32::INFINITY, f32::min);
        prop_assert!((kept_min - sorted[sorted.len() - 1]).abs() < f32::EPSILON);
    }
}

// ---------------------------------------------------------------------------
// Property: learning value is always in [0, 1]
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn learning_value_in_unit_range(
        category in arb_category(),
        outcome in arb_outcome(),
        success in any::<bool>(),
        skill in any::<bool>(),
    ) {
        let mut context = ContextMap::new();
        if skill {
            context.insert("skill_used".into(), ContextValue::from("fireball"));
        }
        let v = learning_value(category, &context, &outcome, success);
        prop_assert!((0.0..=1.0).contains(&v));
    }
}

// ---------------------------------------------------------------------------
// Property: every decision satisfies its behavior's conditions
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn decisions_satisfy_conditions(snapshot in arb_snapshot(), threshold in 0.0..1.0f32) {
        let mut catalog = BehaviorCatalog::new();
        catalog.register(
            Behavior::new("flee", 9)
                .when("threat_detected", Expect::Is(true))
                .when("health", Expect::Below(threshold))
                .then(Action::Flee),
        ).expect("flee");
        catalog.register(
            Behavior::new("attack", 5)
                .when("target_in_attack_range", Expect::Is(true))
                .then(Action::Attack),
        ).expect("attack");
        catalog.register(
            Behavior::new("cautious", 3)
                .when("defensive_bias", Expect::Above(0.5))
                .then(Action::Defend),
        ).expect("cautious");

        let memory = MemorySummary::default();
        let mut engine = DecisionEngine::new(catalog.clone(), &DecisionConfig::default());
        if let Some(decision) = engine.decide(&snapshot, &memory).expect("decide") {
            prop_assert!((0.0..=1.0).contains(&decision.confidence));
            let behavior = catalog.get(&decision.behavior_id).expect("chosen behavior exists");
            prop_assert!(behavior.conditions_hold(&snapshot, &memory).expect("evaluate"));
            prop_assert_eq!(Some(decision.action), behavior.primary_action());
        }
    }
}

// ---------------------------------------------------------------------------
// Property: end_generation bookkeeping
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn end_generation_counters(
        generations in 1u32..12,
        per_generation in 0usize..8,
        archive_capacity in 1usize..6,
    ) {
        let learning = profile(100, archive_capacity);
        let mut store = MemoryStore::new(EntityId::new(), EntityKind::Enemy, learning, 0.0);
        for g in 0..generations {
            for i in 0..per_generation {
                store.add_entry(
                    MemoryCategory::Combat,
                    ContextMap::new(),
                    "attack",
                    ContextMap::new(),
                    i % 2 == 0,
                    f64::from(g),
                );
            }
            let cause = TerminationCause::Killed { by: None };
            let record = store.end_generation(cause, None, f64::from(g + 1));
            prop_assert_eq!(record.generation_id, g);
            prop_assert_eq!(record.entries.len(), per_generation);
            prop_assert!(store.is_empty());
            prop_assert!(store.current_experience().abs() < f32::EPSILON);
        }
        prop_assert_eq!(store.generation_id(), generations);
        prop_assert_eq!(store.stats().total_generations, generations);
        prop_assert!(store.archive().len() <= archive_capacity);
        prop_assert_eq!(store.archive().len(), (generations as usize).min(archive_capacity));
    }
}

// ---------------------------------------------------------------------------
// Property: equal priorities always resolve to the first registered
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn tie_break_is_deterministic(priority in -10i32..10, count in 2usize..8, ticks in 1u32..10) {
        let mut catalog = BehaviorCatalog::new();
        for i in 0..count {
            let behavior = Behavior::new(format!("b{i}"), priority).then(Action::Wander);
            catalog.register(behavior).expect("register");
        }
        let mut engine = DecisionEngine::new(catalog, &DecisionConfig::default());
        let id = EntityId::new();
        for t in 0..ticks {
            let d = engine
                .decide(&Snapshot::new(id, f64::from(t)), &MemorySummary::default())
                .expect("decide")
                .expect("some");
            prop_assert_eq!(d.behavior_id.as_str(), "b0");
        }
    }
}
