//! Behavior catalog: named, priority-ordered, cooldown-gated rules.
//!
//! A [`Behavior`] fires when every one of its [`Condition`]s holds and its
//! cooldown has elapsed. The catalog preserves registration order, which is
//! the tie-break between behaviors of equal priority.

pub mod condition;
pub mod presets;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{LineageError, Result};
use crate::memory::MemorySummary;
use crate::snapshot::Snapshot;
use crate::types::SimTime;

pub use condition::{Condition, Expect};

/// A rule mapping conditions to an ordered list of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    /// Unique id within a catalog.
    pub id: String,
    /// All must hold for the behavior to be eligible.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Actions in order; decisions use the first.
    pub actions: Vec<Action>,
    /// Higher wins.
    #[serde(default)]
    pub priority: i32,
    /// Minimum seconds between firings.
    #[serde(default)]
    pub cooldown: f64,
    /// Simulation time of the last firing.
    #[serde(default)]
    pub last_fired: Option<SimTime>,
}

impl Behavior {
    /// Start building a behavior with no conditions or actions.
    #[must_use]
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            conditions: Vec::new(),
            actions: Vec::new(),
            priority,
            cooldown: 0.0,
            last_fired: None,
        }
    }

    /// Add a condition.
    #[must_use]
    pub fn when(mut self, predicate: impl Into<String>, expect: Expect) -> Self {
        self.conditions.push(Condition::new(predicate, expect));
        self
    }

    /// Append an action.
    #[must_use]
    pub fn then(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the cooldown in seconds.
    #[must_use]
    pub fn cooldown(mut self, seconds: f64) -> Self {
        self.cooldown = seconds.max(0.0);
        self
    }

    /// First action, which is what a decision carries.
    #[must_use]
    pub fn primary_action(&self) -> Option<Action> {
        self.actions.first().copied()
    }

    /// Whether the cooldown has elapsed at `now`.
    #[must_use]
    pub fn is_ready(&self, now: SimTime) -> bool {
        self.last_fired.is_none_or(|t| now - t >= self.cooldown)
    }

    /// Whether every condition holds.
    ///
    /// # Errors
    /// Propagates the first condition that cannot be evaluated.
    pub fn conditions_hold(&self, snapshot: &Snapshot, memory: &MemorySummary) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.evaluate(&self.id, snapshot, memory)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    behavior: Vec<Behavior>,
}

/// Ordered registry of behaviors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorCatalog {
    behaviors: Vec<Behavior>,
}

impl BehaviorCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `[[behavior]]` tables from TOML, registering them in file order.
    ///
    /// ```toml
    /// [[behavior]]
    /// id = "flee"
    /// priority = 8
    /// actions = ["flee"]
    /// conditions = [{ predicate = "threat_detected", expect = { is = true } }]
    /// ```
    ///
    /// # Errors
    /// Returns `LineageError::Config` for malformed TOML and the usual
    /// registration errors for duplicate or action-less behaviors.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(toml_str).map_err(|e| LineageError::Config(e.to_string()))?;
        let mut catalog = Self::new();
        for behavior in file.behavior {
            catalog.register(behavior)?;
        }
        Ok(catalog)
    }

    /// Append a behavior.
    ///
    /// # Errors
    /// Returns [`LineageError::DuplicateBehavior`] if the id is taken, or
    /// [`LineageError::Config`] if the behavior has no actions.
    pub fn register(&mut self, behavior: Behavior) -> Result<()> {
        if self.get(&behavior.id).is_some() {
            return Err(LineageError::DuplicateBehavior(behavior.id));
        }
        if behavior.actions.is_empty() {
            return Err(LineageError::Config(format!("behavior `{}` has no actions", behavior.id)));
        }
        self.behaviors.push(behavior);
        Ok(())
    }

    /// Change a behavior's priority.
    ///
    /// # Errors
    /// Returns [`LineageError::UnknownBehavior`] if no such behavior exists.
    pub fn set_priority(&mut self, id: &str, priority: i32) -> Result<()> {
        self.get_mut(id)?.priority = priority;
        Ok(())
    }

    /// Change a behavior's cooldown.
    ///
    /// # Errors
    /// Returns [`LineageError::UnknownBehavior`] if no such behavior exists.
    pub fn set_cooldown(&mut self, id: &str, seconds: f64) -> Result<()> {
        self.get_mut(id)?.cooldown = seconds.max(0.0);
        Ok(())
    }

    /// Look up a behavior by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Behavior> {
        self.behaviors
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| LineageError::UnknownBehavior(id.to_string()))
    }

    /// Behaviors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Behavior> {
        self.behaviors.iter()
    }

    /// Number of behaviors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    /// Whether the catalog has no behaviors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Indices (registration order) of behaviors that are ready and whose
    /// conditions all hold.
    ///
    /// # Errors
    /// Propagates condition evaluation errors.
    pub fn eligible(&self, snapshot: &Snapshot, memory: &MemorySummary) -> Result<Vec<usize>> {
        let mut out = Vec::new();
        for (i, behavior) in self.behaviors.iter().enumerate() {
            if behavior.is_ready(snapshot.now) && behavior.conditions_hold(snapshot, memory)? {
                out.push(i);
            }
        }
        Ok(out)
    }

    /// Behavior at a registration index.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Behavior> {
        self.behaviors.get(index)
    }

    /// Record that the behavior at `index` fired at `now`.
    pub fn mark_fired(&mut self, index: usize, now: SimTime) {
        if let Some(b) = self.behaviors.get_mut(index) {
            b.last_fired = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;

    #[test]
    fn duplicate_ids_rejected() {
        let mut c = BehaviorCatalog::new();
        c.register(Behavior::new("a", 1).then(Action::Idle)).expect("first");
        let err = c.register(Behavior::new("a", 2).then(Action::Idle)).expect_err("dup");
        assert!(matches!(err, LineageError::DuplicateBehavior(id) if id == "a"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn action_less_behavior_rejected() {
        let mut c = BehaviorCatalog::new();
        assert!(c.register(Behavior::new("empty", 1)).is_err());
    }

    #[test]
    fn levers_require_known_ids() {
        let mut c = BehaviorCatalog::new();
        c.register(Behavior::new("a", 1).then(Action::Idle)).expect("register");
        c.set_priority("a", 9).expect("priority");
        c.set_cooldown("a", -3.0).expect("cooldown");
        let a = c.get("a").expect("present");
        assert_eq!(a.priority, 9);
        assert!(a.cooldown.abs() < f64::EPSILON);
        assert!(matches!(c.set_priority("zzz", 1), Err(LineageError::UnknownBehavior(_))));
    }

    #[test]
    fn cooldown_gates_eligibility() {
        let mut c = BehaviorCatalog::new();
        c.register(Behavior::new("a", 1).then(Action::Idle).cooldown(5.0)).expect("register");
        let memory = MemorySummary::default();

        let s = Snapshot::new(EntityId::new(), 10.0);
        assert_eq!(c.eligible(&s, &memory).expect("eval"), vec![0]);
        c.mark_fired(0, 10.0);
        let s = Snapshot::new(EntityId::new(), 14.9);
        assert!(c.eligible(&s, &memory).expect("eval").is_empty());
        let s = Snapshot::new(EntityId::new(), 15.0);
        assert_eq!(c.eligible(&s, &memory).expect("eval"), vec![0]);
    }

    #[test]
    fn catalog_from_toml() {
        let c = BehaviorCatalog::from_toml(
            r#"
            [[behavior]]
            id = "flee"
            priority = 8
            cooldown = 1.5
            actions = ["flee"]
            conditions = [{ predicate = "threat_detected", expect = { is = true } }]

            [[behavior]]
            id = "patrol"
            priority = 1
            actions = ["patrol", "wander"]
            conditions = [{ predicate = "has_target", expect = { is = false } }]
            "#,
        )
        .expect("parse");
        assert_eq!(c.len(), 2);
        let flee = c.get("flee").expect("flee");
        assert_eq!(flee.primary_action(), Some(Action::Flee));
        assert_eq!(flee.conditions[0].expect, Expect::Is(true));
        assert_eq!(c.at(1).map(|b| b.id.as_str()), Some("patrol"));
    }
}
