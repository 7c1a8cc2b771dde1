//! Learned backend: a linear softmax policy over eligible behaviors.
//!
//! The snapshot and memory summary are encoded into a fixed-size feature
//! vector. Each action has a weight vector; the logits of the actions that
//! eligible behaviors offer are turned into a distribution, one action is
//! sampled, and its probability becomes the decision's confidence.
//!
//! Parameters live behind a [`ModelHandle`] shared with the training
//! worker. The backend only ever reads them, and picks up a newly published
//! version at the start of its next decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::Action;
use crate::behavior::BehaviorCatalog;
use crate::config::{PolicyConfig, PolicyKind};
use crate::decision::Decision;
use crate::error::{LineageError, Result};
use crate::memory::MemorySummary;
use crate::policy::PolicyBackend;
use crate::snapshot::Snapshot;
use crate::types::{ContextMap, ContextValue};

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Length of the feature vector.
pub const FEATURE_DIM: usize = 12;

/// Encoded snapshot.
pub type FeatureVector = [f32; FEATURE_DIM];

/// Context keys feeding features `0..FEATURE_DIM - 1`; the last is a bias.
pub const FEATURE_KEYS: [&str; FEATURE_DIM - 1] = [
    "health",
    "mana",
    "level",
    "has_target",
    "target_proximity",
    "threat_detected",
    "defensive_bias",
    "confidence",
    "success_rate",
    "combat_success_rate",
    "shared_threat",
];

/// Levels at or above this encode as 1.0.
const LEVEL_SCALE: f32 = 100.0;

fn bit(flag: bool) -> f32 {
    if flag { 1.0 } else { 0.0 }
}

/// Encode a live snapshot.
#[must_use]
pub fn encode(snapshot: &Snapshot, memory: &MemorySummary) -> FeatureVector {
    [
        snapshot.health.clamp(0.0, 1.0),
        snapshot.mana.clamp(0.0, 1.0),
        (snapshot.level as f32 / LEVEL_SCALE).clamp(0.0, 1.0),
        bit(snapshot.target.is_some()),
        snapshot.target_proximity(),
        bit(snapshot.threat_detected),
        snapshot.mood.defensive_bias(),
        snapshot.mood.confidence(),
        memory.success_rate,
        memory.combat_success_rate,
        snapshot.shared_threat.clamp(0.0, 1.0),
        1.0,
    ]
}

/// Rebuild features from a memory entry's context (see `Snapshot::to_context`).
///
/// Missing keys encode as 0.
#[must_use]
pub fn from_context(context: &ContextMap) -> FeatureVector {
    let mut x = [0.0; FEATURE_DIM];
    for (slot, key) in x.iter_mut().zip(FEATURE_KEYS) {
        *slot = match context.get(key) {
            Some(ContextValue::Number(n)) => *n as f32,
            Some(ContextValue::Flag(b)) => bit(*b),
            _ => 0.0,
        };
    }
    x[2] = (x[2] / LEVEL_SCALE).clamp(0.0, 1.0);
    x[FEATURE_DIM - 1] = 1.0;
    x
}

/// Numerically stable softmax.
#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / logits.len().max(1) as f32; logits.len()]
    }
}

// ---------------------------------------------------------------------------
// Parameters & handoff
// ---------------------------------------------------------------------------

/// One weight vector per action in [`Action::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Per-action weights.
    pub weights: Vec<FeatureVector>,
    /// Publication counter, assigned by [`ModelHandle::publish`].
    pub version: u64,
}

impl ModelParameters {
    /// All-zero weights: a uniform policy.
    #[must_use]
    pub fn uniform() -> Self {
        Self {
            weights: vec![[0.0; FEATURE_DIM]; Action::COUNT],
            version: 0,
        }
    }

    /// Logit of `action` for features `x`.
    #[must_use]
    pub fn logit(&self, action: Action, x: &FeatureVector) -> f32 {
        self.weights
            .get(action.index())
            .map_or(0.0, |w| w.iter().zip(x).map(|(a, b)| a * b).sum())
    }

    /// Check shape and finiteness.
    ///
    /// # Errors
    /// Returns [`LineageError::MissingDependency`] describing the defect.
    pub fn validate(&self) -> Result<()> {
        if self.weights.len() != Action::COUNT {
            return Err(LineageError::MissingDependency {
                backend: "learned",
                reason: format!(
                    "expected {} weight rows, found {}",
                    Action::COUNT,
                    self.weights.len()
                ),
            });
        }
        if self.weights.iter().flatten().any(|w| !w.is_finite()) {
            return Err(LineageError::MissingDependency {
                backend: "learned",
                reason: "non-finite weight".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self::uniform()
    }
}

#[derive(Debug)]
struct HandleInner {
    current: RwLock<Arc<ModelParameters>>,
    version: AtomicU64,
}

/// Shared "current parameters" slot between training and decisions.
///
/// Readers clone an `Arc` under a short read lock; publishing swaps the
/// `Arc` under the write lock and bumps the version, so a reader sees
/// either the old or the new parameters in full.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    inner: Arc<HandleInner>,
}

impl ModelHandle {
    /// Create a handle holding `params` as version 0.
    ///
    /// # Errors
    /// Returns an error if `params` fail validation.
    pub fn new(mut params: ModelParameters) -> Result<Self> {
        params.validate()?;
        params.version = 0;
        Ok(Self {
            inner: Arc::new(HandleInner {
                current: RwLock::new(Arc::new(params)),
                version: AtomicU64::new(0),
            }),
        })
    }

    /// Current parameters.
    #[must_use]
    pub fn current(&self) -> Arc<ModelParameters> {
        Arc::clone(&self.inner.current.read())
    }

    /// Version of the current parameters.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replace the current parameters and return the new version.
    ///
    /// # Errors
    /// Returns an error if `params` fail validation; nothing is swapped.
    pub fn publish(&self, mut params: ModelParameters) -> Result<u64> {
        params.validate()?;
        let mut slot = self.inner.current.write();
        let version = self.inner.version.load(Ordering::Acquire) + 1;
        params.version = version;
        *slot = Arc::new(params);
        self.inner.version.store(version, Ordering::Release);
        Ok(version)
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Lowest temperature accepted; keeps logits finite.
const MIN_TEMPERATURE: f32 = 0.05;

/// Softmax policy over the actions eligible behaviors offer.
#[derive(Debug)]
pub struct LearnedBackend {
    catalog: BehaviorCatalog,
    handle: ModelHandle,
    params: Arc<ModelParameters>,
    temperature: f32,
    rng: StdRng,
}

impl LearnedBackend {
    /// Build a backend reading parameters from `handle`.
    ///
    /// # Errors
    /// Returns [`LineageError::MissingDependency`] if there is no handle
    /// (training worker not running), the catalog is empty, or the current
    /// parameters are malformed.
    pub fn try_new(
        catalog: BehaviorCatalog,
        handle: Option<&ModelHandle>,
        config: &PolicyConfig,
        seed: u64,
    ) -> Result<Self> {
        let handle = handle.ok_or_else(|| LineageError::MissingDependency {
            backend: "learned",
            reason: "no model handle; training worker is not running".to_string(),
        })?;
        if catalog.is_empty() {
            return Err(LineageError::MissingDependency {
                backend: "learned",
                reason: "behavior catalog is empty".to_string(),
            });
        }
        let params = handle.current();
        params.validate()?;

        Ok(Self {
            catalog,
            handle: handle.clone(),
            params,
            temperature: config.temperature.max(MIN_TEMPERATURE),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Version of the parameters used for the last decision.
    #[must_use]
    pub fn parameters_version(&self) -> u64 {
        self.params.version
    }

    fn refresh(&mut self) {
        if self.handle.version() != self.params.version {
            self.params = self.handle.current();
            debug!(version = self.params.version, "learned backend picked up new parameters");
        }
    }
}

impl PolicyBackend for LearnedBackend {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Learned
    }

    fn select_action(
        &mut self,
        snapshot: &Snapshot,
        memory: &MemorySummary,
    ) -> Result<Option<Decision>> {
        self.refresh();

        let mut candidates: Vec<(usize, Action)> = Vec::new();
        for index in self.catalog.eligible(snapshot, memory)? {
            let Some(action) = self.catalog.at(index).and_then(|b| b.primary_action()) else {
                continue;
            };
            if !candidates.iter().any(|(_, a)| *a == action) {
                candidates.push((index, action));
            }
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let x = encode(snapshot, memory);
        let logits: Vec<f32> = candidates
            .iter()
            .map(|(_, a)| self.params.logit(*a, &x) / self.temperature)
            .collect();
        let probs = softmax(&logits);

        let roll: f32 = self.rng.r#gen();
        let mut pick = probs.len() - 1;
        let mut cumulative = 0.0;
        for (i, p) in probs.iter().enumerate() {
            cumulative += p;
            if roll < cumulative {
                pick = i;
                break;
            }
        }

        let (index, action) = candidates[pick];
        let behavior_id = self
            .catalog
            .at(index)
            .map(|b| b.id.clone())
            .unwrap_or_default();
        self.catalog.mark_fired(index, snapshot.now);

        Ok(Some(Decision::new(
            snapshot.entity_id,
            behavior_id,
            action,
            snapshot.target.map(|t| t.id),
            probs[pick],
            snapshot.now,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Behavior, Expect};
    use crate::types::EntityId;

    fn catalog() -> BehaviorCatalog {
        let mut c = BehaviorCatalog::new();
        c.register(Behavior::new("wander", 1).then(Action::Wander)).expect("register");
        c.register(Behavior::new("patrol", 1).then(Action::Patrol)).expect("register");
        let flee = Behavior::new("flee", 9)
            .when("threat_detected", Expect::Is(true))
            .then(Action::Flee);
        c.register(flee).expect("register");
        c
    }

    #[test]
    fn missing_handle_is_missing_dependency() {
        let err = LearnedBackend::try_new(catalog(), None, &PolicyConfig::default(), 1)
            .expect_err("no handle");
        assert!(matches!(err, LineageError::MissingDependency { backend: "learned", .. }));
    }

    #[test]
    fn malformed_parameters_rejected() {
        let bad = ModelParameters { weights: vec![[0.0; FEATURE_DIM]; 2], version: 0 };
        assert!(ModelHandle::new(bad).is_err());
    }

    #[test]
    fn uniform_policy_splits_confidence() {
        let handle = ModelHandle::new(ModelParameters::uniform()).expect("handle");
        let mut b = LearnedBackend::try_new(catalog(), Some(&handle), &PolicyConfig::default(), 7)
            .expect("backend");
        let s = Snapshot::new(EntityId::new(), 0.0);
        let d = b.select_action(&s, &MemorySummary::default()).expect("select").expect("some");
        assert!(matches!(d.action, Action::Wander | Action::Patrol));
        assert!((d.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn only_eligible_actions_are_sampled() {
        let handle = ModelHandle::new(ModelParameters::uniform()).expect("handle");
        let mut b = LearnedBackend::try_new(catalog(), Some(&handle), &PolicyConfig::default(), 3)
            .expect("backend");
        for t in 0..50 {
            let s = Snapshot::new(EntityId::new(), f64::from(t));
            let d = b.select_action(&s, &MemorySummary::default()).expect("select").expect("some");
            assert_ne!(d.action, Action::Flee);
        }
    }

    #[test]
    fn published_parameters_are_picked_up() {
        let handle = ModelHandle::new(ModelParameters::uniform()).expect("handle");
        let mut b = LearnedBackend::try_new(catalog(), Some(&handle), &PolicyConfig::default(), 3)
            .expect("backend");
        let mut strong = ModelParameters::uniform();
        strong.weights[Action::Patrol.index()][FEATURE_DIM - 1] = 50.0;
        assert_eq!(handle.publish(strong).expect("publish"), 1);

        let s = Snapshot::new(EntityId::new(), 0.0);
        let d = b.select_action(&s, &MemorySummary::default()).expect("select").expect("some");
        assert_eq!(b.parameters_version(), 1);
        assert_eq!(d.action, Action::Patrol);
        assert!(d.confidence > 0.99);
    }

    #[test]
    fn context_round_trips_features() {
        let mut s = Snapshot::new(EntityId::new(), 0.0);
        s.health = 0.4;
        s.level = 20;
        s.threat_detected = true;
        let memory = MemorySummary::default();
        let live = encode(&s, &memory);
        let stored = from_context(&s.to_context(&memory));
        for (a, b) in live.iter().zip(stored.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }
}
