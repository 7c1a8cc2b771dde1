//! Backend selection with fallback.
//!
//! The preferred backend is tried first, then the chain continues
//! `learned -> rule -> idle`. Idle cannot fail, so every entity ends up with
//! a working backend. A fallback away from the learned backend is warned
//! about once per process and counted every time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::behavior::BehaviorCatalog;
use crate::config::{DecisionConfig, PolicyConfig, PolicyKind};
use crate::metrics::LineageCounters;
use crate::policy::{IdleBackend, LearnedBackend, ModelHandle, PolicyBackend, RuleBackend};
use crate::types::EntityId;

static LEARNED_FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

/// Builds one [`PolicyBackend`] per entity.
#[derive(Debug, Clone)]
pub struct PolicyFactory {
    policy: PolicyConfig,
    decision: DecisionConfig,
    seed: u64,
    model: Option<ModelHandle>,
    counters: Arc<LineageCounters>,
}

impl PolicyFactory {
    /// Factory without a model handle: the learned backend is unavailable.
    #[must_use]
    pub fn new(
        policy: PolicyConfig,
        decision: DecisionConfig,
        seed: u64,
        counters: Arc<LineageCounters>,
    ) -> Self {
        Self {
            policy,
            decision,
            seed,
            model: None,
            counters,
        }
    }

    /// Attach the training worker's parameter handle.
    #[must_use]
    pub fn with_model(mut self, model: ModelHandle) -> Self {
        self.model = Some(model);
        self
    }

    /// Whether a model handle is attached.
    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Fallback order starting from `preferred`.
    #[must_use]
    pub fn chain(preferred: PolicyKind) -> &'static [PolicyKind] {
        match preferred {
            PolicyKind::Learned => &[PolicyKind::Learned, PolicyKind::Rule, PolicyKind::Idle],
            PolicyKind::Rule => &[PolicyKind::Rule, PolicyKind::Idle],
            PolicyKind::Idle => &[PolicyKind::Idle],
        }
    }

    /// Build the best available backend for `entity` over `catalog`.
    #[must_use]
    pub fn build(&self, entity: EntityId, catalog: BehaviorCatalog) -> Box<dyn PolicyBackend> {
        let preferred = self.policy.preferred;
        for &kind in Self::chain(preferred) {
            let attempt: crate::error::Result<Box<dyn PolicyBackend>> = match kind {
                PolicyKind::Learned => LearnedBackend::try_new(
                    catalog.clone(),
                    self.model.as_ref(),
                    &self.policy,
                    self.seed ^ entity.seed(),
                )
                .map(|b| Box::new(b) as Box<dyn PolicyBackend>),
                PolicyKind::Rule => RuleBackend::new(catalog.clone(), &self.decision)
                    .map(|b| Box::new(b) as Box<dyn PolicyBackend>),
                PolicyKind::Idle => Ok(Box::new(IdleBackend)),
            };

            match attempt {
                Ok(backend) => {
                    if kind != preferred {
                        LineageCounters::bump(&self.counters.backend_fallbacks);
                    }
                    debug!(%entity, backend = %kind, "policy backend selected");
                    return backend;
                }
                Err(e) => {
                    if kind == PolicyKind::Learned
                        && !LEARNED_FALLBACK_WARNED.swap(true, Ordering::Relaxed)
                    {
                        warn!(error = %e, "learned backend unavailable, falling back to rules");
                    } else {
                        debug!(%entity, backend = %kind, error = %e, "policy backend unavailable");
                    }
                }
            }
        }
        Box::new(IdleBackend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::behavior::Behavior;
    use crate::policy::ModelParameters;

    fn catalog() -> BehaviorCatalog {
        let mut c = BehaviorCatalog::new();
        c.register(Behavior::new("wander", 1).then(Action::Wander)).expect("register");
        c
    }

    fn factory(preferred: PolicyKind) -> (PolicyFactory, Arc<LineageCounters>) {
        let counters = Arc::new(LineageCounters::new());
        let policy = PolicyConfig { preferred, ..PolicyConfig::default() };
        (PolicyFactory::new(policy, DecisionConfig::default(), 1, Arc::clone(&counters)), counters)
    }

    #[test]
    fn learned_without_model_falls_back_to_rule() {
        let (f, counters) = factory(PolicyKind::Learned);
        let backend = f.build(EntityId::new(), catalog());
        assert_eq!(backend.kind(), PolicyKind::Rule);
        assert_eq!(counters.snapshot().backend_fallbacks, 1);
    }

    #[test]
    fn learned_with_model_is_used() {
        let (f, counters) = factory(PolicyKind::Learned);
        let f = f.with_model(ModelHandle::new(ModelParameters::uniform()).expect("handle"));
        assert_eq!(f.build(EntityId::new(), catalog()).kind(), PolicyKind::Learned);
        assert_eq!(counters.snapshot().backend_fallbacks, 0);
    }

    #[test]
    fn empty_catalog_ends_at_idle() {
        let (f, counters) = factory(PolicyKind::Rule);
        assert_eq!(f.build(EntityId::new(), BehaviorCatalog::new()).kind(), PolicyKind::Idle);
        assert_eq!(counters.snapshot().backend_fallbacks, 1);
    }

    #[test]
    fn chain_order() {
        assert_eq!(
            PolicyFactory::chain(PolicyKind::Learned),
            &[PolicyKind::Learned, PolicyKind::Rule, PolicyKind::Idle]
        );
        assert_eq!(PolicyFactory::chain(PolicyKind::Idle), &[PolicyKind::Idle]);
    }
}
