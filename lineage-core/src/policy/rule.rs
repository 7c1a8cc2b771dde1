//! Rule-based backend: the [`DecisionEngine`] behind the policy contract.

use crate::behavior::BehaviorCatalog;
use crate::config::{DecisionConfig, PolicyKind};
use crate::decision::{Decision, DecisionEngine};
use crate::error::{LineageError, Result};
use crate::memory::MemorySummary;
use crate::policy::PolicyBackend;
use crate::snapshot::Snapshot;

/// Condition/priority rules.
#[derive(Debug, Clone)]
pub struct RuleBackend {
    engine: DecisionEngine,
}

impl RuleBackend {
    /// Wrap `catalog`.
    ///
    /// # Errors
    /// Returns [`LineageError::EmptyCatalog`] if there is nothing to evaluate.
    pub fn new(catalog: BehaviorCatalog, config: &DecisionConfig) -> Result<Self> {
        if catalog.is_empty() {
            return Err(LineageError::EmptyCatalog);
        }
        Ok(Self {
            engine: DecisionEngine::new(catalog, config),
        })
    }

    /// Underlying engine.
    #[must_use]
    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Underlying engine, for catalog levers.
    pub fn engine_mut(&mut self) -> &mut DecisionEngine {
        &mut self.engine
    }
}

impl PolicyBackend for RuleBackend {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Rule
    }

    fn select_action(
        &mut self,
        snapshot: &Snapshot,
        memory: &MemorySummary,
    ) -> Result<Option<Decision>> {
        self.engine.decide(snapshot, memory)
    }
}
