//! Pluggable decision sources.
//!
//! Every backend answers the same request, a [`Snapshot`] plus the
//! entity's [`MemorySummary`], with an optional [`Decision`] carrying the
//! action, target and confidence. Backends are chosen once per entity by
//! [`PolicyFactory`].

pub mod factory;
pub mod idle;
pub mod learned;
pub mod rule;

use crate::config::PolicyKind;
use crate::decision::Decision;
use crate::error::Result;
use crate::memory::MemorySummary;
use crate::snapshot::Snapshot;

pub use factory::PolicyFactory;
pub use idle::IdleBackend;
pub use learned::{LearnedBackend, ModelHandle, ModelParameters};
pub use rule::RuleBackend;

/// A decision source behind a fixed request/response contract.
pub trait PolicyBackend: Send {
    /// Which implementation this is.
    fn kind(&self) -> PolicyKind;

    /// Choose this tick's action, or `None` to idle.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be evaluated; the caller
    /// treats it as a per-entity failure for this tick only.
    fn select_action(
        &mut self,
        snapshot: &Snapshot,
        memory: &MemorySummary,
    ) -> Result<Option<Decision>>;
}

impl std::fmt::Debug for dyn PolicyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PolicyBackend({})", self.kind())
    }
}
