//! Last-resort backend that cannot fail.

use crate::action::Action;
use crate::config::PolicyKind;
use crate::decision::Decision;
use crate::error::Result;
use crate::memory::MemorySummary;
use crate::policy::PolicyBackend;
use crate::snapshot::Snapshot;

/// Behavior id carried by idle decisions. It has no conditions.
pub const IDLE_BEHAVIOR_ID: &str = "idle";

/// Always decides to idle, with full confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleBackend;

impl PolicyBackend for IdleBackend {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Idle
    }

    fn select_action(
        &mut self,
        snapshot: &Snapshot,
        _memory: &MemorySummary,
    ) -> Result<Option<Decision>> {
        Ok(Some(Decision::new(
            snapshot.entity_id,
            IDLE_BEHAVIOR_ID,
            Action::Idle,
            None,
            1.0,
            snapshot.now,
        )))
    }
}
