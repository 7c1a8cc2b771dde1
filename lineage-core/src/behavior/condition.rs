//! Named predicates evaluated against a [`Snapshot`] and memory summary.
//!
//! | predicate                    | expectation        | reads                          |
//! |------------------------------|--------------------|--------------------------------|
//! | `state`                      | `equals`           | discrete situation label       |
//! | `health`, `mana`             | `below` / `above`  | fraction of max                |
//! | `level`                      | `below` / `above`  | character level                |
//! | `target_distance`            | `below` / `above`  | distance (false with no target)|
//! | `defensive_bias`, `confidence`| `below` / `above` | mood modifier                  |
//! | `shared_threat`              | `below` / `above`  | shared threat level of target  |
//! | `has_target`                 | `is`               | target present                 |
//! | `threat_detected`            | `is`               | hostile nearby                 |
//! | `target_in_detection_range`  | `is`               | distance ≤ detection range     |
//! | `target_in_attack_range`     | `is`               | distance ≤ attack range        |
//! | `combat_experienced`         | `is`               | > 5 successful combat entries  |
//! | `seasoned`                   | `is`               | > 10 current entries           |
//! | `prefers:<action>`           | `is`               | action is a preferred action   |
//! | any host flag name           | `is`               | `Snapshot::flags`              |
//!
//! **Unknown predicates are satisfied.** A predicate name that is neither
//! built in nor present in the snapshot's flags evaluates to `true`. This
//! permissive default lets catalogs mention host flags that only some hosts
//! provide, but it also means a typo in a predicate name silently makes the
//! condition pass. Each such evaluation is logged at `trace` level.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{LineageError, Result};
use crate::memory::MemorySummary;
use crate::snapshot::Snapshot;

/// Successful combat entries needed for `combat_experienced`.
const COMBAT_EXPERIENCE_THRESHOLD: u32 = 5;
/// Entries needed for `seasoned`.
const SEASONED_THRESHOLD: usize = 10;

/// What a predicate's value is compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    /// Boolean predicate must equal this.
    Is(bool),
    /// Numeric predicate must be strictly below this.
    Below(f32),
    /// Numeric predicate must be strictly above this.
    Above(f32),
    /// Label predicate must equal this.
    Equals(String),
}

/// One `predicate → expectation` pair of a behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Predicate name.
    pub predicate: String,
    /// Expected value or threshold.
    pub expect: Expect,
}

/// What a predicate evaluates to before comparison.
enum Observed<'a> {
    Flag(bool),
    Number(f32),
    Label(&'a str),
    /// Numeric predicate with nothing to measure (e.g. distance with no target).
    Absent,
}

impl Condition {
    /// Create a condition.
    #[must_use]
    pub fn new(predicate: impl Into<String>, expect: Expect) -> Self {
        Self {
            predicate: predicate.into(),
            expect,
        }
    }

    /// Evaluate against `snapshot` and `memory`.
    ///
    /// `behavior` is only used to label errors.
    ///
    /// # Errors
    /// Returns [`LineageError::ConditionEvaluation`] if the expectation's type
    /// does not fit the predicate (e.g. `health` with `is`).
    pub fn evaluate(
        &self,
        behavior: &str,
        snapshot: &Snapshot,
        memory: &MemorySummary,
    ) -> Result<bool> {
        let Some(observed) = self.observe(snapshot, memory) else {
            trace!(
                behavior,
                predicate = %self.predicate,
                "unknown predicate treated as satisfied"
            );
            return Ok(true);
        };

        match (observed, &self.expect) {
            (Observed::Flag(v), Expect::Is(want)) => Ok(v == *want),
            (Observed::Number(v), Expect::Below(t)) => Ok(v < *t),
            (Observed::Number(v), Expect::Above(t)) => Ok(v > *t),
            (Observed::Absent, Expect::Below(_) | Expect::Above(_)) => Ok(false),
            (Observed::Label(v), Expect::Equals(want)) => Ok(v == want),
            (_, expect) => Err(LineageError::ConditionEvaluation {
                behavior: behavior.to_string(),
                predicate: self.predicate.clone(),
                reason: format!("expectation {expect:?} does not fit this predicate"),
            }),
        }
    }

    fn observe<'a>(&self, snapshot: &'a Snapshot, memory: &MemorySummary) -> Option<Observed<'a>> {
        let observed = match self.predicate.as_str() {
            "state" => Observed::Label(&snapshot.state),
            "health" => Observed::Number(snapshot.health),
            "mana" => Observed::Number(snapshot.mana),
            "level" => Observed::Number(snapshot.level as f32),
            "target_distance" => {
                snapshot.target.map_or(Observed::Absent, |t| Observed::Number(t.distance))
            }
            "defensive_bias" => Observed::Number(snapshot.mood.defensive_bias()),
            "confidence" => Observed::Number(snapshot.mood.confidence()),
            "shared_threat" => Observed::Number(snapshot.shared_threat),
            "has_target" => Observed::Flag(snapshot.target.is_some()),
            "threat_detected" => Observed::Flag(snapshot.threat_detected),
            "target_in_detection_range" => Observed::Flag(snapshot.target_in_detection_range()),
            "target_in_attack_range" => Observed::Flag(snapshot.target_in_attack_range()),
            "combat_experienced" => {
                Observed::Flag(memory.combat_successes > COMBAT_EXPERIENCE_THRESHOLD)
            }
            "seasoned" => Observed::Flag(memory.entry_count > SEASONED_THRESHOLD),
            other => {
                if let Some(action) = other.strip_prefix("prefers:") {
                    Observed::Flag(memory.prefers(action))
                } else {
                    Observed::Flag(*snapshot.flags.get(other)?)
                }
            }
        };
        Some(observed)
    }
}
