//! Lifetime counters carried across generations.

use serde::{Deserialize, Serialize};

use crate::memory::entry::{MemoryCategory, MemoryEntry};
use crate::memory::generation::StatSheet;

/// Running totals for one entity's whole lineage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Generations archived so far.
    pub total_generations: u32,
    /// Experience over all generations.
    pub total_experience: f64,
    /// Entries ever recorded (including evicted ones).
    pub total_memories: u64,
    /// Entries whose action succeeded.
    pub successful_actions: u64,
    /// Entries whose action failed.
    pub failed_actions: u64,
    /// Successful combat entries.
    pub combat_wins: u64,
    /// Failed combat entries.
    pub combat_losses: u64,
    /// Skills acquired.
    pub skills_learned: u64,
    /// Items consumed or equipped.
    pub items_used: u64,
}

impl MemoryStats {
    /// Fold one new entry into the counters.
    pub fn record(&mut self, entry: &MemoryEntry, experience_gain: f32) {
        self.total_memories += 1;
        self.total_experience += f64::from(experience_gain);
        if entry.success {
            self.successful_actions += 1;
        } else {
            self.failed_actions += 1;
        }
        match (entry.category, entry.success) {
            (MemoryCategory::Combat, true) => self.combat_wins += 1,
            (MemoryCategory::Combat, false) => self.combat_losses += 1,
            (MemoryCategory::SkillUse, true)
                if entry.outcome.get("skill_learned").and_then(|v| v.as_text()).is_some() =>
            {
                self.skills_learned += 1;
            }
            (MemoryCategory::ItemUse, true) => self.items_used += 1,
            _ => {}
        }
    }

    /// Overall success rate; 0 when nothing has been recorded.
    #[must_use]
    pub fn success_rate(&self) -> f32 {
        let total = self.successful_actions + self.failed_actions;
        if total == 0 {
            0.0
        } else {
            self.successful_actions as f32 / total as f32
        }
    }

    /// Flatten into a stat sheet for generation records.
    #[must_use]
    pub fn to_sheet(&self) -> StatSheet {
        [
            ("total_generations", f64::from(self.total_generations)),
            ("total_experience", self.total_experience),
            ("total_memories", self.total_memories as f64),
            ("successful_actions", self.successful_actions as f64),
            ("failed_actions", self.failed_actions as f64),
            ("combat_wins", self.combat_wins as f64),
            ("combat_losses", self.combat_losses as f64),
            ("skills_learned", self.skills_learned as f64),
            ("items_used", self.items_used as f64),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextMap, ContextValue};

    fn skill_entry(outcome: ContextMap, success: bool) -> MemoryEntry {
        MemoryEntry::with_learning_value(
            MemoryCategory::SkillUse,
            ContextMap::new(),
            "learn_skill",
            outcome,
            success,
            0.0,
            0.5,
        )
    }

    #[test]
    fn counts_learned_skills_by_name() {
        let mut stats = MemoryStats::default();
        let mut outcome = ContextMap::new();
        outcome.insert("skill_learned".into(), ContextValue::Text("fireball".into()));
        stats.record(&skill_entry(outcome.clone(), true), 0.5);
        stats.record(&skill_entry(outcome, false), 0.5);
        stats.record(&skill_entry(ContextMap::new(), true), 0.5);

        assert_eq!(stats.skills_learned, 1);
        assert_eq!(stats.total_memories, 3);
        assert_eq!(stats.failed_actions, 1);
    }
}
