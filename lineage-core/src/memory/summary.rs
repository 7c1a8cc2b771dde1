//! Compact view of what an entity has learned, handed to policy backends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::memory::entry::{MemoryCategory, MemoryEntry};

/// Attempts an action needs before it can count as preferred.
const PREFERRED_MIN_ATTEMPTS: u32 = 2;
/// Success rate an action must exceed to count as preferred.
const PREFERRED_SUCCESS_RATE: f32 = 0.6;
/// How many of the newest entries are scanned for action combinations.
const COMBINATION_WINDOW: usize = 20;

/// Success tally for one action or skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTally {
    /// Successful attempts.
    pub successes: u32,
    /// All attempts.
    pub attempts: u32,
}

impl ActionTally {
    /// Success rate; 0 when never attempted.
    #[must_use]
    pub fn rate(&self) -> f32 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f32 / self.attempts as f32
        }
    }

    fn add(&mut self, success: bool) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
    }
}

/// Patterns extracted from an entity's current memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    /// Current entry count.
    pub entry_count: usize,
    /// Current generation id.
    pub generation_id: u32,
    /// Experience gained in the current generation.
    pub current_experience: f32,
    /// Lifetime success rate across all generations.
    pub success_rate: f32,
    /// Success rate of current combat entries.
    pub combat_success_rate: f32,
    /// Successful combat entries currently held.
    pub combat_successes: u32,
    /// Per-action tallies over current entries.
    pub actions: BTreeMap<String, ActionTally>,
    /// Actions with a clear track record, and their success rate.
    pub preferred_actions: BTreeMap<String, f32>,
    /// `"a -> b"` pairs of consecutive successes among recent entries.
    pub successful_combinations: Vec<String>,
    /// Per-skill tallies from skill-use entries with a `skill_name` context.
    pub skill_usage: BTreeMap<String, ActionTally>,
}

impl MemorySummary {
    /// Analyse `entries` (oldest first).
    #[must_use]
    pub fn analyse(entries: &[MemoryEntry]) -> Self {
        let mut summary = Self {
            entry_count: entries.len(),
            ..Self::default()
        };

        let mut combat = ActionTally::default();
        for entry in entries {
            summary.actions.entry(entry.action.clone()).or_default().add(entry.success);
            if entry.category == MemoryCategory::Combat {
                combat.add(entry.success);
            }
            if entry.category == MemoryCategory::SkillUse {
                if let Some(skill) = entry.context.get("skill_name").and_then(|v| v.as_text()) {
                    summary.skill_usage.entry(skill.to_string()).or_default().add(entry.success);
                }
            }
        }
        summary.combat_success_rate = combat.rate();
        summary.combat_successes = combat.successes;

        summary.preferred_actions = summary
            .actions
            .iter()
            .filter(|(_, t)| {
                t.attempts >= PREFERRED_MIN_ATTEMPTS && t.rate() > PREFERRED_SUCCESS_RATE
            })
            .map(|(a, t)| (a.clone(), t.rate()))
            .collect();

        let recent = &entries[entries.len().saturating_sub(COMBINATION_WINDOW)..];
        for pair in recent.windows(2) {
            if pair[0].success && pair[1].success {
                let combo = format!("{} -> {}", pair[0].action, pair[1].action);
                if !summary.successful_combinations.contains(&combo) {
                    summary.successful_combinations.push(combo);
                }
            }
        }

        summary
    }

    /// Whether `action` is among the preferred actions.
    #[must_use]
    pub fn prefers(&self, action: &str) -> bool {
        self.preferred_actions.contains_key(action)
    }
}
