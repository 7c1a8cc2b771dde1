//! The closed set of actions an entity can take.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::memory::MemoryCategory;

/// Something an entity can do in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Do nothing.
    Idle,
    /// Walk a fixed route.
    Patrol,
    /// Drift aimlessly.
    Wander,
    /// Move toward unexplored ground.
    Explore,
    /// Close distance to the target.
    Chase,
    /// Strike the target.
    Attack,
    /// Hold position and brace.
    Defend,
    /// Move away from the threat.
    Flee,
    /// Drink a healing item.
    Heal,
    /// Drink a mana item.
    RestoreMana,
    /// Swap in better gear.
    EquipBest,
    /// Spend unallocated stat points.
    DistributeStatPoints,
    /// Acquire a new skill.
    LearnSkill,
    /// Talk to or trade with the target.
    Interact,
}

impl Action {
    /// Every action, in a fixed order that indexes learned parameters.
    pub const ALL: [Self; 14] = [
        Self::Idle,
        Self::Patrol,
        Self::Wander,
        Self::Explore,
        Self::Chase,
        Self::Attack,
        Self::Defend,
        Self::Flee,
        Self::Heal,
        Self::RestoreMana,
        Self::EquipBest,
        Self::DistributeStatPoints,
        Self::LearnSkill,
        Self::Interact,
    ];

    /// Number of actions.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this action in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|a| *a == self).unwrap_or(0)
    }

    /// Stable label, also used as the memory entry action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Patrol => "patrol",
            Self::Wander => "wander",
            Self::Explore => "explore",
            Self::Chase => "chase",
            Self::Attack => "attack",
            Self::Defend => "defend",
            Self::Flee => "flee",
            Self::Heal => "heal",
            Self::RestoreMana => "restore_mana",
            Self::EquipBest => "equip_best",
            Self::DistributeStatPoints => "distribute_stat_points",
            Self::LearnSkill => "learn_skill",
            Self::Interact => "interact",
        }
    }

    /// Memory category an outcome of this action is filed under.
    #[must_use]
    pub const fn category(self) -> MemoryCategory {
        match self {
            Self::Chase | Self::Attack | Self::Defend | Self::Flee => MemoryCategory::Combat,
            Self::Patrol | Self::Wander | Self::Explore => MemoryCategory::Movement,
            Self::LearnSkill | Self::DistributeStatPoints => MemoryCategory::SkillUse,
            Self::Heal | Self::RestoreMana | Self::EquipBest => MemoryCategory::ItemUse,
            Self::Interact => MemoryCategory::Social,
            Self::Idle => MemoryCategory::Environment,
        }
    }

    /// Whether the action needs a target to make sense.
    #[must_use]
    pub const fn needs_target(self) -> bool {
        matches!(self, Self::Chase | Self::Attack | Self::Interact)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
        assert!("dance".parse::<Action>().is_err());
    }

    #[test]
    fn indices_are_dense() {
        for (i, action) in Action::ALL.into_iter().enumerate() {
            assert_eq!(action.index(), i);
        }
    }
}
