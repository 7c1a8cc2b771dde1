//! Core type definitions shared by every lineage subsystem.
//!
//! All types are serializable so they can travel through persistence and
//! diagnostics unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Simulation time in seconds since the registry was initialised.
pub type SimTime = f64;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable identity of an NPC, enemy or player across ticks and saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Fresh v4 id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Stable 64-bit seed derived from the id, used to seed per-entity RNGs.
    #[must_use]
    pub fn seed(&self) -> u64 {
        let bits = self.0.as_u128();
        (bits as u64) ^ ((bits >> 64) as u64)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broad role of an entity. Selects its memory capacity and learning rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Player-controlled character.
    Player,
    /// Hostile creature.
    Enemy,
    /// Neutral non-player character.
    #[default]
    Npc,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Enemy => write!(f, "enemy"),
            Self::Npc => write!(f, "npc"),
        }
    }
}

/// Behavior-profile tag. Chooses which preset catalog an entity starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTag {
    /// Closes distance and attacks whenever possible.
    Aggressive,
    /// Holds ground, heals early, flees sooner.
    Defensive,
    /// Explores and wanders when unthreatened.
    Curious,
    /// Prioritises skills and stat upkeep.
    Scholar,
    /// A little of everything.
    #[default]
    Balanced,
}

impl fmt::Display for ProfileTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Aggressive => "aggressive",
            Self::Defensive => "defensive",
            Self::Curious => "curious",
            Self::Scholar => "scholar",
            Self::Balanced => "balanced",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// World-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Position {
    /// Create a position from coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Integer grid cell containing this position, `cell_size` units per side.
    #[must_use]
    pub fn cell(&self, cell_size: f32) -> (i32, i32) {
        let size = if cell_size > 0.0 { cell_size } else { 1.0 };
        ((self.x / size).floor() as i32, (self.y / size).floor() as i32)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Context values
// ---------------------------------------------------------------------------

/// A single value in a context or outcome map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContextValue {
    /// Numeric value.
    Number(f64),
    /// Free-form label.
    Text(String),
    /// Boolean flag.
    Flag(bool),
}

impl ContextValue {
    /// Numeric view, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text view, if this is a label.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view, if this is a flag.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for ContextValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<f32> for ContextValue {
    fn from(v: f32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<u32> for ContextValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<bool> for ContextValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<&str> for ContextValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Ordered key/value map used for memory contexts and action outcomes.
pub type ContextMap = BTreeMap<String, ContextValue>;

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Stable personality traits, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Willingness to start and stay in fights.
    pub aggression: f32,
    /// Drive to explore and try new things.
    pub curiosity: f32,
    /// Risk aversion.
    pub caution: f32,
    /// Preference for company and cooperation.
    pub sociability: f32,
    /// How quickly habits shift with experience.
    pub adaptability: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            aggression: 0.5,
            curiosity: 0.5,
            caution: 0.5,
            sociability: 0.5,
            adaptability: 0.5,
        }
    }
}

/// Dominant behavioral leaning derived from [`Personality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tendency {
    /// Aggression dominates.
    Aggressive,
    /// Caution dominates.
    Defensive,
    /// Curiosity dominates.
    Explorative,
    /// Sociability dominates.
    Social,
    /// No trait stands out.
    Balanced,
}

impl Personality {
    /// A trait must exceed this to count as dominant.
    const DOMINANT_THRESHOLD: f32 = 0.6;

    /// Create a personality, clamping every trait to `[0, 1]`.
    #[must_use]
    pub fn new(
        aggression: f32,
        curiosity: f32,
        caution: f32,
        sociability: f32,
        adaptability: f32,
    ) -> Self {
        Self {
            aggression: aggression.clamp(0.0, 1.0),
            curiosity: curiosity.clamp(0.0, 1.0),
            caution: caution.clamp(0.0, 1.0),
            sociability: sociability.clamp(0.0, 1.0),
            adaptability: adaptability.clamp(0.0, 1.0),
        }
    }

    /// The strongest trait above the dominance threshold, or `Balanced`.
    ///
    /// Ties resolve in the order aggression, caution, curiosity, sociability.
    #[must_use]
    pub fn tendency(&self) -> Tendency {
        let candidates = [
            (self.aggression, Tendency::Aggressive),
            (self.caution, Tendency::Defensive),
            (self.curiosity, Tendency::Explorative),
            (self.sociability, Tendency::Social),
        ];
        let mut best: Option<(f32, Tendency)> = None;
        for (value, tendency) in candidates {
            if value > Self::DOMINANT_THRESHOLD && best.is_none_or(|(b, _)| value > b) {
                best = Some((value, tendency));
            }
        }
        best.map_or(Tendency::Balanced, |(_, t)| t)
    }
}

// ---------------------------------------------------------------------------
// Emotional Model: PAD (Pleasure-Arousal-Dominance)
// ---------------------------------------------------------------------------

/// Short-lived emotional state folded from domain events. Every axis is
/// clamped to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Mood {
    /// Displeased at -1, content at +1.
    pub pleasure: f32,
    /// Drowsy at -1, agitated at +1.
    pub arousal: f32,
    /// Cowed at -1, in control at +1.
    pub dominance: f32,
}

impl Mood {
    /// All three axes at zero.
    pub const NEUTRAL: Self = Self {
        pleasure: 0.0,
        arousal: 0.0,
        dominance: 0.0,
    };

    /// Create a mood, clamping values to [-1, 1].
    #[must_use]
    pub fn new(pleasure: f32, arousal: f32, dominance: f32) -> Self {
        Self {
            pleasure: pleasure.clamp(-1.0, 1.0),
            arousal: arousal.clamp(-1.0, 1.0),
            dominance: dominance.clamp(-1.0, 1.0),
        }
    }

    /// Add a delta on each axis, clamping the result.
    #[must_use]
    pub fn shifted(&self, pleasure: f32, arousal: f32, dominance: f32) -> Self {
        Self::new(
            self.pleasure + pleasure,
            self.arousal + arousal,
            self.dominance + dominance,
        )
    }

    /// Blend two moods with a weight (0.0 = self, 1.0 = other).
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.pleasure + (other.pleasure - self.pleasure) * t,
            self.arousal + (other.arousal - self.arousal) * t,
            self.dominance + (other.dominance - self.dominance) * t,
        )
    }

    /// How strongly the entity leans toward defensive behavior, in `[0, 1]`.
    ///
    /// Submission and agitation push it up, contentment pulls it down.
    #[must_use]
    pub fn defensive_bias(&self) -> f32 {
        ((-self.dominance + 0.5 * self.arousal - 0.5 * self.pleasure) / 2.0 + 0.5).clamp(0.0, 1.0)
    }

    /// Self-assurance in `[0, 1]`. Neutral mood maps to 0.5.
    #[must_use]
    pub fn confidence(&self) -> f32 {
        ((self.dominance + 0.5 * self.pleasure) / 1.5 * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
