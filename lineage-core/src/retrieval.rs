//! Relevance scoring for memory queries.
//!
//! Score = LearningValue(m) + 0.3·Similarity(ctx, m.ctx) + 0.2·Recency(m)
//!
//! Where:
//!   Similarity = mean per-key similarity over keys both contexts share
//!   Recency    = max(0, 1 − age / 1 hour)

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::memory::entry::MemoryEntry;
use crate::types::{ContextMap, ContextValue, SimTime};

/// Weight of context similarity in the relevance score.
pub const SIMILARITY_WEIGHT: f32 = 0.3;
/// Weight of the recency bonus in the relevance score.
pub const RECENCY_WEIGHT: f32 = 0.2;
/// Age at which the recency bonus reaches zero.
pub const RECENCY_HORIZON_SECS: f64 = 3600.0;

/// Totally ordered relevance score for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelevanceScore(pub OrderedFloat<f32>);

impl RelevanceScore {
    /// Create a relevance score from a raw f32.
    #[must_use]
    pub fn new(score: f32) -> Self {
        Self(OrderedFloat(score))
    }

    /// Get the raw score value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0.into_inner()
    }
}

/// A query result: the entry and why it ranked where it did.
#[derive(Debug, Clone, Copy)]
pub struct RankedEntry<'a> {
    /// Matching entry.
    pub entry: &'a MemoryEntry,
    /// Combined relevance score.
    pub score: RelevanceScore,
}

/// Full relevance score of `entry` for a query `context` at time `now`.
#[must_use]
pub fn relevance(entry: &MemoryEntry, context: &ContextMap, now: SimTime) -> RelevanceScore {
    let score = entry.learning_value
        + SIMILARITY_WEIGHT * context_similarity(context, &entry.context)
        + RECENCY_WEIGHT * recency_bonus(entry.age(now));
    RelevanceScore::new(score)
}

/// Linear recency bonus in `[0, 1]`.
#[must_use]
pub fn recency_bonus(age_secs: f64) -> f32 {
    (1.0 - age_secs / RECENCY_HORIZON_SECS).max(0.0) as f32
}

/// Mean similarity over keys both maps share; 0 when none are shared.
#[must_use]
pub fn context_similarity(a: &ContextMap, b: &ContextMap) -> f32 {
    let mut total = 0.0f64;
    let mut shared = 0u32;
    for (key, left) in a {
        if let Some(right) = b.get(key) {
            total += value_similarity(left, right);
            shared += 1;
        }
    }
    if shared == 0 {
        0.0
    } else {
        (total / f64::from(shared)) as f32
    }
}

fn value_similarity(a: &ContextValue, b: &ContextValue) -> f64 {
    match (a, b) {
        (ContextValue::Number(x), ContextValue::Number(y)) => {
            let scale = x.abs().max(y.abs());
            if scale > 0.0 {
                (1.0 - (x - y).abs() / scale).max(0.0)
            } else {
                1.0 // both zero
            }
        }
        (ContextValue::Text(x), ContextValue::Text(y)) => {
            if x == y {
                1.0
            } else if x.contains(y.as_str()) || y.contains(x.as_str()) {
                0.5
            } else {
                0.0
            }
        }
        (ContextValue::Flag(x), ContextValue::Flag(y)) => {
            if x == y { 1.0 } else { 0.0 }
        }
        _ => 0.0,
    }
}
