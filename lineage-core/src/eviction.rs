//! Capacity enforcement for memory entries and the generation archive.
//!
//! Both collections keep insertion order; eviction removes the lowest-valued
//! element, and among equal values the one inserted first.

use crate::memory::entry::MemoryEntry;
use crate::memory::generation::GenerationRecord;

/// Remove lowest-`key` items until `items.len() <= capacity`.
///
/// Returns the evicted items in eviction order.
pub fn evict_lowest<T, F>(items: &mut Vec<T>, capacity: usize, key: F) -> Vec<T>
where
    F: Fn(&T) -> f32,
{
    let mut evicted = Vec::new();
    while items.len() > capacity {
        let mut victim = 0;
        let mut lowest = f32::INFINITY;
        for (i, item) in items.iter().enumerate() {
            let k = key(item);
            let k = if k.is_nan() { f32::NEG_INFINITY } else { k };
            if k < lowest {
                lowest = k;
                victim = i;
            }
        }
        evicted.push(items.remove(victim));
    }
    evicted
}

/// Evict lowest-learning-value entries past `capacity`.
pub fn evict_entries(entries: &mut Vec<MemoryEntry>, capacity: usize) -> Vec<MemoryEntry> {
    evict_lowest(entries, capacity, |e| e.learning_value)
}

/// Evict lowest-experience generations past `capacity`.
pub fn evict_generations(
    archive: &mut Vec<GenerationRecord>,
    capacity: usize,
) -> Vec<GenerationRecord> {
    evict_lowest(archive, capacity, |g| g.total_experience)
}
