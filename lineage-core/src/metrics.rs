//! Runtime counters and tick-budget monitoring.
//!
//! Counters are plain `AtomicU64`s bumped on the hot path and read on
//! export. Tick timings use a small ring behind a `parking_lot::Mutex`
//! since they are only read for dashboards and warnings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Event counters shared by the registry, persistence and training worker.
#[derive(Debug)]
pub struct LineageCounters {
    /// Decisions produced by any backend.
    pub decisions: AtomicU64,
    /// Entity ticks that ended without a decision.
    pub idle_ticks: AtomicU64,
    /// Entity ticks that failed and were skipped.
    pub entity_errors: AtomicU64,
    /// Memory entries recorded.
    pub memories_recorded: AtomicU64,
    /// Memory entries dropped by capacity eviction.
    pub memories_evicted: AtomicU64,
    /// Generations moved into archives.
    pub generations_archived: AtomicU64,
    /// Successful slot writes.
    pub saves_completed: AtomicU64,
    /// Failed slot writes.
    pub save_failures: AtomicU64,
    /// Failed or corrupt slot reads.
    pub load_failures: AtomicU64,
    /// Entities that did not get their preferred backend.
    pub backend_fallbacks: AtomicU64,
    /// Training epochs that published parameters.
    pub training_epochs: AtomicU64,
    /// Training epochs abandoned after the timeout.
    pub training_timeouts: AtomicU64,
    /// Batches dropped because the worker queue was full or closed.
    pub training_dropped: AtomicU64,
}

impl LineageCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            decisions: AtomicU64::new(0),
            idle_ticks: AtomicU64::new(0),
            entity_errors: AtomicU64::new(0),
            memories_recorded: AtomicU64::new(0),
            memories_evicted: AtomicU64::new(0),
            generations_archived: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            backend_fallbacks: AtomicU64::new(0),
            training_epochs: AtomicU64::new(0),
            training_timeouts: AtomicU64::new(0),
            training_dropped: AtomicU64::new(0),
        }
    }

    /// Add one to `counter`.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CounterSnapshot {
            decisions: load(&self.decisions),
            idle_ticks: load(&self.idle_ticks),
            entity_errors: load(&self.entity_errors),
            memories_recorded: load(&self.memories_recorded),
            memories_evicted: load(&self.memories_evicted),
            generations_archived: load(&self.generations_archived),
            saves_completed: load(&self.saves_completed),
            save_failures: load(&self.save_failures),
            load_failures: load(&self.load_failures),
            backend_fallbacks: load(&self.backend_fallbacks),
            training_epochs: load(&self.training_epochs),
            training_timeouts: load(&self.training_timeouts),
            training_dropped: load(&self.training_dropped),
        }
    }
}

impl Default for LineageCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CounterSnapshot {
    pub decisions: u64,
    pub idle_ticks: u64,
    pub entity_errors: u64,
    pub memories_recorded: u64,
    pub memories_evicted: u64,
    pub generations_archived: u64,
    pub saves_completed: u64,
    pub save_failures: u64,
    pub load_failures: u64,
    pub backend_fallbacks: u64,
    pub training_epochs: u64,
    pub training_timeouts: u64,
    pub training_dropped: u64,
}

impl CounterSnapshot {
    /// Prometheus text exposition.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 13] = [
            ("decisions", "Decisions produced", self.decisions),
            ("idle_ticks", "Entity ticks without a decision", self.idle_ticks),
            ("entity_errors", "Entity ticks skipped after an error", self.entity_errors),
            ("memories_recorded", "Memory entries recorded", self.memories_recorded),
            ("memories_evicted", "Memory entries evicted", self.memories_evicted),
            ("generations_archived", "Generations archived", self.generations_archived),
            ("saves_completed", "Slot writes completed", self.saves_completed),
            ("save_failures", "Slot writes failed", self.save_failures),
            ("load_failures", "Slot reads failed", self.load_failures),
            ("backend_fallbacks", "Entities on a fallback backend", self.backend_fallbacks),
            ("training_epochs", "Training epochs published", self.training_epochs),
            ("training_timeouts", "Training epochs timed out", self.training_timeouts),
            ("training_dropped", "Training batches dropped", self.training_dropped),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP lineage_{name}_total {help}\n\
                 # TYPE lineage_{name}_total counter\n\
                 lineage_{name}_total {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tick budget monitor
// ---------------------------------------------------------------------------

const TICK_HISTORY: usize = 256;

/// Timing of recent registry ticks against a budget.
#[derive(Debug)]
pub struct TickBudgetMonitor {
    budget_ms: f64,
    history: Mutex<TickHistory>,
}

#[derive(Debug)]
struct TickHistory {
    timings: Vec<f64>,
    write_idx: usize,
    count: u64,
    last_over_budget: bool,
}

impl TickBudgetMonitor {
    /// Monitor with a per-tick budget in milliseconds.
    #[must_use]
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget_ms,
            history: Mutex::new(TickHistory {
                timings: vec![0.0; TICK_HISTORY],
                write_idx: 0,
                count: 0,
                last_over_budget: false,
            }),
        }
    }

    /// Start timing; the guard records on drop.
    pub fn begin_tick(&self) -> TickGuard<'_> {
        TickGuard {
            monitor: self,
            start: Instant::now(),
        }
    }

    /// Record a tick duration. Returns whether it exceeded the budget.
    pub fn record(&self, ms: f64) -> bool {
        let mut h = self.history.lock();
        let idx = h.write_idx;
        h.timings[idx] = ms;
        h.write_idx = (idx + 1) % TICK_HISTORY;
        h.count += 1;
        h.last_over_budget = ms > self.budget_ms;
        h.last_over_budget
    }

    /// Most recent tick duration.
    #[must_use]
    pub fn last_tick_ms(&self) -> f64 {
        let h = self.history.lock();
        if h.count == 0 {
            return 0.0;
        }
        h.timings[(h.write_idx + TICK_HISTORY - 1) % TICK_HISTORY]
    }

    /// Whether the last tick exceeded the budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.history.lock().last_over_budget
    }

    /// P50/P95/P99/max over the recorded window.
    #[must_use]
    pub fn percentiles(&self) -> TickPercentiles {
        let h = self.history.lock();
        let n = usize::try_from(h.count).unwrap_or(usize::MAX).min(TICK_HISTORY);
        if n == 0 {
            return TickPercentiles::default();
        }
        let mut sorted = h.timings[..n].to_vec();
        sorted.sort_by(f64::total_cmp);

        let at = |q: f64| sorted[((n as f64 * q) as usize).min(n - 1)];
        TickPercentiles {
            p50: sorted[n / 2],
            p95: at(0.95),
            p99: at(0.99),
            max: sorted[n - 1],
            over_budget_ratio: sorted.iter().filter(|&&t| t > self.budget_ms).count() as f64
                / n as f64,
        }
    }

    /// Ticks recorded.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.history.lock().count
    }

    /// Budget in milliseconds.
    #[must_use]
    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }
}

/// Records elapsed time into its monitor when dropped.
pub struct TickGuard<'a> {
    monitor: &'a TickBudgetMonitor,
    start: Instant,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.monitor.record(self.start.elapsed().as_secs_f64() * 1000.0);
    }
}

/// Percentile statistics for tick timings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickPercentiles {
    /// Median, in milliseconds.
    pub p50: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
    /// Slowest recorded tick.
    pub max: f64,
    /// Share of ticks over budget, `0.0..=1.0`.
    pub over_budget_ratio: f64,
}

impl TickPercentiles {
    /// One-line human readable summary.
    #[must_use]
    pub fn summary(&self, budget_ms: f64) -> String {
        format!(
            "P50={:.2}ms  P95={:.2}ms  P99={:.2}ms  Max={:.2}ms  \
             Budget={budget_ms:.1}ms  Over-budget={:.1}%",
            self.p50,
            self.p95,
            self.p99,
            self.max,
            self.over_budget_ratio * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(LineageCounters::new().snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn bump_and_export() {
        let c = LineageCounters::new();
        LineageCounters::bump(&c.decisions);
        LineageCounters::bump(&c.decisions);
        LineageCounters::bump(&c.backend_fallbacks);
        let snap = c.snapshot();
        assert_eq!(snap.decisions, 2);
        assert_eq!(snap.backend_fallbacks, 1);

        let prom = snap.to_prometheus();
        assert!(prom.contains("lineage_decisions_total 2"));
        assert!(prom.contains("# TYPE lineage_backend_fallbacks_total counter"));
    }

    #[test]
    fn monitor_tracks_budget() {
        let m = TickBudgetMonitor::new(2.0);
        assert!(!m.record(0.5));
        assert!(m.record(3.0));
        assert!(m.is_over_budget());
        assert_eq!(m.tick_count(), 2);
        assert!((m.last_tick_ms() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ring_wraps_and_percentiles_order() {
        let m = TickBudgetMonitor::new(2.0);
        for i in 0..300 {
            m.record(f64::from(i) * 0.01);
        }
        let p = m.percentiles();
        assert!(p.p50 <= p.p95 && p.p95 <= p.p99 && p.p99 <= p.max);
        assert!((p.max - 2.99).abs() < 1e-9);
        assert!(p.summary(2.0).contains("Budget=2.0ms"));
    }

    #[test]
    fn guard_records_on_drop() {
        let m = TickBudgetMonitor::new(100.0);
        {
            let _tick = m.begin_tick();
        }
        assert_eq!(m.tick_count(), 1);
    }
}
