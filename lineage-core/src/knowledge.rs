//! Process-wide shared knowledge.
//!
//! Entities report threats, action outcomes and where they have been. All
//! writes go through one coarse `parking_lot::Mutex`, so the store stays
//! correct even if entity updates are later spread across threads.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::memory::entry::clamp_unit;
use crate::types::{EntityId, Position, SimTime};

/// Reports needed for a threat level of 1.0.
pub const THREAT_SATURATION: f32 = 5.0;

/// Seconds after which a threat report no longer counts.
pub const THREAT_MEMORY_SECS: f64 = 300.0;

/// Side length of a territory grid cell.
pub const TERRITORY_CELL: f32 = 10.0;

/// Most territory cells tracked at once; the least-visited cell makes room.
pub const MAX_TERRITORY_CELLS: usize = 4096;

/// What the population knows about one potential threat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatReport {
    /// Times the target was reported.
    pub reports: u32,
    /// Where it was last seen.
    pub last_position: Position,
    /// When it was last seen.
    pub last_seen: SimTime,
}

#[derive(Debug, Default)]
struct KnowledgeState {
    threats: HashMap<EntityId, ThreatReport>,
    action_success: HashMap<String, u32>,
    territory: HashMap<(i32, i32), u32>,
}

impl KnowledgeState {
    /// Drop reports that no longer contribute any threat at `now`.
    fn prune_threats(&mut self, now: SimTime) {
        self.threats.retain(|_, r| now - r.last_seen < THREAT_MEMORY_SECS);
    }
}

/// Threat reports, action tallies and a territory visit grid.
#[derive(Debug, Default)]
pub struct SharedKnowledge {
    state: Mutex<KnowledgeState>,
}

impl SharedKnowledge {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of `target` at `position`.
    ///
    /// Reports older than [`THREAT_MEMORY_SECS`] are dropped on the way in,
    /// so targets that are never unregistered do not accumulate.
    pub fn report_threat(&self, target: EntityId, position: Position, now: SimTime) {
        let mut state = self.state.lock();
        state.prune_threats(now);
        let report = state.threats.entry(target).or_insert(ThreatReport {
            reports: 0,
            last_position: position,
            last_seen: now,
        });
        report.reports = report.reports.saturating_add(1);
        report.last_position = position;
        report.last_seen = report.last_seen.max(now);
    }

    /// Threat level of `target` in `[0, 1]`.
    ///
    /// Grows with the number of reports and fades linearly to zero over
    /// [`THREAT_MEMORY_SECS`] since the last sighting.
    #[must_use]
    pub fn threat_level(&self, target: EntityId, now: SimTime) -> f32 {
        let mut state = self.state.lock();
        let Some(report) = state.threats.get(&target).copied() else {
            return 0.0;
        };
        let age = (now - report.last_seen).max(0.0);
        if age >= THREAT_MEMORY_SECS {
            state.threats.remove(&target);
            return 0.0;
        }
        let freshness = (1.0 - age / THREAT_MEMORY_SECS).max(0.0) as f32;
        clamp_unit(report.reports as f32 / THREAT_SATURATION * freshness)
    }

    /// Last report for `target`.
    #[must_use]
    pub fn threat(&self, target: EntityId) -> Option<ThreatReport> {
        self.state.lock().threats.get(&target).copied()
    }

    /// Tally a successful action under `successful_<action>`.
    pub fn record_outcome(&self, action: Action, success: bool) {
        if !success {
            return;
        }
        let mut state = self.state.lock();
        *state.action_success.entry(format!("successful_{action}")).or_insert(0) += 1;
    }

    /// Successes recorded for `action` by everyone.
    #[must_use]
    pub fn successes(&self, action: Action) -> u32 {
        self.state
            .lock()
            .action_success
            .get(&format!("successful_{action}"))
            .copied()
            .unwrap_or(0)
    }

    /// Mark the cell containing `position` as visited.
    ///
    /// At [`MAX_TERRITORY_CELLS`] a new cell replaces the least-visited one.
    pub fn visit(&self, position: Position) {
        let cell = position.cell(TERRITORY_CELL);
        let mut state = self.state.lock();
        let territory = &mut state.territory;
        if !territory.contains_key(&cell) && territory.len() >= MAX_TERRITORY_CELLS {
            let coldest = territory.iter().min_by_key(|(_, visits)| **visits).map(|(c, _)| *c);
            if let Some(coldest) = coldest {
                territory.remove(&coldest);
            }
        }
        *territory.entry(cell).or_insert(0) += 1;
    }

    /// Number of territory cells tracked.
    #[must_use]
    pub fn territory_cells(&self) -> usize {
        self.state.lock().territory.len()
    }

    /// Visits recorded in the cell containing `position`.
    #[must_use]
    pub fn visits(&self, position: Position) -> u32 {
        let cell = position.cell(TERRITORY_CELL);
        self.state.lock().territory.get(&cell).copied().unwrap_or(0)
    }

    /// Drop threat reports about `target`, e.g. after it is unregistered.
    pub fn forget(&self, target: EntityId) {
        self.state.lock().threats.remove(&target);
    }

    /// Number of targets with threat reports.
    #[must_use]
    pub fn known_threats(&self) -> usize {
        self.state.lock().threats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_saturates_and_fades() {
        let k = SharedKnowledge::new();
        let target = EntityId::new();
        for _ in 0..10 {
            k.report_threat(target, Position::new(1.0, 2.0, 0.0), 0.0);
        }
        assert!((k.threat_level(target, 0.0) - 1.0).abs() < f32::EPSILON);
        assert!((k.threat_level(target, 150.0) - 0.5).abs() < 1e-6);
        assert!(k.threat_level(target, 400.0).abs() < f32::EPSILON);
        assert!(k.threat_level(EntityId::new(), 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_reports() {
        let k = SharedKnowledge::new();
        let target = EntityId::new();
        k.report_threat(target, Position::default(), 10.0);
        assert!((k.threat_level(target, 10.0) - 0.2).abs() < 1e-6);
        assert_eq!(k.threat(target).expect("report").reports, 1);
        k.forget(target);
        assert_eq!(k.known_threats(), 0);
    }

    #[test]
    fn only_successes_are_tallied() {
        let k = SharedKnowledge::new();
        k.record_outcome(Action::Attack, true);
        k.record_outcome(Action::Attack, false);
        k.record_outcome(Action::Attack, true);
        assert_eq!(k.successes(Action::Attack), 2);
        assert_eq!(k.successes(Action::Flee), 0);
    }

    #[test]
    fn stale_threats_are_pruned() {
        let k = SharedKnowledge::new();
        let player = EntityId::new();
        let wolf = EntityId::new();
        k.report_threat(player, Position::default(), 0.0);
        k.report_threat(wolf, Position::default(), 100.0);
        assert_eq!(k.known_threats(), 2);

        k.report_threat(wolf, Position::default(), THREAT_MEMORY_SECS + 50.0);
        assert_eq!(k.known_threats(), 1);
        assert!(k.threat(player).is_none());

        assert!(k.threat_level(wolf, 1_000.0).abs() < f32::EPSILON);
        assert_eq!(k.known_threats(), 0);
    }

    #[test]
    fn territory_is_capped() {
        let k = SharedKnowledge::new();
        let home = Position::new(5.0, 5.0, 0.0);
        k.visit(home);
        k.visit(home);
        for i in 0..MAX_TERRITORY_CELLS + 10 {
            k.visit(Position::new(TERRITORY_CELL * (i as f32 + 1.0), 0.0, 0.0));
        }
        assert_eq!(k.territory_cells(), MAX_TERRITORY_CELLS);
        assert_eq!(k.visits(home), 2);
    }

    #[test]
    fn territory_groups_by_cell() {
        let k = SharedKnowledge::new();
        k.visit(Position::new(1.0, 1.0, 0.0));
        k.visit(Position::new(9.0, 9.0, 5.0));
        k.visit(Position::new(11.0, 1.0, 0.0));
        assert_eq!(k.visits(Position::new(5.0, 5.0, 0.0)), 2);
        assert_eq!(k.visits(Position::new(15.0, 5.0, 0.0)), 1);
    }
}
