//! Assembling the per-tick [`Snapshot`] from collaborators.

use lineage_core::LineageError;
use lineage_core::config::DecisionConfig;
use lineage_core::error::Result;
use lineage_core::knowledge::SharedKnowledge;
use lineage_core::snapshot::Snapshot;
use lineage_core::types::{EntityId, EntityKind, Mood, ProfileTag, SimTime};

use crate::collaborators::Collaborators;
use crate::config::IntegrationConfig;

/// Mood defensive bias above which the `shaken` flag is set.
pub const SHAKEN_THRESHOLD: f32 = 0.5;
/// Mood confidence above which the `emboldened` flag is set.
pub const EMBOLDENED_THRESHOLD: f32 = 0.7;

/// Static facts about the entity a snapshot is built for.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSubject {
    /// Entity id.
    pub id: EntityId,
    /// Role.
    pub kind: EntityKind,
    /// Behavior profile.
    pub profile: ProfileTag,
}

/// Read-only inputs shared by every snapshot in a tick.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSources<'a> {
    /// Game systems.
    pub collaborators: &'a Collaborators,
    /// Threat reports.
    pub knowledge: &'a SharedKnowledge,
    /// Ranges.
    pub decision: &'a DecisionConfig,
    /// Flag thresholds.
    pub integration: &'a IntegrationConfig,
}

/// Build the snapshot for `subject` at `now`.
///
/// Sets the `low_health`, `shaken` and `emboldened` flags.
///
/// # Errors
/// Returns [`LineageError::EntityNotFound`] if the stats system does not
/// know the entity.
pub fn build_snapshot(
    subject: SnapshotSubject,
    mood: Mood,
    now: SimTime,
    sources: &SnapshotSources<'_>,
) -> Result<Snapshot> {
    let id = subject.id;
    let stats = &sources.collaborators.stats;
    let combat = &sources.collaborators.combat;

    let health = stats.get_health_fraction(id).ok_or(LineageError::EntityNotFound(id))?;
    let target = combat.current_target(id);

    let mut snapshot = Snapshot::new(id, now);
    snapshot.kind = subject.kind;
    snapshot.profile = subject.profile;
    snapshot.health = health.clamp(0.0, 1.0);
    snapshot.mana = stats.get_mana_fraction(id).clamp(0.0, 1.0);
    snapshot.level = stats.get_level(id);
    snapshot.experience = stats.get_experience(id);
    snapshot.position = combat.position(id).unwrap_or_default();
    snapshot.threat_detected = combat.threat_detected(id);
    snapshot.mood = mood;
    snapshot.shared_threat = target.map_or(0.0, |t| sources.knowledge.threat_level(t.id, now));
    snapshot.detection_range = sources.decision.detection_range;
    snapshot.attack_range = sources.decision.attack_range;

    Ok(snapshot
        .with_target(target)
        .with_flag("low_health", health < sources.integration.low_health_threshold)
        .with_flag("shaken", mood.defensive_bias() > SHAKEN_THRESHOLD)
        .with_flag("emboldened", mood.confidence() > EMBOLDENED_THRESHOLD))
}
