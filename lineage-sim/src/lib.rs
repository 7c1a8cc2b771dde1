//! # Lineage Sim
//!
//! Host integration for `lineage-core`.
//!
//! ```text
//!   host loop ──update(dt)──▶ Registry
//!                               │
//!        ┌──────────────────────┼───────────────────────┐
//!        ▼                      ▼                       ▼
//!  integration::build_snapshot  PolicyBackend     effects::apply
//!   (stats, combat, mood,       (per entity)      (stats, inventory,
//!    shared knowledge)                             skills, combat)
//!                                                       │
//!   EventBus ──domain events──▶ MoodLedger ◀────────────┘
//! ```
//!
//! ## Modules
//!
//! - `collaborators`: traits the host implements over its game systems
//! - `events`: named-event bus and typed domain events
//! - `mood`: PAD mood folded from events
//! - `integration`: per-tick snapshot assembly
//! - `effects`: decision effect handlers
//! - `registry`: entity lifecycle and the update loop
//! - `config`: host TOML configuration
//! - `telemetry`: tracing subscriber setup

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collaborators;
pub mod config;
pub mod effects;
pub mod events;
pub mod integration;
pub mod mood;
pub mod registry;
pub mod telemetry;

pub use collaborators::{
    AttackOutcome, Collaborators, CombatProvider, EquipSlot, InventoryProvider, Item, ItemKind,
    SkillInfo, SkillProvider, SkillSchool, StatKind, StatsProvider,
};
pub use config::{IntegrationConfig, SimConfig};
pub use events::{DomainEvent, EventBus, EventPayload};
pub use mood::MoodLedger;
pub use registry::{EntityData, EntityState, Registry, RegistryMetrics, ShutdownReport};
