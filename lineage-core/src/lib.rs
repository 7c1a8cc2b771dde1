//! # Lineage Core
//!
//! Game-agnostic decision making and generational learning for non-player
//! entities.
//!
//! Each entity owns a [`MemoryStore`] of resolved actions. Every tick a
//! [`PolicyBackend`] turns a [`Snapshot`] of the entity plus a
//! [`MemorySummary`] of its past into at most one [`Decision`]. When an
//! entity dies, [`MemoryStore::end_generation`] folds its current memory
//! into a bounded archive so the next generation starts wiser.
//!
//! Backends:
//! - **rule** evaluates a [`BehaviorCatalog`] by priority and cooldown
//! - **learned** samples a softmax policy trained in the background by the
//!   [`TrainingWorker`]
//! - **idle** always idles and cannot fail
//!
//! Nothing here touches a game engine. The `lineage-sim` crate wires these
//! pieces to game collaborators through a registry.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod behavior;
pub mod config;
pub mod decision;
pub mod error;
pub mod eviction;
pub mod knowledge;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod policy;
pub mod retrieval;
pub mod snapshot;
pub mod training;
pub mod types;

pub use action::Action;
pub use behavior::{Behavior, BehaviorCatalog, Condition, Expect};
pub use config::LineageConfig;
pub use decision::{Decision, DecisionEngine};
pub use error::{LineageError, Result};
pub use knowledge::SharedKnowledge;
pub use memory::{
    GenerationRecord, MemoryCategory, MemoryEntry, MemoryStore, MemorySummary, TerminationCause,
};
pub use metrics::{LineageCounters, TickBudgetMonitor};
pub use persistence::{InMemorySlotStore, PersistenceEngine, SlotStore, StorageCodec};
pub use policy::{PolicyBackend, PolicyFactory};
pub use snapshot::{Snapshot, TargetInfo};
pub use training::{TrainingBatch, TrainingWorker};
pub use types::*;
