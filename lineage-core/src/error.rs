//! Error types for the lineage core library.

use thiserror::Error;

use crate::types::EntityId;

/// Top-level error type for all lineage operations.
#[derive(Error, Debug)]
pub enum LineageError {
    /// An entity with this id is already registered.
    #[error("Entity already registered: {0}")]
    RegistrationConflict(EntityId),

    /// Entity not found in the registry.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A policy backend could not be initialised.
    #[error("Policy backend `{backend}` unavailable: {reason}")]
    MissingDependency {
        /// Which backend failed.
        backend: &'static str,
        /// Why it could not start.
        reason: String,
    },

    /// A condition could not be evaluated against a snapshot.
    #[error("Condition `{predicate}` of behavior `{behavior}` failed: {reason}")]
    ConditionEvaluation {
        /// Behavior owning the condition.
        behavior: String,
        /// Predicate name.
        predicate: String,
        /// What went wrong.
        reason: String,
    },

    /// An effect handler could not apply a decision.
    #[error("Effect `{action}` failed: {reason}")]
    EffectFailed {
        /// Action label.
        action: String,
        /// What went wrong.
        reason: String,
    },

    /// A behavior with this id is already in the catalog.
    #[error("Duplicate behavior id: {0}")]
    DuplicateBehavior(String),

    /// No behavior with this id exists in the catalog.
    #[error("Unknown behavior id: {0}")]
    UnknownBehavior(String),

    /// The rule catalog has no behaviors to evaluate.
    #[error("Behavior catalog is empty")]
    EmptyCatalog,

    /// Save or load of a memory slot failed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The background training worker is not running.
    #[error("Training unavailable: {0}")]
    TrainingUnavailable(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, LineageError>;
