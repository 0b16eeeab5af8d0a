//! Error types for the cordsync domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type.

use thiserror::Error;

/// A raw gateway payload could not be turned into an entity.
///
/// Actions never let these cross the dispatch boundary; they are reported as
/// diagnostic notifications instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("{entity} payload is missing `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity} payload has an invalid shape: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error("Invalid collector option `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("Collector target is not cached: {0}")]
    UnknownTarget(String),
}
