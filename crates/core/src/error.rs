//! Domain error taxonomy.
//!
//! Recoverable per-table outcomes (parse skips, apply failures) are modelled
//! as data (`ApplyResult`, `SkippedStatement`), never as errors. `CoreError`
//! is reserved for conditions that fail a whole request: missing entities,
//! malformed input, and authorization.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
