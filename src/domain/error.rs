//! Domain-level errors (no external dependencies)

use generational_arena::Index;
use thiserror::Error;

/// Contract violations: a caller handed the domain something that cannot
/// belong to the tree it operates on. Data-quality problems are never
/// reported through this type, see [`crate::domain::StructuralError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found in hierarchy: {0:?}")]
    NodeNotFound(Index),

    #[error("unknown employee id: {0}")]
    UnknownEmployee(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
