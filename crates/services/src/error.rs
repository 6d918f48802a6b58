//! Shared error types for the services crate.

use thiserror::Error;

use placement_core::model::{AttemptError, BlueprintError, SectionType};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `BlueprintStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BlueprintStoreError {
    #[error("blueprint not found")]
    NotFound,
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for BlueprintStoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted by the session services (start, submit, complete).
///
/// Missing and already-completed attempts share one variant so callers cannot
/// tell them apart.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("blueprint is not active")]
    NotActive,
    #[error("attempt not found or already completed")]
    NotFoundOrCompleted,
    #[error("section {0} is not part of this blueprint")]
    InvalidSection(SectionType),
    #[error("blueprint referenced by the attempt is missing")]
    BlueprintMissing,
    #[error("attempt was modified concurrently")]
    Conflict,
    #[error(transparent)]
    Attempt(AttemptError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict => Self::Conflict,
            other => Self::Storage(other),
        }
    }
}

impl From<AttemptError> for SessionError {
    fn from(e: AttemptError) -> Self {
        match e {
            AttemptError::Completed => Self::NotFoundOrCompleted,
            AttemptError::InvalidSection(section) => Self::InvalidSection(section),
            other => Self::Attempt(other),
        }
    }
}

/// Errors emitted by `ResultsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultsError {
    #[error("attempt not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlacementServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
