use std::sync::Arc;

use placement_core::model::{Attempt, AttemptId, UserId};
use storage::repository::{AttemptRepository, Page, PageRequest};

use crate::error::ResultsError;

/// Who is asking to read attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    /// Privileged viewers may read every user's attempts.
    pub privileged: bool,
}

/// Read-only access to attempts and their outcomes.
#[derive(Clone)]
pub struct ResultsService {
    attempts: Arc<dyn AttemptRepository>,
}

impl ResultsService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// The user's own attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::Storage` if repository access fails.
    pub async fn my_results(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Attempt>, ResultsError> {
        Ok(self.attempts.list_attempts_for_user(user_id, page).await?)
    }

    /// Attempts across all users, newest first. Callers check privilege.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::Storage` if repository access fails.
    pub async fn all_results(&self, page: PageRequest) -> Result<Page<Attempt>, ResultsError> {
        Ok(self.attempts.list_attempts(page).await?)
    }

    /// One attempt, visible to its owner and to privileged viewers.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::NotFound` if the attempt does not exist or the
    /// viewer may not see it.
    /// Returns `ResultsError::Storage` if repository access fails.
    pub async fn attempt_for(
        &self,
        viewer: Viewer,
        attempt_id: AttemptId,
    ) -> Result<Attempt, ResultsError> {
        match self.attempts.get_attempt(attempt_id).await? {
            Some(attempt) if viewer.privileged || attempt.is_owned_by(viewer.user_id) => {
                Ok(attempt)
            }
            _ => Err(ResultsError::NotFound),
        }
    }
}
