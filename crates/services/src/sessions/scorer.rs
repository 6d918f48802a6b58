use std::sync::Arc;

use placement_core::model::{Attempt, AttemptId, UserId};
use storage::repository::{AttemptRepository, BlueprintRepository, StorageError};
use tracing::{info, warn};

use super::queries::{load_attempt_blueprint, load_open_attempt};
use crate::Clock;
use crate::error::SessionError;

/// Finalizes attempts: total score, band, level and recommendation.
#[derive(Clone)]
pub struct AggregateScorer {
    clock: Clock,
    blueprints: Arc<dyn BlueprintRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl AggregateScorer {
    #[must_use]
    pub fn new(
        clock: Clock,
        blueprints: Arc<dyn BlueprintRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            blueprints,
            attempts,
        }
    }

    /// Score and freeze the attempt. Sections never submitted simply do not
    /// contribute to the total.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFoundOrCompleted` if the attempt is missing,
    /// foreign or already completed, including when a concurrent completion
    /// wins the race.
    /// Returns `SessionError::Conflict` if a concurrent section submission won.
    pub async fn complete(
        &self,
        attempt_id: AttemptId,
        user_id: UserId,
    ) -> Result<Attempt, SessionError> {
        let mut attempt = load_open_attempt(self.attempts.as_ref(), attempt_id, user_id).await?;
        let blueprint = load_attempt_blueprint(self.blueprints.as_ref(), &attempt).await?;

        attempt.complete(&blueprint, self.clock.now())?;

        match self.attempts.update_attempt(&attempt).await {
            Ok(revision) => attempt.set_revision(revision),
            Err(StorageError::Conflict) => {
                let completed_elsewhere = self
                    .attempts
                    .get_attempt(attempt_id)
                    .await?
                    .is_none_or(|stored| stored.is_completed());
                warn!(attempt_id = %attempt_id, completed_elsewhere, "completion write rejected");
                return Err(if completed_elsewhere {
                    SessionError::NotFoundOrCompleted
                } else {
                    SessionError::Conflict
                });
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(outcome) = attempt.outcome() {
            info!(
                attempt_id = %attempt_id,
                total_score = outcome.total_score,
                band = outcome.band,
                level = %outcome.level,
                "attempt completed"
            );
        }
        Ok(attempt)
    }
}
