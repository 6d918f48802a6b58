use std::sync::Arc;

use placement_core::model::{Attempt, BlueprintId, NewAttempt, UserId};
use storage::repository::{AttemptRepository, BlueprintRepository, OpenedAttempt};
use tracing::info;

use crate::Clock;
use crate::error::SessionError;

/// Outcome of `SessionManager::start`.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedAttempt {
    pub attempt: Attempt,
    /// `false` when an unfinished attempt was resumed.
    pub created: bool,
}

impl From<OpenedAttempt> for StartedAttempt {
    fn from(opened: OpenedAttempt) -> Self {
        Self {
            attempt: opened.attempt,
            created: opened.created,
        }
    }
}

/// Creates attempts, or hands back the one a user left unfinished.
#[derive(Clone)]
pub struct SessionManager {
    clock: Clock,
    blueprints: Arc<dyn BlueprintRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl SessionManager {
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

    /// Start (or resume) the user's attempt on an active blueprint.
    ///
    /// Calling this again before completion returns the same attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` if the blueprint is missing or inactive.
    /// Returns `SessionError::Storage` if repository access fails.
    pub async fn start(
        &self,
        user_id: UserId,
        blueprint_id: BlueprintId,
    ) -> Result<StartedAttempt, SessionError> {
        let blueprint = match self.blueprints.get_blueprint(blueprint_id).await? {
            Some(bp) if bp.is_active() => bp,
            _ => return Err(SessionError::NotActive),
        };

        let new = NewAttempt::begin(user_id, &blueprint, self.clock.now())?;
        let started = StartedAttempt::from(self.attempts.open_or_create_attempt(new).await?);

        info!(
            attempt_id = %started.attempt.id(),
            user_id = %user_id,
            blueprint_id = %blueprint_id,
            created = started.created,
            "attempt started"
        );
        Ok(started)
    }
}
