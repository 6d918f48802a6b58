use placement_core::model::{Attempt, AttemptId, Blueprint, UserId};
use storage::repository::{AttemptRepository, BlueprintRepository};
use tracing::warn;

use crate::error::SessionError;

/// Load an attempt the user may still write to.
///
/// Missing, foreign and completed attempts all map to
/// `SessionError::NotFoundOrCompleted`.
pub(crate) async fn load_open_attempt(
    attempts: &dyn AttemptRepository,
    attempt_id: AttemptId,
    user_id: UserId,
) -> Result<Attempt, SessionError> {
    match attempts.get_attempt(attempt_id).await? {
        Some(attempt) if attempt.is_owned_by(user_id) && !attempt.is_completed() => Ok(attempt),
        _ => Err(SessionError::NotFoundOrCompleted),
    }
}

/// Load the blueprint an attempt was started against.
pub(crate) async fn load_attempt_blueprint(
    blueprints: &dyn BlueprintRepository,
    attempt: &Attempt,
) -> Result<Blueprint, SessionError> {
    let blueprint = blueprints
        .get_blueprint(attempt.blueprint_id())
        .await?
        .ok_or(SessionError::BlueprintMissing)?;

    if blueprint.version() != attempt.blueprint_version() {
        warn!(
            attempt_id = %attempt.id(),
            blueprint_id = %blueprint.id(),
            captured = attempt.blueprint_version(),
            current = blueprint.version(),
            "blueprint version changed since the attempt started"
        );
    }
    Ok(blueprint)
}
