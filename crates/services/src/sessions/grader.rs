use std::sync::Arc;

use placement_core::grading::grade_section;
use placement_core::model::{AttemptId, SectionResult, SectionType, SubmittedAnswer, UserId};
use serde::Serialize;
use storage::repository::{AttemptRepository, BlueprintRepository};
use tracing::{info, warn};

use super::queries::{load_attempt_blueprint, load_open_attempt};
use crate::Clock;
use crate::error::SessionError;

/// What a section submission produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSubmission {
    pub section_result: SectionResult,
    pub next_section: Option<SectionType>,
    pub is_last_section: bool,
}

/// Grades one section of an attempt and stores the result.
#[derive(Clone)]
pub struct SectionGrader {
    clock: Clock,
    blueprints: Arc<dyn BlueprintRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl SectionGrader {
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

    /// Grade `answers` for `section_type` and merge the result into the attempt.
    ///
    /// Resubmitting a section replaces its earlier result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFoundOrCompleted` if the attempt is missing,
    /// belongs to another user or is completed.
    /// Returns `SessionError::InvalidSection` if the blueprint has no such
    /// section; nothing is written in that case.
    /// Returns `SessionError::Conflict` if the attempt changed concurrently.
    pub async fn submit_section(
        &self,
        attempt_id: AttemptId,
        user_id: UserId,
        section_type: SectionType,
        answers: &[SubmittedAnswer],
    ) -> Result<SectionSubmission, SessionError> {
        let mut attempt = load_open_attempt(self.attempts.as_ref(), attempt_id, user_id).await?;
        let blueprint = load_attempt_blueprint(self.blueprints.as_ref(), &attempt).await?;
        let section = blueprint
            .section(section_type)
            .ok_or(SessionError::InvalidSection(section_type))?;

        let graded = grade_section(section, answers, self.clock.now());
        let section_result = graded.result.clone();
        let next_section = attempt.record_section(&blueprint, graded)?;

        match self.attempts.update_attempt(&attempt).await {
            Ok(revision) => attempt.set_revision(revision),
            Err(e) => {
                warn!(
                    attempt_id = %attempt_id,
                    section = %section_type,
                    error = %e,
                    "section write rejected"
                );
                return Err(e.into());
            }
        }

        info!(
            attempt_id = %attempt_id,
            section = %section_type,
            score = section_result.score,
            passed = section_result.passed,
            "section graded"
        );
        Ok(SectionSubmission {
            section_result,
            next_section,
            is_last_section: next_section.is_none(),
        })
    }
}
