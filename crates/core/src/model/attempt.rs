use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::grading::GradedSection;
use crate::model::blueprint::{BandScore, Blueprint};
use crate::model::ids::{AttemptId, BlueprintId, UserId};
use crate::model::section::SectionType;
use crate::scoring::{resolve_band, total_score};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt is already completed")]
    Completed,

    #[error("section {0} is not part of this blueprint")]
    InvalidSection(SectionType),

    #[error("attempt belongs to blueprint {expected}, not {found}")]
    BlueprintMismatch {
        expected: BlueprintId,
        found: BlueprintId,
    },

    #[error("blueprint has no sections to start from")]
    NoSections,

    #[error("invalid persisted attempt: {0}")]
    InvalidPersistedState(String),
}

//
// ─── ANSWERS & RESULTS ─────────────────────────────────────────────────────────
//

/// One answer as submitted by the test taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub answer: String,
    /// Seconds the caller reports spending on this question. Not verified.
    #[serde(default)]
    pub time_spent: u32,
}

impl SubmittedAnswer {
    #[must_use]
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>, time_spent: u32) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            time_spent,
        }
    }
}

/// Grading record for a single answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub section_type: SectionType,
    pub question_id: String,
    pub user_answer: String,
    pub is_correct: bool,
    pub time_spent: u32,
    pub answered_at: DateTime<Utc>,
}

/// Aggregate result for one section of an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub section_type: SectionType,
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Percentage score, 0-100.
    pub score: f64,
    pub passed: bool,
    /// Sum of reported per-answer seconds.
    pub time_spent: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Values derived once, when the attempt is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub total_score: f64,
    pub band: u8,
    pub level: String,
    pub recommendation: String,
}

impl AttemptOutcome {
    /// Score a set of section results against a band table.
    #[must_use]
    pub fn from_results(results: &[SectionResult], band_scores: &[BandScore]) -> Self {
        let total = total_score(results);
        let band = resolve_band(band_scores, total);
        Self {
            total_score: total,
            band: band.band,
            level: band.level,
            recommendation: band.recommendation,
        }
    }
}

//
// ─── NEW ATTEMPT ───────────────────────────────────────────────────────────────
//

/// An attempt that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttempt {
    pub user_id: UserId,
    pub blueprint_id: BlueprintId,
    pub blueprint_version: String,
    pub started_at: DateTime<Utc>,
    pub current_section: SectionType,
}

impl NewAttempt {
    /// Prepare a fresh attempt positioned at the blueprint's first section.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NoSections` if the blueprint defines no sections.
    pub fn begin(
        user_id: UserId,
        blueprint: &Blueprint,
        started_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        let current_section = blueprint.first_section().ok_or(AttemptError::NoSections)?;
        Ok(Self {
            user_id,
            blueprint_id: blueprint.id(),
            blueprint_version: blueprint.version().to_owned(),
            started_at,
            current_section,
        })
    }

    /// Attach the storage-assigned identity.
    #[must_use]
    pub fn into_attempt(self, id: AttemptId) -> Attempt {
        Attempt {
            id,
            user_id: self.user_id,
            blueprint_id: self.blueprint_id,
            blueprint_version: self.blueprint_version,
            started_at: self.started_at,
            completed_at: None,
            current_section: Some(self.current_section),
            answers: Vec::new(),
            section_results: Vec::new(),
            outcome: None,
            revision: 0,
        }
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// One user's run through a blueprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    id: AttemptId,
    user_id: UserId,
    blueprint_id: BlueprintId,
    blueprint_version: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    current_section: Option<SectionType>,
    answers: Vec<AnswerRecord>,
    section_results: Vec<SectionResult>,
    outcome: Option<AttemptOutcome>,
    revision: u64,
}

impl Attempt {
    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidPersistedState` if completion fields are
    /// inconsistent or section results repeat a section type.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: AttemptId,
        user_id: UserId,
        blueprint_id: BlueprintId,
        blueprint_version: String,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        current_section: Option<SectionType>,
        answers: Vec<AnswerRecord>,
        section_results: Vec<SectionResult>,
        outcome: Option<AttemptOutcome>,
        revision: u64,
    ) -> Result<Self, AttemptError> {
        if let Some(done) = completed_at {
            if done < started_at {
                return Err(AttemptError::InvalidPersistedState(
                    "completed_at is before started_at".into(),
                ));
            }
        }
        if completed_at.is_some() != outcome.is_some() {
            return Err(AttemptError::InvalidPersistedState(
                "outcome must be present exactly when completed".into(),
            ));
        }
        let mut seen = HashSet::new();
        if !section_results.iter().all(|r| seen.insert(r.section_type)) {
            return Err(AttemptError::InvalidPersistedState(
                "duplicate section result".into(),
            ));
        }

        Ok(Self {
            id,
            user_id,
            blueprint_id,
            blueprint_version,
            started_at,
            completed_at,
            current_section,
            answers,
            section_results,
            outcome,
            revision,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn blueprint_id(&self) -> BlueprintId {
        self.blueprint_id
    }

    #[must_use]
    pub fn blueprint_version(&self) -> &str {
        &self.blueprint_version
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn current_section(&self) -> Option<SectionType> {
        self.current_section
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn section_results(&self) -> &[SectionResult] {
        &self.section_results
    }

    #[must_use]
    pub fn section_result(&self, section_type: SectionType) -> Option<&SectionResult> {
        self.section_results
            .iter()
            .find(|r| r.section_type == section_type)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&AttemptOutcome> {
        self.outcome.as_ref()
    }

    /// Storage revision used for conditional writes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record the revision storage assigned after a successful write.
    pub fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    fn ensure_open(&self, blueprint: &Blueprint) -> Result<(), AttemptError> {
        if self.is_completed() {
            return Err(AttemptError::Completed);
        }
        if blueprint.id() != self.blueprint_id {
            return Err(AttemptError::BlueprintMismatch {
                expected: self.blueprint_id,
                found: blueprint.id(),
            });
        }
        Ok(())
    }

    /// Merge a graded section into the attempt and advance the progress pointer.
    ///
    /// Any earlier result for the same section is replaced. Returns the next
    /// section in canonical order, or `None` when this was the last one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` for finished attempts and
    /// `AttemptError::InvalidSection` when the blueprint lacks the section.
    /// The attempt is left untouched on error.
    pub fn record_section(
        &mut self,
        blueprint: &Blueprint,
        graded: GradedSection,
    ) -> Result<Option<SectionType>, AttemptError> {
        self.ensure_open(blueprint)?;
        let section_type = graded.result.section_type;
        if !blueprint.has_section(section_type) {
            return Err(AttemptError::InvalidSection(section_type));
        }

        self.section_results
            .retain(|r| r.section_type != section_type);
        self.section_results.push(graded.result);
        self.answers.extend(graded.records);
        self.current_section = blueprint.next_section_after(section_type);

        Ok(self.current_section)
    }

    /// Compute the final score and band, then freeze the attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` if the attempt was already completed;
    /// state is not modified in that case.
    pub fn complete(
        &mut self,
        blueprint: &Blueprint,
        completed_at: DateTime<Utc>,
    ) -> Result<&AttemptOutcome, AttemptError> {
        self.ensure_open(blueprint)?;
        let outcome = AttemptOutcome::from_results(&self.section_results, blueprint.band_scores());

        self.completed_at = Some(completed_at.max(self.started_at));
        self.current_section = None;
        Ok(self.outcome.insert(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::grade_section;
    use crate::model::blueprint::BlueprintDraft;
    use crate::model::question::{GrammarQuestion, Question, VocabularyQuestion};
    use crate::model::section::Section;
    use crate::time::fixed_now;

    fn grammar_section(passing: u8) -> Section {
        let questions = (1..=4)
            .map(|n| {
                Question::Grammar(GrammarQuestion {
                    id: format!("g{n}"),
                    question: format!("Question {n}"),
                    correct_answer: format!("a{n}"),
                    options: Vec::new(),
                })
            })
            .collect();
        Section::new(SectionType::Grammar, questions, passing)
    }

    fn vocabulary_section() -> Section {
        let questions = vec![Question::Vocabulary(VocabularyQuestion {
            id: "v1".into(),
            word: Some("swift".into()),
            question: "Synonym of fast?".into(),
            correct_answer: "quick".into(),
            options: Vec::new(),
        })];
        Section::new(SectionType::Vocabulary, questions, 50)
    }

    fn blueprint(sections: Vec<Section>, bands: Vec<BandScore>) -> Blueprint {
        Blueprint::new(
            BlueprintId::new(1),
            BlueprintDraft {
                title: "Placement".into(),
                description: None,
                version: "1.0.0".into(),
                sections,
                band_scores: bands,
            },
            true,
            fixed_now(),
        )
        .unwrap()
    }

    fn start(bp: &Blueprint) -> Attempt {
        NewAttempt::begin(UserId::new(7), bp, fixed_now())
            .unwrap()
            .into_attempt(AttemptId::new(1))
    }

    fn answers(correct: &[u32], wrong: &[u32]) -> Vec<SubmittedAnswer> {
        correct
            .iter()
            .map(|n| SubmittedAnswer::new(format!("g{n}"), format!("a{n}"), 10))
            .chain(
                wrong
                    .iter()
                    .map(|n| SubmittedAnswer::new(format!("g{n}"), "nope", 10)),
            )
            .collect()
    }

    #[test]
    fn new_attempt_snapshots_version_and_first_section() {
        let bp = blueprint(vec![vocabulary_section(), grammar_section(75)], Vec::new());
        let attempt = start(&bp);
        assert_eq!(attempt.blueprint_version(), "1.0.0");
        assert_eq!(attempt.current_section(), Some(SectionType::Grammar));
        assert!(attempt.section_results().is_empty());
        assert!(!attempt.is_completed());
    }

    #[test]
    fn single_section_scenario_scores_and_completes() {
        let bp = blueprint(vec![grammar_section(75)], Vec::new());
        let section = bp.section(SectionType::Grammar).unwrap().clone();
        let mut attempt = start(&bp);

        let graded = grade_section(&section, &answers(&[1, 2, 3], &[4]), fixed_now());
        let next = attempt.record_section(&bp, graded).unwrap();

        assert_eq!(next, None);
        let result = attempt.section_result(SectionType::Grammar).unwrap();
        assert_eq!(result.score, 75.0);
        assert!(result.passed);

        let outcome = attempt.complete(&bp, fixed_now()).unwrap();
        assert_eq!(outcome.total_score, 75.0);
        assert!(attempt.is_completed());
        assert_eq!(attempt.current_section(), None);
    }

    #[test]
    fn resubmission_replaces_previous_result() {
        let bp = blueprint(vec![grammar_section(75), vocabulary_section()], Vec::new());
        let section = bp.section(SectionType::Grammar).unwrap().clone();
        let mut attempt = start(&bp);

        let first = grade_section(&section, &answers(&[1], &[2, 3, 4]), fixed_now());
        assert_eq!(
            attempt.record_section(&bp, first).unwrap(),
            Some(SectionType::Vocabulary)
        );
        let second = grade_section(&section, &answers(&[1, 2, 3, 4], &[]), fixed_now());
        attempt.record_section(&bp, second).unwrap();

        assert_eq!(attempt.section_results().len(), 1);
        assert_eq!(attempt.section_results()[0].score, 100.0);
        assert_eq!(attempt.answers().len(), 8);
    }

    #[test]
    fn unknown_section_leaves_attempt_untouched() {
        let bp = blueprint(vec![grammar_section(75)], Vec::new());
        let mut attempt = start(&bp);
        let before = attempt.clone();

        let graded = grade_section(&vocabulary_section(), &[], fixed_now());
        let err = attempt.record_section(&bp, graded).unwrap_err();

        assert_eq!(err, AttemptError::InvalidSection(SectionType::Vocabulary));
        assert_eq!(attempt, before);
    }

    #[test]
    fn completing_twice_is_rejected_without_mutation() {
        let bands = vec![
            BandScore::new(1, 0.0, 49.0, "Beginner - start here"),
            BandScore::new(2, 50.0, 100.0, "Intermediate - keep going"),
        ];
        let bp = blueprint(vec![grammar_section(75)], bands);
        let section = bp.section(SectionType::Grammar).unwrap().clone();
        let mut attempt = start(&bp);
        let graded = grade_section(&section, &answers(&[1, 2, 3], &[4]), fixed_now());
        attempt.record_section(&bp, graded).unwrap();

        let outcome = attempt.complete(&bp, fixed_now()).unwrap().clone();
        assert_eq!(outcome.band, 2);
        assert_eq!(outcome.level, "Intermediate");
        assert_eq!(outcome.recommendation, "Intermediate - keep going");

        let frozen = attempt.clone();
        let later = fixed_now() + chrono::Duration::hours(1);
        assert_eq!(
            attempt.complete(&bp, later).unwrap_err(),
            AttemptError::Completed
        );
        assert_eq!(attempt, frozen);

        let again = grade_section(&section, &[], later);
        assert_eq!(
            attempt.record_section(&bp, again).unwrap_err(),
            AttemptError::Completed
        );
    }

    #[test]
    fn completing_with_no_results_scores_zero() {
        let bp = blueprint(vec![grammar_section(75)], Vec::new());
        let mut attempt = start(&bp);
        let outcome = attempt.complete(&bp, fixed_now()).unwrap();
        assert_eq!(outcome.total_score, 0.0);
        assert_eq!(outcome.band, 1);
        assert_eq!(outcome.level, "Beginner");
    }

    #[test]
    fn rejects_inconsistent_persisted_state() {
        let err = Attempt::from_persisted(
            AttemptId::new(1),
            UserId::new(1),
            BlueprintId::new(1),
            "1.0.0".into(),
            fixed_now(),
            Some(fixed_now()),
            None,
            Vec::new(),
            Vec::new(),
            None,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, AttemptError::InvalidPersistedState(_)));
    }
}
