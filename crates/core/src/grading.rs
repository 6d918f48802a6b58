//! Section grading: turn submitted answers into per-question records and a
//! section aggregate.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::model::{AnswerRecord, Section, SectionResult, SubmittedAnswer};
use crate::scoring::section_score;

/// Output of grading one section submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedSection {
    pub result: SectionResult,
    /// Records for answers that matched a question, in submission order.
    pub records: Vec<AnswerRecord>,
}

/// Grade `answers` against the question bank of `section`.
///
/// Answers whose question id is unknown to the section are dropped, as are
/// repeated answers to a question that was already graded in this submission.
/// `total_questions` is the size of the bank, not the number of answers.
/// Reported time is summed over every submitted answer.
#[must_use]
pub fn grade_section(
    section: &Section,
    answers: &[SubmittedAnswer],
    graded_at: DateTime<Utc>,
) -> GradedSection {
    let mut graded_ids = HashSet::new();
    let mut records = Vec::with_capacity(answers.len());
    let mut time_spent = 0_u64;

    for answer in answers {
        time_spent = time_spent.saturating_add(u64::from(answer.time_spent));

        let Some(question) = section.question(&answer.question_id) else {
            continue;
        };
        if !graded_ids.insert(question.id()) {
            continue;
        }

        records.push(AnswerRecord {
            section_type: section.section_type,
            question_id: question.id().to_owned(),
            user_answer: answer.answer.clone(),
            is_correct: question.grade(&answer.answer),
            time_spent: answer.time_spent,
            answered_at: graded_at,
        });
    }

    let total_questions = u32::try_from(section.question_count()).unwrap_or(u32::MAX);
    let correct_answers =
        u32::try_from(records.iter().filter(|r| r.is_correct).count()).unwrap_or(u32::MAX);
    let score = section_score(correct_answers, total_questions);

    GradedSection {
        result: SectionResult {
            section_type: section.section_type,
            total_questions,
            correct_answers,
            score,
            passed: score >= f64::from(section.passing_score),
            time_spent,
            submitted_at: graded_at,
        },
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GrammarQuestion, Question, SectionType};
    use crate::time::fixed_now;

    fn section(count: u32, passing: u8) -> Section {
        let questions = (1..=count)
            .map(|n| {
                Question::Grammar(GrammarQuestion {
                    id: format!("q{n}"),
                    question: String::new(),
                    correct_answer: format!("Answer {n}"),
                    options: Vec::new(),
                })
            })
            .collect();
        Section::new(SectionType::Grammar, questions, passing)
    }

    #[test]
    fn three_of_four_is_seventy_five_and_passes_at_threshold() {
        let s = section(4, 75);
        let answers = vec![
            SubmittedAnswer::new("q1", "answer 1", 5),
            SubmittedAnswer::new("q2", " ANSWER 2 ", 6),
            SubmittedAnswer::new("q3", "Answer 3", 7),
            SubmittedAnswer::new("q4", "wrong", 8),
        ];
        let graded = grade_section(&s, &answers, fixed_now());

        assert_eq!(graded.result.total_questions, 4);
        assert_eq!(graded.result.correct_answers, 3);
        assert_eq!(graded.result.score, 75.0);
        assert!(graded.result.passed);
        assert_eq!(graded.result.time_spent, 26);
        assert_eq!(graded.records.len(), 4);
    }

    #[test]
    fn unknown_questions_are_dropped_but_bank_size_counts() {
        let s = section(4, 50);
        let answers = vec![
            SubmittedAnswer::new("q1", "Answer 1", 0),
            SubmittedAnswer::new("zzz", "Answer 1", 0),
        ];
        let graded = grade_section(&s, &answers, fixed_now());

        assert_eq!(graded.records.len(), 1);
        assert_eq!(graded.result.total_questions, 4);
        assert_eq!(graded.result.correct_answers, 1);
        assert_eq!(graded.result.score, 25.0);
        assert!(!graded.result.passed);
    }

    #[test]
    fn repeated_answers_count_once() {
        let s = section(2, 50);
        let answers = vec![
            SubmittedAnswer::new("q1", "Answer 1", 0),
            SubmittedAnswer::new("q1", "Answer 1", 0),
            SubmittedAnswer::new("q1", "Answer 1", 0),
        ];
        let graded = grade_section(&s, &answers, fixed_now());
        assert_eq!(graded.result.correct_answers, 1);
        assert_eq!(graded.result.score, 50.0);
    }

    #[test]
    fn empty_bank_scores_zero() {
        let s = section(0, 0);
        let graded = grade_section(&s, &[SubmittedAnswer::new("q1", "x", 3)], fixed_now());
        assert_eq!(graded.result.score, 0.0);
        assert!(graded.result.passed);
        assert!(graded.records.is_empty());
    }
}
