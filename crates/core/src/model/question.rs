use serde::{Deserialize, Serialize};

use crate::model::section::SectionType;

//
// ─── GRADING CONTRACT ──────────────────────────────────────────────────────────
//

/// Compare a submitted answer with the expected one.
///
/// Matching is exact after trimming surrounding whitespace and ignoring case.
#[must_use]
pub fn answers_match(expected: &str, submitted: &str) -> bool {
    expected.trim().to_lowercase() == submitted.trim().to_lowercase()
}

/// Shared grading contract implemented by every question variant.
pub trait Gradable {
    fn expected_answer(&self) -> &str;

    fn is_correct(&self, submitted: &str) -> bool {
        answers_match(self.expected_answer(), submitted)
    }
}

//
// ─── VARIANTS ──────────────────────────────────────────────────────────────────
//

/// Read a word or sentence aloud; the recognised transcript is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationQuestion {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarQuestion {
    pub id: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyQuestion {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    pub question: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningQuestion {
    pub id: String,
    pub audio_url: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingQuestion {
    pub id: String,
    pub passage: String,
    pub question: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Gradable for PronunciationQuestion {
    fn expected_answer(&self) -> &str {
        &self.correct_answer
    }
}

impl Gradable for GrammarQuestion {
    fn expected_answer(&self) -> &str {
        &self.correct_answer
    }
}

impl Gradable for VocabularyQuestion {
    fn expected_answer(&self) -> &str {
        &self.correct_answer
    }
}

impl Gradable for ListeningQuestion {
    fn expected_answer(&self) -> &str {
        &self.correct_answer
    }
}

impl Gradable for ReadingQuestion {
    fn expected_answer(&self) -> &str {
        &self.correct_answer
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A question, tagged by the section type it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Question {
    Pronunciation(PronunciationQuestion),
    Grammar(GrammarQuestion),
    Vocabulary(VocabularyQuestion),
    Listening(ListeningQuestion),
    Reading(ReadingQuestion),
}

impl Question {
    #[must_use]
    pub fn section_type(&self) -> SectionType {
        match self {
            Question::Pronunciation(_) => SectionType::Pronunciation,
            Question::Grammar(_) => SectionType::Grammar,
            Question::Vocabulary(_) => SectionType::Vocabulary,
            Question::Listening(_) => SectionType::Listening,
            Question::Reading(_) => SectionType::Reading,
        }
    }

    fn gradable(&self) -> &dyn Gradable {
        match self {
            Question::Pronunciation(q) => q,
            Question::Grammar(q) => q,
            Question::Vocabulary(q) => q,
            Question::Listening(q) => q,
            Question::Reading(q) => q,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Question::Pronunciation(q) => &q.id,
            Question::Grammar(q) => &q.id,
            Question::Vocabulary(q) => &q.id,
            Question::Listening(q) => &q.id,
            Question::Reading(q) => &q.id,
        }
    }

    /// The text shown to the test taker.
    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Question::Pronunciation(q) => &q.text,
            Question::Grammar(q) => &q.question,
            Question::Vocabulary(q) => &q.question,
            Question::Listening(q) => &q.question,
            Question::Reading(q) => &q.question,
        }
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        match self {
            Question::Pronunciation(q) => &q.options,
            Question::Grammar(q) => &q.options,
            Question::Vocabulary(q) => &q.options,
            Question::Listening(q) => &q.options,
            Question::Reading(q) => &q.options,
        }
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        self.gradable().expected_answer()
    }

    /// Grade a submitted answer against this question.
    #[must_use]
    pub fn grade(&self, submitted: &str) -> bool {
        self.gradable().is_correct(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar(id: &str, answer: &str) -> Question {
        Question::Grammar(GrammarQuestion {
            id: id.into(),
            question: "She ___ to school.".into(),
            correct_answer: answer.into(),
            options: vec!["go".into(), "goes".into()],
        })
    }

    #[test]
    fn matching_ignores_case_and_surrounding_whitespace() {
        let q = grammar("g1", "Goes");
        assert!(q.grade("goes"));
        assert!(q.grade("  GOES\n"));
        assert!(!q.grade("go"));
        assert!(!q.grade("go es"));
    }

    #[test]
    fn deserializes_by_type_tag() {
        let json = r#"{
            "type": "listening",
            "id": "l1",
            "audioUrl": "https://cdn.example/a.mp3",
            "question": "What did he buy?",
            "correctAnswer": "bread"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.section_type(), SectionType::Listening);
        assert_eq!(q.id(), "l1");
        assert!(q.options().is_empty());
        assert!(q.grade("Bread"));
    }

    #[test]
    fn prompt_uses_text_for_pronunciation() {
        let q = Question::Pronunciation(PronunciationQuestion {
            id: "p1".into(),
            text: "thorough".into(),
            phonetic: Some("/ˈθʌr.ə/".into()),
            correct_answer: "thorough".into(),
            options: Vec::new(),
        });
        assert_eq!(q.prompt(), "thorough");
        assert_eq!(q.correct_answer(), "thorough");
    }
}
