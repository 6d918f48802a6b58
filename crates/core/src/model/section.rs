use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::question::Question;

//
// ─── SECTION TYPE ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown section type: {0}")]
pub struct SectionTypeError(pub String);

/// The closed set of section kinds a blueprint can contain.
///
/// Declaration order is the canonical order used to advance an attempt from
/// one section to the next, independent of how a blueprint lists its sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Pronunciation,
    Grammar,
    Vocabulary,
    Listening,
    Reading,
}

impl SectionType {
    /// All section types in canonical order.
    pub const CANONICAL_ORDER: [SectionType; 5] = [
        SectionType::Pronunciation,
        SectionType::Grammar,
        SectionType::Vocabulary,
        SectionType::Listening,
        SectionType::Reading,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Pronunciation => "pronunciation",
            SectionType::Grammar => "grammar",
            SectionType::Vocabulary => "vocabulary",
            SectionType::Listening => "listening",
            SectionType::Reading => "reading",
        }
    }

    /// Position of this type in the canonical order.
    #[must_use]
    pub fn canonical_index(self) -> usize {
        match self {
            SectionType::Pronunciation => 0,
            SectionType::Grammar => 1,
            SectionType::Vocabulary => 2,
            SectionType::Listening => 3,
            SectionType::Reading => 4,
        }
    }

    /// Section types that follow this one in canonical order.
    pub fn following(self) -> impl Iterator<Item = SectionType> {
        Self::CANONICAL_ORDER
            .into_iter()
            .skip(self.canonical_index() + 1)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = SectionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pronunciation" => Ok(SectionType::Pronunciation),
            "grammar" => Ok(SectionType::Grammar),
            "vocabulary" => Ok(SectionType::Vocabulary),
            "listening" => Ok(SectionType::Listening),
            "reading" => Ok(SectionType::Reading),
            _ => Err(SectionTypeError(s.to_owned())),
        }
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// A typed group of questions with its own passing threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub questions: Vec<Question>,
    /// Minimum score (0-100) required to pass this section.
    pub passing_score: u8,
    /// Time limit in seconds, advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
}

impl Section {
    #[must_use]
    pub fn new(section_type: SectionType, questions: Vec<Question>, passing_score: u8) -> Self {
        Self {
            section_type,
            questions,
            passing_score,
            time_limit: None,
        }
    }

    #[must_use]
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit = Some(secs);
        self
    }

    #[must_use]
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
