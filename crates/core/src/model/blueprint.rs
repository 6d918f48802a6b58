use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::BlueprintId;
use crate::model::section::{Section, SectionType};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum BlueprintError {
    #[error("blueprint title cannot be empty")]
    EmptyTitle,

    #[error("blueprint version cannot be empty")]
    EmptyVersion,

    #[error("blueprint must contain at least one section")]
    NoSections,

    #[error("section {0} appears more than once")]
    DuplicateSection(SectionType),

    #[error("passing score for {section} must be between 0 and 100, got {score}")]
    InvalidPassingScore { section: SectionType, score: u8 },

    #[error("question {question_id} in {section} section has type {found}")]
    MismatchedQuestion {
        section: SectionType,
        question_id: String,
        found: SectionType,
    },

    #[error("question id {question_id} is repeated in {section} section")]
    DuplicateQuestion {
        section: SectionType,
        question_id: String,
    },

    #[error("band {band} has min score {min} above max score {max}")]
    InvalidBandRange { band: u8, min: f64, max: f64 },
}

//
// ─── BAND TABLE ────────────────────────────────────────────────────────────────
//

/// One row of the band lookup table. Bounds are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandScore {
    pub band: u8,
    pub min_score: f64,
    pub max_score: f64,
    pub description: String,
    /// Explicit level label. When absent the level is parsed out of `description`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl BandScore {
    #[must_use]
    pub fn new(band: u8, min_score: f64, max_score: f64, description: impl Into<String>) -> Self {
        Self {
            band,
            min_score,
            max_score,
            description: description.into(),
            level: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min_score && score <= self.max_score
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Authoring payload for a blueprint, before it has an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub band_scores: Vec<BandScore>,
}

impl BlueprintDraft {
    /// Check the structural rules every stored blueprint must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first `BlueprintError` found.
    pub fn validate(&self) -> Result<(), BlueprintError> {
        if self.title.trim().is_empty() {
            return Err(BlueprintError::EmptyTitle);
        }
        if self.version.trim().is_empty() {
            return Err(BlueprintError::EmptyVersion);
        }
        if self.sections.is_empty() {
            return Err(BlueprintError::NoSections);
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.section_type) {
                return Err(BlueprintError::DuplicateSection(section.section_type));
            }
            if section.passing_score > 100 {
                return Err(BlueprintError::InvalidPassingScore {
                    section: section.section_type,
                    score: section.passing_score,
                });
            }
            let mut ids = HashSet::new();
            for question in &section.questions {
                if question.section_type() != section.section_type {
                    return Err(BlueprintError::MismatchedQuestion {
                        section: section.section_type,
                        question_id: question.id().to_owned(),
                        found: question.section_type(),
                    });
                }
                if !ids.insert(question.id()) {
                    return Err(BlueprintError::DuplicateQuestion {
                        section: section.section_type,
                        question_id: question.id().to_owned(),
                    });
                }
            }
        }

        for band in &self.band_scores {
            if band.min_score > band.max_score {
                return Err(BlueprintError::InvalidBandRange {
                    band: band.band,
                    min: band.min_score,
                    max: band.max_score,
                });
            }
        }

        Ok(())
    }
}

//
// ─── BLUEPRINT ─────────────────────────────────────────────────────────────────
//

/// A versioned test definition. Read-only for the session engine.
///
/// Not serializable: it carries correct answers. API views project it.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    id: BlueprintId,
    title: String,
    description: Option<String>,
    version: String,
    is_active: bool,
    sections: Vec<Section>,
    band_scores: Vec<BandScore>,
    created_at: DateTime<Utc>,
}

impl Blueprint {
    /// Build a blueprint from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `BlueprintError` if the draft violates structural rules.
    pub fn new(
        id: BlueprintId,
        draft: BlueprintDraft,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, BlueprintError> {
        draft.validate()?;
        let BlueprintDraft {
            title,
            description,
            version,
            sections,
            band_scores,
        } = draft;

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description: description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
            version: version.trim().to_owned(),
            is_active,
            sections,
            band_scores,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> BlueprintId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn band_scores(&self) -> &[BandScore] {
        &self.band_scores
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn section(&self, section_type: SectionType) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.section_type == section_type)
    }

    #[must_use]
    pub fn has_section(&self, section_type: SectionType) -> bool {
        self.section(section_type).is_some()
    }

    /// First section an attempt should take, in canonical order.
    #[must_use]
    pub fn first_section(&self) -> Option<SectionType> {
        SectionType::CANONICAL_ORDER
            .into_iter()
            .find(|ty| self.has_section(*ty))
    }

    /// The section that follows `current` in canonical order, skipping types
    /// this blueprint does not define. `None` once `current` is the last one.
    #[must_use]
    pub fn next_section_after(&self, current: SectionType) -> Option<SectionType> {
        current.following().find(|ty| self.has_section(*ty))
    }

    /// Rebuild the draft this blueprint was created from.
    #[must_use]
    pub fn to_draft(&self) -> BlueprintDraft {
        BlueprintDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            sections: self.sections.clone(),
            band_scores: self.band_scores.clone(),
        }
    }
}
