//! Request and response bodies. All JSON is camelCase.

use chrono::{DateTime, Utc};
use placement_core::model::{
    AnswerRecord, Attempt, AttemptId, Blueprint, BlueprintId, Question, Section, SectionResult,
    SectionType, SubmittedAnswer, UserId,
};
use serde::{Deserialize, Deserializer, Serialize, de};
use storage::repository::{MAX_PAGE_LIMIT, PageRequest};

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub blueprint_id: BlueprintId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSectionRequest {
    pub attempt_id: AttemptId,
    #[serde(deserialize_with = "section_type_loose")]
    pub section_type: SectionType,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

/// Accept section names in any case, e.g. `"Grammar"`.
fn section_type_loose<'de, D>(deserializer: D) -> Result<SectionType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub attempt_id: AttemptId,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        PageRequest::new(q.page, q.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Requested limit clamped to `1..=MAX_PAGE_LIMIT`; the maximum when unset.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(MAX_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub id: AttemptId,
    pub user_id: UserId,
    pub blueprint_id: BlueprintId,
    pub blueprint_version: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub current_section: Option<SectionType>,
    pub answers: Vec<AnswerRecord>,
    pub section_results: Vec<SectionResult>,
    pub total_score: Option<f64>,
    pub band: Option<u8>,
    pub level: Option<String>,
    pub recommendation: Option<String>,
}

impl From<Attempt> for AttemptResponse {
    fn from(a: Attempt) -> Self {
        let outcome = a.outcome().cloned();
        Self {
            id: a.id(),
            user_id: a.user_id(),
            blueprint_id: a.blueprint_id(),
            blueprint_version: a.blueprint_version().to_owned(),
            started_at: a.started_at(),
            completed_at: a.completed_at(),
            is_completed: a.is_completed(),
            current_section: a.current_section(),
            answers: a.answers().to_vec(),
            section_results: a.section_results().to_vec(),
            total_score: outcome.as_ref().map(|o| o.total_score),
            band: outcome.as_ref().map(|o| o.band),
            level: outcome.as_ref().map(|o| o.level.clone()),
            recommendation: outcome.map(|o| o.recommendation),
        }
    }
}

//
// ─── BLUEPRINTS ────────────────────────────────────────────────────────────────
//

/// A question as shown to a test taker: no correct answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        let mut view = Self {
            id: q.id().to_owned(),
            section_type: q.section_type(),
            prompt: q.prompt().to_owned(),
            options: q.options().to_vec(),
            phonetic: None,
            word: None,
            audio_url: None,
            passage: None,
        };
        match q {
            Question::Pronunciation(p) => view.phonetic.clone_from(&p.phonetic),
            Question::Vocabulary(v) => view.word.clone_from(&v.word),
            Question::Listening(l) => view.audio_url = Some(l.audio_url.clone()),
            Question::Reading(r) => view.passage = Some(r.passage.clone()),
            Question::Grammar(_) => {}
        }
        view
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub passing_score: u8,
    pub time_limit: Option<u32>,
    pub questions: Vec<QuestionView>,
}

impl From<&Section> for SectionView {
    fn from(s: &Section) -> Self {
        Self {
            section_type: s.section_type,
            passing_score: s.passing_score,
            time_limit: s.time_limit,
            questions: s.questions.iter().map(QuestionView::from).collect(),
        }
    }
}

/// The active blueprint, safe to hand to a test taker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBlueprintView {
    pub id: BlueprintId,
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    pub sections: Vec<SectionView>,
}

impl From<&Blueprint> for ActiveBlueprintView {
    fn from(bp: &Blueprint) -> Self {
        let mut sections: Vec<SectionView> = bp.sections().iter().map(SectionView::from).collect();
        sections.sort_by_key(|s| s.section_type.canonical_index());
        Self {
            id: bp.id(),
            title: bp.title().to_owned(),
            description: bp.description().map(str::to_owned),
            version: bp.version().to_owned(),
            sections,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintSummary {
    pub id: BlueprintId,
    pub title: String,
    pub version: String,
    pub is_active: bool,
    pub section_types: Vec<SectionType>,
    pub created_at: DateTime<Utc>,
}

impl From<&Blueprint> for BlueprintSummary {
    fn from(bp: &Blueprint) -> Self {
        Self {
            id: bp.id(),
            title: bp.title().to_owned(),
            version: bp.version().to_owned(),
            is_active: bp.is_active(),
            section_types: bp.sections().iter().map(|s| s.section_type).collect(),
            created_at: bp.created_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement_core::model::{BlueprintDraft, ListeningQuestion};
    use placement_core::time::fixed_now;

    #[test]
    fn active_view_withholds_answers() {
        let bp = Blueprint::new(
            BlueprintId::new(1),
            BlueprintDraft {
                title: "Placement".into(),
                description: None,
                version: "1".into(),
                sections: vec![Section::new(
                    SectionType::Listening,
                    vec![Question::Listening(ListeningQuestion {
                        id: "l1".into(),
                        audio_url: "https://cdn.test/a.mp3".into(),
                        question: "What did you hear?".into(),
                        correct_answer: "secret".into(),
                        options: vec!["secret".into(), "public".into()],
                    })],
                    50,
                )],
                band_scores: Vec::new(),
            },
            true,
            fixed_now(),
        )
        .unwrap();

        let json = serde_json::to_value(ActiveBlueprintView::from(&bp)).unwrap();
        let question = &json["sections"][0]["questions"][0];
        assert_eq!(question["audioUrl"], "https://cdn.test/a.mp3");
        assert_eq!(question["type"], "listening");
        assert!(question.get("correctAnswer").is_none());
    }

    #[test]
    fn section_type_parses_case_insensitively() {
        let req: SubmitSectionRequest =
            serde_json::from_str(r#"{"attemptId": 3, "sectionType": " Grammar "}"#).unwrap();
        assert_eq!(req.section_type, SectionType::Grammar);
        assert!(req.answers.is_empty());

        let err = serde_json::from_str::<SubmitSectionRequest>(
            r#"{"attemptId": 3, "sectionType": "writing"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown section type: writing"));
    }

    #[test]
    fn list_limit_is_clamped() {
        assert_eq!(ListQuery::default().limit(), MAX_PAGE_LIMIT);
        assert_eq!(ListQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(ListQuery { limit: Some(5000) }.limit(), MAX_PAGE_LIMIT);
    }
}
