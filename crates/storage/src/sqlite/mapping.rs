use chrono::{DateTime, Utc};
use placement_core::model::{
    AnswerRecord, Attempt, AttemptId, AttemptOutcome, BandScore, Blueprint, BlueprintDraft,
    BlueprintId, Section, SectionResult, SectionType, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) const BLUEPRINT_COLUMNS: &str =
    "id, title, description, version, is_active, sections_json, band_scores_json, created_at";

pub(crate) const ATTEMPT_COLUMNS: &str = "id, user_id, blueprint_id, blueprint_version, \
     started_at, completed_at, current_section, answers_json, section_results_json, \
     total_score, band, level, recommendation, revision";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn blueprint_id_from_i64(v: i64) -> Result<BlueprintId, StorageError> {
    Ok(BlueprintId::new(i64_to_u64("blueprint_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn blueprint_from_row(row: &SqliteRow) -> Result<Blueprint, StorageError> {
    let id = blueprint_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let sections: Vec<Section> =
        from_json(&row.try_get::<String, _>("sections_json").map_err(ser)?)?;
    let band_scores: Vec<BandScore> =
        from_json(&row.try_get::<String, _>("band_scores_json").map_err(ser)?)?;
    let is_active: i64 = row.try_get("is_active").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;

    let draft = BlueprintDraft {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        version: row.try_get("version").map_err(ser)?,
        sections,
        band_scores,
    };
    Blueprint::new(id, draft, is_active != 0, created_at).map_err(ser)
}

fn outcome_from_row(row: &SqliteRow) -> Result<Option<AttemptOutcome>, StorageError> {
    let total_score: Option<f64> = row.try_get("total_score").map_err(ser)?;
    let band: Option<i64> = row.try_get("band").map_err(ser)?;
    let level: Option<String> = row.try_get("level").map_err(ser)?;
    let recommendation: Option<String> = row.try_get("recommendation").map_err(ser)?;

    match (total_score, band, level, recommendation) {
        (Some(total_score), Some(band), Some(level), Some(recommendation)) => {
            let band = u8::try_from(band)
                .map_err(|_| StorageError::Serialization(format!("invalid band: {band}")))?;
            Ok(Some(AttemptOutcome {
                total_score,
                band,
                level,
                recommendation,
            }))
        }
        (None, None, None, None) => Ok(None),
        _ => Err(StorageError::Serialization(
            "partially stored attempt outcome".into(),
        )),
    }
}

pub(crate) fn attempt_from_row(row: &SqliteRow) -> Result<Attempt, StorageError> {
    let current_section = row
        .try_get::<Option<String>, _>("current_section")
        .map_err(ser)?
        .map(|s| s.parse::<SectionType>())
        .transpose()
        .map_err(ser)?;
    let answers: Vec<AnswerRecord> =
        from_json(&row.try_get::<String, _>("answers_json").map_err(ser)?)?;
    let section_results: Vec<SectionResult> =
        from_json(&row.try_get::<String, _>("section_results_json").map_err(ser)?)?;

    Attempt::from_persisted(
        attempt_id_from_i64(row.try_get("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        blueprint_id_from_i64(row.try_get("blueprint_id").map_err(ser)?)?,
        row.try_get("blueprint_version").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        current_section,
        answers,
        section_results,
        outcome_from_row(row)?,
        i64_to_u64("revision", row.try_get("revision").map_err(ser)?)?,
    )
    .map_err(ser)
}
