//! `placement seed`: store a blueprint draft, optionally activating it.

use std::path::Path;

use placement_core::model::{BlueprintDraft, BlueprintId};
use services::{BlueprintStoreError, PlacementServices};
use thiserror::Error;

const SAMPLE_BLUEPRINT: &str = include_str!("../assets/sample_blueprint.json");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid blueprint json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] BlueprintStoreError),
}

/// Parse the bundled sample draft.
///
/// # Errors
///
/// Returns `SeedError::Parse` if the bundled JSON does not match the draft schema.
pub fn sample_draft() -> Result<BlueprintDraft, SeedError> {
    Ok(serde_json::from_str(SAMPLE_BLUEPRINT)?)
}

/// Load a draft from `file`, or the bundled sample when `None`.
///
/// # Errors
///
/// Returns `SeedError` if the file cannot be read or parsed.
pub fn load_draft(file: Option<&Path>) -> Result<BlueprintDraft, SeedError> {
    let Some(path) = file else {
        return sample_draft();
    };
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Store `draft` and activate it when asked.
///
/// # Errors
///
/// Returns `SeedError::Store` for validation or storage failures.
pub async fn seed(
    services: &PlacementServices,
    draft: &BlueprintDraft,
    activate: bool,
) -> Result<BlueprintId, SeedError> {
    let store = services.blueprints();
    let id = store.create(draft).await?;
    if activate {
        store.activate(id).await?;
    }
    tracing::info!(blueprint_id = %id, version = %draft.version, activate, "blueprint seeded");
    Ok(id)
}
