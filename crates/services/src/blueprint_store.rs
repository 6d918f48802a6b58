use std::sync::Arc;

use placement_core::model::{Blueprint, BlueprintDraft, BlueprintId};
use storage::repository::BlueprintRepository;
use tracing::info;

use crate::Clock;
use crate::error::BlueprintStoreError;

/// Reads, authors and activates blueprints.
#[derive(Clone)]
pub struct BlueprintStore {
    clock: Clock,
    blueprints: Arc<dyn BlueprintRepository>,
}

impl BlueprintStore {
    #[must_use]
    pub fn new(clock: Clock, blueprints: Arc<dyn BlueprintRepository>) -> Self {
        Self { clock, blueprints }
    }

    /// The blueprint test takers are currently served.
    ///
    /// # Errors
    ///
    /// Returns `BlueprintStoreError::NotFound` when nothing is active.
    /// Returns `BlueprintStoreError::Storage` if repository access fails.
    pub async fn active_blueprint(&self) -> Result<Blueprint, BlueprintStoreError> {
        self.blueprints
            .active_blueprint()
            .await?
            .ok_or(BlueprintStoreError::NotFound)
    }

    /// Make `id` the only active blueprint and return it.
    ///
    /// # Errors
    ///
    /// Returns `BlueprintStoreError::NotFound` if the blueprint does not exist;
    /// the previously active blueprint stays active.
    /// Returns `BlueprintStoreError::Storage` if repository access fails.
    pub async fn activate(&self, id: BlueprintId) -> Result<Blueprint, BlueprintStoreError> {
        self.blueprints.activate_blueprint(id).await?;
        let blueprint = self.get(id).await?;
        info!(blueprint_id = %id, version = blueprint.version(), "blueprint activated");
        Ok(blueprint)
    }

    /// Fetch a blueprint by ID.
    ///
    /// # Errors
    ///
    /// Returns `BlueprintStoreError::NotFound` if it does not exist.
    /// Returns `BlueprintStoreError::Storage` if repository access fails.
    pub async fn get(&self, id: BlueprintId) -> Result<Blueprint, BlueprintStoreError> {
        self.blueprints
            .get_blueprint(id)
            .await?
            .ok_or(BlueprintStoreError::NotFound)
    }

    /// Validate and store a new, inactive blueprint.
    ///
    /// # Errors
    ///
    /// Returns `BlueprintStoreError::Blueprint` for validation failures.
    /// Returns `BlueprintStoreError::Storage` if persistence fails.
    pub async fn create(&self, draft: &BlueprintDraft) -> Result<BlueprintId, BlueprintStoreError> {
        draft.validate()?;
        let id = self
            .blueprints
            .insert_new_blueprint(draft, self.clock.now())
            .await?;
        info!(blueprint_id = %id, version = %draft.version, "blueprint created");
        Ok(id)
    }

    /// List blueprints ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `BlueprintStoreError::Storage` if repository access fails.
    pub async fn list(&self, limit: u32) -> Result<Vec<Blueprint>, BlueprintStoreError> {
        Ok(self.blueprints.list_blueprints(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement_core::model::{GrammarQuestion, Question, Section, SectionType};
    use placement_core::time::fixed_clock;
    use storage::repository::Storage;

    fn draft(version: &str) -> BlueprintDraft {
        BlueprintDraft {
            title: "Placement".into(),
            description: None,
            version: version.into(),
            sections: vec![Section::new(
                SectionType::Grammar,
                vec![Question::Grammar(GrammarQuestion {
                    id: "g1".into(),
                    question: "?".into(),
                    correct_answer: "a".into(),
                    options: Vec::new(),
                })],
                60,
            )],
            band_scores: Vec::new(),
        }
    }

    fn store() -> BlueprintStore {
        BlueprintStore::new(fixed_clock(), Storage::in_memory().blueprints)
    }

    #[tokio::test]
    async fn no_active_blueprint_is_not_found() {
        let err = store().active_blueprint().await.unwrap_err();
        assert!(matches!(err, BlueprintStoreError::NotFound));
    }

    #[tokio::test]
    async fn activation_switches_the_active_blueprint() {
        let store = store();
        let a = store.create(&draft("1")).await.unwrap();
        let b = store.create(&draft("2")).await.unwrap();

        assert!(store.activate(a).await.unwrap().is_active());
        store.activate(b).await.unwrap();

        assert_eq!(store.active_blueprint().await.unwrap().id(), b);
        assert!(!store.get(a).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn activating_unknown_blueprint_keeps_previous() {
        let store = store();
        let a = store.create(&draft("1")).await.unwrap();
        store.activate(a).await.unwrap();

        let err = store.activate(BlueprintId::new(42)).await.unwrap_err();
        assert!(matches!(err, BlueprintStoreError::NotFound));
        assert_eq!(store.active_blueprint().await.unwrap().id(), a);
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected() {
        let mut bad = draft("1");
        bad.sections.clear();
        let err = store().create(&bad).await.unwrap_err();
        assert!(matches!(err, BlueprintStoreError::Blueprint(_)));
    }
}
