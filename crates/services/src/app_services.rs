use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::blueprint_store::BlueprintStore;
use crate::error::PlacementServicesError;
use crate::sessions::{AggregateScorer, ResultsService, SectionGrader, SessionManager};

/// Assembles the placement services over one storage backend.
#[derive(Clone)]
pub struct PlacementServices {
    blueprints: Arc<BlueprintStore>,
    sessions: Arc<SessionManager>,
    grader: Arc<SectionGrader>,
    scorer: Arc<AggregateScorer>,
    results: Arc<ResultsService>,
}

impl PlacementServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `PlacementServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, PlacementServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over fresh in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        Self {
            blueprints: Arc::new(BlueprintStore::new(clock, Arc::clone(&storage.blueprints))),
            sessions: Arc::new(SessionManager::new(
                clock,
                Arc::clone(&storage.blueprints),
                Arc::clone(&storage.attempts),
            )),
            grader: Arc::new(SectionGrader::new(
                clock,
                Arc::clone(&storage.blueprints),
                Arc::clone(&storage.attempts),
            )),
            scorer: Arc::new(AggregateScorer::new(
                clock,
                Arc::clone(&storage.blueprints),
                Arc::clone(&storage.attempts),
            )),
            results: Arc::new(ResultsService::new(Arc::clone(&storage.attempts))),
        }
    }

    #[must_use]
    pub fn blueprints(&self) -> Arc<BlueprintStore> {
        Arc::clone(&self.blueprints)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn grader(&self) -> Arc<SectionGrader> {
        Arc::clone(&self.grader)
    }

    #[must_use]
    pub fn scorer(&self) -> Arc<AggregateScorer> {
        Arc::clone(&self.scorer)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsService> {
        Arc::clone(&self.results)
    }
}
