use async_trait::async_trait;
use chrono::{DateTime, Utc};
use placement_core::model::{
    Attempt, AttemptId, Blueprint, BlueprintDraft, BlueprintId, NewAttempt, UserId,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A conditional write lost against a concurrent writer.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── PAGINATION ────────────────────────────────────────────────────────────────
//

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One-based page selector with a bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Missing or zero values fall back to page 1 / `DEFAULT_PAGE_LIMIT`;
    /// the limit is capped at `MAX_PAGE_LIMIT`.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            limit: limit
                .filter(|l| *l > 0)
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .min(MAX_PAGE_LIMIT),
        }
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page(),
            limit: request.limit(),
            total,
        }
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Result of an idempotent attempt start.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedAttempt {
    pub attempt: Attempt,
    /// `false` when an unfinished attempt already existed and was returned.
    pub created: bool,
}

/// Repository contract for blueprints.
#[async_trait]
pub trait BlueprintRepository: Send + Sync {
    /// Store a new, inactive blueprint.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the blueprint cannot be stored.
    async fn insert_new_blueprint(
        &self,
        draft: &BlueprintDraft,
        created_at: DateTime<Utc>,
    ) -> Result<BlueprintId, StorageError>;

    /// Fetch a blueprint by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_blueprint(&self, id: BlueprintId) -> Result<Option<Blueprint>, StorageError>;

    /// Fetch the blueprint currently marked active, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn active_blueprint(&self) -> Result<Option<Blueprint>, StorageError>;

    /// Make `id` the only active blueprint, in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the blueprint does not exist; the
    /// previous activation is kept in that case.
    async fn activate_blueprint(&self, id: BlueprintId) -> Result<(), StorageError>;

    /// List blueprints ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_blueprints(&self, limit: u32) -> Result<Vec<Blueprint>, StorageError>;
}

/// Repository contract for attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Return the user's unfinished attempt for the blueprint, or create one
    /// from `new`. At most one unfinished attempt exists per user and
    /// blueprint, even under concurrent calls.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be read or stored.
    async fn open_or_create_attempt(&self, new: NewAttempt)
    -> Result<OpenedAttempt, StorageError>;

    /// Fetch an attempt by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>, StorageError>;

    /// Write `attempt` if the stored copy still has the same revision and is
    /// not completed. Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the stored attempt changed or was
    /// completed since it was read, `StorageError::NotFound` if it is gone.
    async fn update_attempt(&self, attempt: &Attempt) -> Result<u64, StorageError>;

    /// A user's attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_attempts_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Attempt>, StorageError>;

    /// All attempts across users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_attempts(&self, page: PageRequest) -> Result<Page<Attempt>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Each map sits behind one mutex, so every read-modify-write below is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    blueprints: Arc<Mutex<BTreeMap<BlueprintId, Blueprint>>>,
    attempts: Arc<Mutex<BTreeMap<AttemptId, Attempt>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn page_of(mut attempts: Vec<Attempt>, page: PageRequest) -> Page<Attempt> {
    attempts.sort_by(|a, b| {
        b.started_at()
            .cmp(&a.started_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
    let total = attempts.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let items = attempts.into_iter().skip(offset).take(limit).collect();
    Page::new(items, page, total)
}

#[async_trait]
impl BlueprintRepository for InMemoryRepository {
    async fn insert_new_blueprint(
        &self,
        draft: &BlueprintDraft,
        created_at: DateTime<Utc>,
    ) -> Result<BlueprintId, StorageError> {
        let mut guard = self.blueprints.lock().map_err(poisoned)?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let id = BlueprintId::new(next);
        let blueprint = Blueprint::new(id, draft.clone(), false, created_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.insert(id, blueprint);
        Ok(id)
    }

    async fn get_blueprint(&self, id: BlueprintId) -> Result<Option<Blueprint>, StorageError> {
        let guard = self.blueprints.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn active_blueprint(&self) -> Result<Option<Blueprint>, StorageError> {
        let guard = self.blueprints.lock().map_err(poisoned)?;
        Ok(guard.values().find(|b| b.is_active()).cloned())
    }

    async fn activate_blueprint(&self, id: BlueprintId) -> Result<(), StorageError> {
        let mut guard = self.blueprints.lock().map_err(poisoned)?;
        if !guard.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        let updated: BTreeMap<_, _> = std::mem::take(&mut *guard)
            .into_iter()
            .map(|(key, bp)| (key, bp.with_active(key == id)))
            .collect();
        *guard = updated;
        Ok(())
    }

    async fn list_blueprints(&self, limit: u32) -> Result<Vec<Blueprint>, StorageError> {
        let guard = self.blueprints.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard.values().take(limit).cloned().collect())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn open_or_create_attempt(
        &self,
        new: NewAttempt,
    ) -> Result<OpenedAttempt, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        if let Some(existing) = guard.values().find(|a| {
            a.user_id() == new.user_id && a.blueprint_id() == new.blueprint_id && !a.is_completed()
        }) {
            return Ok(OpenedAttempt {
                attempt: existing.clone(),
                created: false,
            });
        }

        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let attempt = new.into_attempt(AttemptId::new(next));
        guard.insert(attempt.id(), attempt.clone());
        Ok(OpenedAttempt {
            attempt,
            created: true,
        })
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn update_attempt(&self, attempt: &Attempt) -> Result<u64, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let stored = guard.get(&attempt.id()).ok_or(StorageError::NotFound)?;
        if stored.revision() != attempt.revision() || stored.is_completed() {
            return Err(StorageError::Conflict);
        }

        let revision = attempt.revision() + 1;
        let mut next = attempt.clone();
        next.set_revision(revision);
        guard.insert(next.id(), next);
        Ok(revision)
    }

    async fn list_attempts_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let mine = guard
            .values()
            .filter(|a| a.user_id() == user_id)
            .cloned()
            .collect();
        Ok(page_of(mine, page))
    }

    async fn list_attempts(&self, page: PageRequest) -> Result<Page<Attempt>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(page_of(guard.values().cloned().collect(), page))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub blueprints: Arc<dyn BlueprintRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let blueprints: Arc<dyn BlueprintRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            blueprints,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement_core::model::{GrammarQuestion, Question, Section, SectionType};
    use placement_core::time::fixed_now;

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
                50,
            )],
            band_scores: Vec::new(),
        }
    }

    #[test]
    fn page_request_clamps_inputs() {
        let p = PageRequest::new(Some(0), Some(1_000));
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
        assert_eq!(PageRequest::default().limit(), DEFAULT_PAGE_LIMIT);
    }

    #[tokio::test]
    async fn activation_keeps_a_single_active_blueprint() {
        let repo = InMemoryRepository::new();
        let first = repo.insert_new_blueprint(&draft("1"), fixed_now()).await.unwrap();
        let second = repo.insert_new_blueprint(&draft("2"), fixed_now()).await.unwrap();
        assert!(repo.active_blueprint().await.unwrap().is_none());

        repo.activate_blueprint(first).await.unwrap();
        repo.activate_blueprint(second).await.unwrap();

        let all = repo.list_blueprints(10).await.unwrap();
        assert_eq!(all.iter().filter(|b| b.is_active()).count(), 1);
        assert_eq!(repo.active_blueprint().await.unwrap().unwrap().id(), second);

        let err = repo.activate_blueprint(BlueprintId::new(99)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert_eq!(repo.active_blueprint().await.unwrap().unwrap().id(), second);
    }

    #[tokio::test]
    async fn open_or_create_reuses_unfinished_attempt() {
        let repo = InMemoryRepository::new();
        let id = repo.insert_new_blueprint(&draft("1"), fixed_now()).await.unwrap();
        let bp = repo.get_blueprint(id).await.unwrap().unwrap();
        let new = NewAttempt::begin(UserId::new(1), &bp, fixed_now()).unwrap();

        let first = repo.open_or_create_attempt(new.clone()).await.unwrap();
        let second = repo.open_or_create_attempt(new).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.attempt.id(), second.attempt.id());
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let repo = InMemoryRepository::new();
        let id = repo.insert_new_blueprint(&draft("1"), fixed_now()).await.unwrap();
        let bp = repo.get_blueprint(id).await.unwrap().unwrap();
        let new = NewAttempt::begin(UserId::new(1), &bp, fixed_now()).unwrap();
        let attempt = repo.open_or_create_attempt(new).await.unwrap().attempt;

        let rev = repo.update_attempt(&attempt).await.unwrap();
        assert_eq!(rev, 1);
        let err = repo.update_attempt(&attempt).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }
}
