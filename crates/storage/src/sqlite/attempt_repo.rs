use placement_core::model::{Attempt, AttemptId, NewAttempt, UserId};

use super::SqliteRepository;
use super::mapping::{ATTEMPT_COLUMNS, attempt_from_row, conn, id_i64, to_json};
use crate::repository::{AttemptRepository, OpenedAttempt, Page, PageRequest, StorageError};

/// How often `open_or_create_attempt` retries when the open attempt it lost a
/// race against is completed before it can be read back.
const OPEN_RETRIES: usize = 3;

impl SqliteRepository {
    async fn open_attempt_for(
        &self,
        user_id: i64,
        blueprint_id: i64,
    ) -> Result<Option<Attempt>, StorageError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts \
             WHERE user_id = ?1 AND blueprint_id = ?2 AND completed_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(blueprint_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn page_attempts(
        &self,
        user_id: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Attempt>, StorageError> {
        let offset = i64::try_from(page.offset())
            .map_err(|_| StorageError::Serialization("offset overflow".into()))?;

        let (rows, total) = if let Some(user_id) = user_id {
            let sql = format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = ?1 \
                 ORDER BY started_at DESC, id DESC LIMIT ?2 OFFSET ?3"
            );
            let rows = sqlx::query(&sql)
                .bind(user_id)
                .bind(i64::from(page.limit()))
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;
            (rows, total)
        } else {
            let sql = format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts \
                 ORDER BY started_at DESC, id DESC LIMIT ?1 OFFSET ?2"
            );
            let rows = sqlx::query(&sql)
                .bind(i64::from(page.limit()))
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts")
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;
            (rows, total)
        };

        let items = rows
            .iter()
            .map(attempt_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let total = u64::try_from(total)
            .map_err(|_| StorageError::Serialization("negative count".into()))?;
        Ok(Page::new(items, page, total))
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn open_or_create_attempt(
        &self,
        new: NewAttempt,
    ) -> Result<OpenedAttempt, StorageError> {
        let user_id = id_i64("user_id", new.user_id.value())?;
        let blueprint_id = id_i64("blueprint_id", new.blueprint_id.value())?;

        for _ in 0..OPEN_RETRIES {
            // The partial unique index turns a concurrent second insert into a no-op.
            let res = sqlx::query(
                r"
                INSERT INTO attempts (
                    user_id, blueprint_id, blueprint_version, started_at, current_section,
                    answers_json, section_results_json, revision
                )
                VALUES (?1, ?2, ?3, ?4, ?5, '[]', '[]', 0)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(user_id)
            .bind(blueprint_id)
            .bind(&new.blueprint_version)
            .bind(new.started_at)
            .bind(new.current_section.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

            if res.rows_affected() == 1 {
                let id = AttemptId::new(u64::try_from(res.last_insert_rowid()).map_err(|_| {
                    StorageError::Serialization("attempt_id sign overflow".into())
                })?);
                return Ok(OpenedAttempt {
                    attempt: new.into_attempt(id),
                    created: true,
                });
            }

            if let Some(existing) = self.open_attempt_for(user_id, blueprint_id).await? {
                return Ok(OpenedAttempt {
                    attempt: existing,
                    created: false,
                });
            }
        }

        Err(StorageError::Conflict)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<Attempt>, StorageError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("attempt_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(attempt_from_row).transpose()
    }

    async fn update_attempt(&self, attempt: &Attempt) -> Result<u64, StorageError> {
        let id = id_i64("attempt_id", attempt.id().value())?;
        let expected = id_i64("revision", attempt.revision())?;
        let outcome = attempt.outcome();

        let res = sqlx::query(
            r"
            UPDATE attempts SET
                completed_at = ?1,
                current_section = ?2,
                answers_json = ?3,
                section_results_json = ?4,
                total_score = ?5,
                band = ?6,
                level = ?7,
                recommendation = ?8,
                revision = revision + 1
            WHERE id = ?9 AND revision = ?10 AND completed_at IS NULL
            ",
        )
        .bind(attempt.completed_at())
        .bind(attempt.current_section().map(|s| s.as_str()))
        .bind(to_json(&attempt.answers())?)
        .bind(to_json(&attempt.section_results())?)
        .bind(outcome.map(|o| o.total_score))
        .bind(outcome.map(|o| i64::from(o.band)))
        .bind(outcome.map(|o| o.level.as_str()))
        .bind(outcome.map(|o| o.recommendation.as_str()))
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 1 {
            return Ok(attempt.revision() + 1);
        }

        let exists = sqlx::query("SELECT 1 FROM attempts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_some() {
            Err(StorageError::Conflict)
        } else {
            Err(StorageError::NotFound)
        }
    }

    async fn list_attempts_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Attempt>, StorageError> {
        let user_id = id_i64("user_id", user_id.value())?;
        self.page_attempts(Some(user_id), page).await
    }

    async fn list_attempts(&self, page: PageRequest) -> Result<Page<Attempt>, StorageError> {
        self.page_attempts(None, page).await
    }
}
