use chrono::{DateTime, Utc};
use placement_core::model::{Blueprint, BlueprintDraft, BlueprintId};

use super::SqliteRepository;
use super::mapping::{
    BLUEPRINT_COLUMNS, blueprint_from_row, blueprint_id_from_i64, conn, id_i64, to_json,
};
use crate::repository::{BlueprintRepository, StorageError};

#[async_trait::async_trait]
impl BlueprintRepository for SqliteRepository {
    async fn insert_new_blueprint(
        &self,
        draft: &BlueprintDraft,
        created_at: DateTime<Utc>,
    ) -> Result<BlueprintId, StorageError> {
        draft
            .validate()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let res = sqlx::query(
            r"
            INSERT INTO blueprints (
                title, description, version, is_active,
                sections_json, band_scores_json, created_at
            )
            VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)
            ",
        )
        .bind(&draft.title)
        .bind(draft.description.as_deref())
        .bind(&draft.version)
        .bind(to_json(&draft.sections)?)
        .bind(to_json(&draft.band_scores)?)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        blueprint_id_from_i64(res.last_insert_rowid())
    }

    async fn get_blueprint(&self, id: BlueprintId) -> Result<Option<Blueprint>, StorageError> {
        let sql = format!("SELECT {BLUEPRINT_COLUMNS} FROM blueprints WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("blueprint_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(blueprint_from_row).transpose()
    }

    async fn active_blueprint(&self) -> Result<Option<Blueprint>, StorageError> {
        let sql = format!("SELECT {BLUEPRINT_COLUMNS} FROM blueprints WHERE is_active = 1 LIMIT 1");
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(blueprint_from_row).transpose()
    }

    async fn activate_blueprint(&self, id: BlueprintId) -> Result<(), StorageError> {
        let id = id_i64("blueprint_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("UPDATE blueprints SET is_active = 0 WHERE is_active = 1 AND id <> ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        let res = sqlx::query("UPDATE blueprints SET is_active = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            tx.rollback().await.map_err(conn)?;
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn list_blueprints(&self, limit: u32) -> Result<Vec<Blueprint>, StorageError> {
        let sql = format!("SELECT {BLUEPRINT_COLUMNS} FROM blueprints ORDER BY id ASC LIMIT ?1");
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(blueprint_from_row).collect()
    }
}
