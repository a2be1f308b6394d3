use crate::application::ports::OpenWorkStore;
use crate::domain::entities::OpenWorkItem;
use crate::domain::value_objects::RecordId;
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

pub struct SqliteOpenWorkStore {
    pool: DbPool,
}

impl SqliteOpenWorkStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<OpenWorkItem, AppError> {
        let record_id: String = row.get("record_id");
        let start_at: Option<String> = row.get("start_at");
        let pending: i64 = row.get("pending_completion");

        Ok(OpenWorkItem {
            record_id: RecordId::new(record_id).map_err(AppError::Validation)?,
            plan_id: row.get("plan_id"),
            start_at: start_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            operator: row.get("operator"),
            equipment: row.get("equipment"),
            pending_completion: pending != 0,
        })
    }
}

#[async_trait]
impl OpenWorkStore for SqliteOpenWorkStore {
    async fn list(&self) -> Result<Vec<OpenWorkItem>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT record_id, plan_id, start_at, operator, equipment, pending_completion
            FROM open_work_items
            ORDER BY COALESCE(start_at, ''), record_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::item_from_row).collect()
    }

    async fn upsert(&self, item: &OpenWorkItem) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO open_work_items (
                record_id, plan_id, start_at, operator, equipment,
                pending_completion, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(record_id) DO UPDATE SET
                plan_id = excluded.plan_id,
                start_at = excluded.start_at,
                operator = excluded.operator,
                equipment = excluded.equipment,
                pending_completion = excluded.pending_completion,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(item.record_id.as_str())
        .bind(&item.plan_id)
        .bind(item.start_at.map(|dt| dt.to_rfc3339()))
        .bind(&item.operator)
        .bind(&item.equipment)
        .bind(item.pending_completion as i64)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_pending(&self, record_id: &RecordId, pending: bool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE open_work_items
            SET pending_completion = ?1, updated_at = ?2
            WHERE record_id = ?3
            "#,
        )
        .bind(pending as i64)
        .bind(Utc::now().timestamp())
        .bind(record_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, record_id: &RecordId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM open_work_items WHERE record_id = ?1")
            .bind(record_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_all(&self, items: &[OpenWorkItem]) -> Result<(), AppError> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM open_work_items")
            .execute(&mut *tx)
            .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO open_work_items (
                    record_id, plan_id, start_at, operator, equipment,
                    pending_completion, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(item.record_id.as_str())
            .bind(&item.plan_id)
            .bind(item.start_at.map(|dt| dt.to_rfc3339()))
            .bind(&item.operator)
            .bind(&item.equipment)
            .bind(item.pending_completion as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
