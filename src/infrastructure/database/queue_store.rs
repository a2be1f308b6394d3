use crate::application::ports::QueueStore;
use crate::domain::entities::QueuedRecord;
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tracing::warn;

pub struct SqliteQueueStore {
    pool: DbPool,
}

impl SqliteQueueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(&self, record: &QueuedRecord) -> Result<(), AppError> {
        let payload = serde_json::to_string(record)?;
        let created_at = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO submission_queue (client_ref, entry_type, payload, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(record.client_ref.to_string())
        .bind(record.entry.entry_type().as_str())
        .bind(&payload)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn drain_all(&self) -> Result<Vec<QueuedRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            SELECT payload FROM submission_queue
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM submission_queue")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.get("payload");
            match serde_json::from_str::<QueuedRecord>(&payload) {
                Ok(record) => records.push(record),
                // An unreadable row would block the queue forever; drop it.
                Err(err) => warn!("Dropping unreadable queued record: {err}"),
            }
        }

        Ok(records)
    }

    async fn depth(&self) -> Result<u64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM submission_queue")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ReportEntry, StartEntry};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_store() -> SqliteQueueStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../../migrations/0001_initial.sql"))
            .execute(&pool)
            .await
            .unwrap();
        SqliteQueueStore::new(pool)
    }

    fn start_record(plan: &str) -> QueuedRecord {
        QueuedRecord::new(ReportEntry::Start(StartEntry {
            plan_id: plan.into(),
            start_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            operator: "A".into(),
            equipment: "E1".into(),
        }))
    }

    #[tokio::test]
    async fn test_drain_returns_everything_enqueued_then_empties() {
        let store = setup_store().await;

        let records = vec![start_record("P1"), start_record("P2"), start_record("P1")];
        for record in &records {
            store.enqueue(record).await.unwrap();
        }
        assert_eq!(store.depth().await.unwrap(), 3);

        let drained = store.drain_all().await.unwrap();
        assert_eq!(drained, records);

        assert!(store.drain_all().await.unwrap().is_empty());
        assert_eq!(store.depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_requeued_records_survive_a_second_drain() {
        let store = setup_store().await;

        store.enqueue(&start_record("P1")).await.unwrap();
        let drained = store.drain_all().await.unwrap();

        for record in &drained {
            store.enqueue(record).await.unwrap();
        }

        let again = store.drain_all().await.unwrap();
        assert_eq!(again, drained);
    }
}
