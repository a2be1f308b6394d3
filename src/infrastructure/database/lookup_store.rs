use crate::application::ports::LookupStore;
use crate::domain::entities::LookupEntry;
use crate::domain::value_objects::FieldCode;
use crate::infrastructure::database::DbPool;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

pub struct SqliteLookupStore {
    pool: DbPool,
}

impl SqliteLookupStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LookupStore for SqliteLookupStore {
    async fn load(&self, field: &FieldCode) -> Result<Vec<LookupEntry>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT entry_key, entry_values FROM lookup_cache
            WHERE field_code = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(field.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get("entry_key");
            let raw_values: String = row.get("entry_values");
            let values = serde_json::from_str(&raw_values)
                .map_err(|err| AppError::Deserialization(err.to_string()))?;
            entries.push(LookupEntry::new(key, values));
        }
        Ok(entries)
    }

    async fn save(&self, field: &FieldCode, entries: &[LookupEntry]) -> Result<(), AppError> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM lookup_cache WHERE field_code = ?1")
            .bind(field.as_str())
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            let values = serde_json::to_string(&entry.values)?;
            sqlx::query(
                r#"
                INSERT INTO lookup_cache (field_code, entry_key, entry_values, inserted_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(field.as_str())
            .bind(&entry.key)
            .bind(values)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::BTreeMap;

    async fn setup_store() -> SqliteLookupStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(include_str!("../../../migrations/0001_initial.sql"))
            .execute(&pool)
            .await
            .unwrap();
        SqliteLookupStore::new(pool)
    }

    fn entry(key: &str, name: &str) -> LookupEntry {
        LookupEntry::new(
            key.into(),
            BTreeMap::from([("name".to_string(), name.to_string())]),
        )
    }

    #[tokio::test]
    async fn test_save_preserves_insertion_order_per_field() {
        let store = setup_store().await;
        let plan = FieldCode::new("plan_id".into()).unwrap();
        let operator = FieldCode::new("operator".into()).unwrap();

        store
            .save(&plan, &[entry("P2", "Widget"), entry("P1", "Gadget")])
            .await
            .unwrap();
        store.save(&operator, &[entry("OP1", "Alice")]).await.unwrap();

        let loaded = store.load(&plan).await.unwrap();
        let keys: Vec<&str> = loaded.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["P2", "P1"]);

        let other = store.load(&operator).await.unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].values.get("name").unwrap(), "Alice");
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let store = setup_store().await;
        let plan = FieldCode::new("plan_id".into()).unwrap();

        store.save(&plan, &[entry("P1", "Widget")]).await.unwrap();
        store.save(&plan, &[entry("P3", "Sprocket")]).await.unwrap();

        let loaded = store.load(&plan).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key, "P3");
    }
}
