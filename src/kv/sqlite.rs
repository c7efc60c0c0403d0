use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::AppError;
use crate::kv::{KeyValueStore, Namespace, SCHEMA_VERSION, timestamp};

/// Durable local store backed by the `kv_entries` table.
pub struct SqliteKvStore {
    db: SqlitePool,
    quota: usize,
}

impl SqliteKvStore {
    pub fn new(db: SqlitePool, quota: usize) -> Self {
        Self { db, quota }
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>, AppError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT value, schema_version FROM kv_entries WHERE namespace = ? AND key = ?",
        )
        .bind(ns.as_str())
        .bind(key)
        .fetch_optional(&self.db)
        .await?;

        let Some((value, schema_version)) = row else {
            return Ok(None);
        };
        if schema_version != SCHEMA_VERSION {
            warn!(
                "ignoring {}/{} written with schema version {} (expected {})",
                ns.as_str(),
                key,
                schema_version,
                SCHEMA_VERSION
            );
            return Ok(None);
        }

        sqlx::query("UPDATE kv_entries SET last_accessed_at = ? WHERE namespace = ? AND key = ?")
            .bind(timestamp(Utc::now()))
            .bind(ns.as_str())
            .bind(key)
            .execute(&self.db)
            .await?;

        Ok(Some(value))
    }

    async fn put(&self, ns: Namespace, key: &str, value: &str) -> Result<(), AppError> {
        let size = value.len() as i64;
        let mut tx = self.db.begin().await?;

        if ns == Namespace::File {
            let used: (i64,) = sqlx::query_as(
                "SELECT COALESCE(SUM(size), 0) FROM kv_entries WHERE namespace = ? AND key != ?",
            )
            .bind(ns.as_str())
            .bind(key)
            .fetch_one(&mut *tx)
            .await?;

            if (used.0 + size) as usize > self.quota {
                warn!(
                    "local storage quota exceeded: used={} incoming={} quota={}",
                    used.0, size, self.quota
                );
                return Err(AppError::StorageQuota);
            }
        }

        let now = timestamp(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO kv_entries
                (namespace, key, value, schema_version, size, created_at, last_accessed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (namespace, key) DO UPDATE SET
                value = excluded.value,
                schema_version = excluded.schema_version,
                size = excluded.size,
                last_accessed_at = excluded.last_accessed_at
            "#,
        )
        .bind(ns.as_str())
        .bind(key)
        .bind(value)
        .bind(SCHEMA_VERSION)
        .bind(size)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, ns: Namespace, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE namespace = ? AND key = ?")
            .bind(ns.as_str())
            .bind(key)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }

    async fn keys(&self, ns: Namespace) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT key FROM kv_entries WHERE namespace = ? ORDER BY key")
                .bind(ns.as_str())
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn keys_untouched_since(
        &self,
        ns: Namespace,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT key FROM kv_entries WHERE namespace = ? AND last_accessed_at <= ? ORDER BY key",
        )
        .bind(ns.as_str())
        .bind(timestamp(cutoff))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    async fn clear(&self, ns: Namespace) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_entries WHERE namespace = ?")
            .bind(ns.as_str())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    #[tokio::test]
    async fn test_put_get_and_overwrite() {
        let store = SqliteKvStore::new(setup_test_db().await, 1024);

        store.put(Namespace::Note, "course-1", "Bab 1").await.unwrap();
        store.put(Namespace::Note, "course-1", "Bab 2").await.unwrap();

        let value = store.get(Namespace::Note, "course-1").await.unwrap();
        assert_eq!(value.as_deref(), Some("Bab 2"));
        assert_eq!(store.keys(Namespace::Note).await.unwrap(), vec!["course-1"]);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let store = SqliteKvStore::new(setup_test_db().await, 1024);
        assert_eq!(store.get(Namespace::File, "file_0_none").await.unwrap(), None);
        assert!(!store.delete(Namespace::File, "file_0_none").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_quota_rejects_overflow() {
        let store = SqliteKvStore::new(setup_test_db().await, 8);
        store.put(Namespace::File, "a", "12345").await.unwrap();

        let err = store.put(Namespace::File, "b", "12345").await.unwrap_err();
        assert!(matches!(err, AppError::StorageQuota));
        assert_eq!(store.keys(Namespace::File).await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_clear_only_touches_namespace() {
        let store = SqliteKvStore::new(setup_test_db().await, 1024);
        store.put(Namespace::File, "file_1", "x").await.unwrap();
        store.put(Namespace::Session, "current", "{}").await.unwrap();

        store.clear(Namespace::File).await.unwrap();

        assert!(store.keys(Namespace::File).await.unwrap().is_empty());
        assert_eq!(store.keys(Namespace::Session).await.unwrap(), vec!["current"]);
    }

    #[tokio::test]
    async fn test_entry_from_other_schema_version_is_ignored() {
        let pool = setup_test_db().await;
        sqlx::query(
            "INSERT INTO kv_entries VALUES ('note', 'c1', 'old', 99, 3, '2020-01-01T00:00:00.000000Z', '2020-01-01T00:00:00.000000Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let store = SqliteKvStore::new(pool, 1024);

        assert_eq!(store.get(Namespace::Note, "c1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_untouched_keys_respect_cutoff() {
        let store = SqliteKvStore::new(setup_test_db().await, 1024);
        let before = Utc::now() - chrono::Duration::seconds(1);
        store.put(Namespace::File, "file_1", "x").await.unwrap();

        assert!(
            store
                .keys_untouched_since(Namespace::File, before)
                .await
                .unwrap()
                .is_empty()
        );
        let later = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(
            store
                .keys_untouched_since(Namespace::File, later)
                .await
                .unwrap(),
            vec!["file_1"]
        );
    }
}
