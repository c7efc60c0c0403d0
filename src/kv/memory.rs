use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::kv::{KeyValueStore, Namespace};

struct Entry {
    value: String,
    touched_at: DateTime<Utc>,
}

/// Process-local store, used for tests and as a scratch backend.
pub struct MemoryKvStore {
    entries: RwLock<HashMap<(Namespace, String), Entry>>,
    quota: usize,
}

impl MemoryKvStore {
    pub fn new(quota: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota,
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>, AppError> {
        let mut entries = self.entries.write().await;
        Ok(entries.get_mut(&(ns, key.to_string())).map(|entry| {
            entry.touched_at = Utc::now();
            entry.value.clone()
        }))
    }

    async fn put(&self, ns: Namespace, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;

        if ns == Namespace::File {
            let used: usize = entries
                .iter()
                .filter(|((n, k), _)| *n == Namespace::File && k != key)
                .map(|(_, entry)| entry.value.len())
                .sum();
            if used + value.len() > self.quota {
                return Err(AppError::StorageQuota);
            }
        }

        entries.insert(
            (ns, key.to_string()),
            Entry {
                value: value.to_string(),
                touched_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, ns: Namespace, key: &str) -> Result<bool, AppError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&(ns, key.to_string())).is_some())
    }

    async fn keys(&self, ns: Namespace) -> Result<Vec<String>, AppError> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|(n, _)| *n == ns)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn keys_untouched_since(
        &self,
        ns: Namespace,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, AppError> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|((n, _), entry)| *n == ns && entry.touched_at <= cutoff)
            .map(|((_, k), _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self, ns: Namespace) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        entries.retain(|(n, _), _| *n != ns);
        Ok(())
    }
}
