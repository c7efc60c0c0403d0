//! Namespaced local key/value storage.
//!
//! Every entry lives under a [`Namespace`] and is stamped with
//! [`SCHEMA_VERSION`], so callers never build raw string keys by hand and a
//! backend can be swapped without touching key conventions. Only the
//! [`Namespace::File`] namespace is subject to the byte quota.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

pub const SCHEMA_VERSION: i64 = 1;

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Spilled-over file payloads.
    File,
    /// Per-course free-text notes, keyed by course id.
    Note,
    /// Cached profile of the signed-in user.
    Session,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::File => "file",
            Namespace::Note => "note",
            Namespace::Session => "session",
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>, AppError>;

    /// Fails with [`AppError::StorageQuota`] when a `File` write would exceed
    /// the configured quota.
    async fn put(&self, ns: Namespace, key: &str, value: &str) -> Result<(), AppError>;

    async fn delete(&self, ns: Namespace, key: &str) -> Result<bool, AppError>;

    async fn keys(&self, ns: Namespace) -> Result<Vec<String>, AppError>;

    /// Keys not written or read since `cutoff`.
    async fn keys_untouched_since(
        &self,
        ns: Namespace,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, AppError>;

    async fn clear(&self, ns: Namespace) -> Result<(), AppError>;
}
