//! Size-based routing of uploaded files.
//!
//! Encoded payloads up to the threshold are inlined into course records;
//! anything larger is spilled into the local `file` namespace and replaced by
//! a `LOCAL:<key>` reference. Payloads that themselves start with `LOCAL:`
//! are always spilled so they cannot be mistaken for a reference. Spilled
//! entries are device-local and survive until
//! [`SpilloverCodec::collect_garbage`] removes them.

pub mod reference;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::kv::{KeyValueStore, Namespace};

pub use reference::{LOCAL_PREFIX, StorageReference};

pub const DEFAULT_THRESHOLD: usize = 1_000_000;

/// Unreferenced entries younger than this survive GC, so an upload that has
/// not been attached to a course yet is not lost.
pub const DEFAULT_GC_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

/// Returned by [`SpilloverCodec::resolve`] when content cannot be found.
pub const PLACEHOLDER: &str = "#";

pub struct SpilloverCodec {
    store: Arc<dyn KeyValueStore>,
    threshold: usize,
    gc_grace: Duration,
}

impl SpilloverCodec {
    pub fn new(store: Arc<dyn KeyValueStore>, threshold: usize) -> Self {
        Self {
            store,
            threshold,
            gc_grace: DEFAULT_GC_GRACE,
        }
    }

    pub fn with_gc_grace(mut self, gc_grace: Duration) -> Self {
        self.gc_grace = gc_grace;
        self
    }

    /// Encodes a whole file as a self-describing data URL.
    pub fn encode(bytes: &[u8], content_type: &str) -> String {
        let content_type = if content_type.is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };
        format!("data:{};base64,{}", content_type, Base64::encode_string(bytes))
    }

    pub async fn route(&self, payload: String) -> Result<StorageReference, AppError> {
        let length = payload.chars().count();
        if length <= self.threshold && !payload.starts_with(LOCAL_PREFIX) {
            debug!("inlining payload of {} chars", length);
            return Ok(StorageReference::Inline(payload));
        }

        let key = generate_key();
        self.store
            .put(Namespace::File, &key, &payload)
            .await
            .inspect_err(|e| warn!("failed to spill payload of {} chars: {}", length, e))?;

        info!("spilled payload of {} chars to local key {}", length, key);
        Ok(StorageReference::Local(key))
    }

    /// Encodes and routes in one step, the way an upload handler needs it.
    pub async fn store_file(
        &self,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StorageReference, AppError> {
        self.route(Self::encode(bytes, content_type)).await
    }

    /// Never fails: missing or unreadable local entries yield [`PLACEHOLDER`].
    pub async fn resolve(&self, reference: &str) -> String {
        if reference.is_empty() {
            return PLACEHOLDER.to_string();
        }

        match StorageReference::parse(reference) {
            StorageReference::Local(key) => match self.store.get(Namespace::File, &key).await {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    debug!("local entry {} is gone", key);
                    PLACEHOLDER.to_string()
                }
                Err(e) => {
                    warn!("failed to read local entry {}: {}", key, e);
                    PLACEHOLDER.to_string()
                }
            },
            _ => reference.to_string(),
        }
    }

    /// Deletes spilled entries that no live reference points at and that
    /// have not been touched within the grace period.
    pub async fn collect_garbage<'a, I>(&self, live_refs: I) -> Result<usize, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: HashSet<String> = live_refs
            .into_iter()
            .filter_map(|r| r.strip_prefix(LOCAL_PREFIX))
            .map(str::to_string)
            .collect();

        let Some(cutoff) = chrono::Duration::from_std(self.gc_grace)
            .ok()
            .and_then(|grace| Utc::now().checked_sub_signed(grace))
        else {
            return Ok(0);
        };

        let mut removed = 0;
        for key in self.store.keys_untouched_since(Namespace::File, cutoff).await? {
            if !live.contains(&key) && self.store.delete(Namespace::File, &key).await? {
                removed += 1;
            }
        }

        info!("blob gc removed {} unreferenced entries ({} live)", removed, live.len());
        Ok(removed)
    }
}

/// `file_<millis>_<9 base36 chars>`.
fn generate_key() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| std::char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
        .collect();
    format!("file_{}_{}", Utc::now().timestamp_millis(), suffix)
}
