mod common;

use std::sync::Arc;
use std::time::Duration;

use common::setup_test_db;
use eduflow::error::AppError;
use eduflow::kv::{KeyValueStore, Namespace, SqliteKvStore};
use eduflow::spillover::{DEFAULT_THRESHOLD, LOCAL_PREFIX, PLACEHOLDER, SpilloverCodec, StorageReference};

async fn codec_with_quota(quota: usize) -> (SpilloverCodec, Arc<SqliteKvStore>) {
    let kv = Arc::new(SqliteKvStore::new(setup_test_db().await, quota));
    (SpilloverCodec::new(kv.clone(), DEFAULT_THRESHOLD), kv)
}

#[tokio::test]
async fn test_large_payload_spills_and_resolves_until_cleared() {
    let (codec, kv) = codec_with_quota(50_000_000).await;
    let payload = "x".repeat(2_000_000);

    let reference = codec.route(payload.clone()).await.unwrap().to_string();
    assert!(reference.starts_with(LOCAL_PREFIX));

    let resolved = codec.resolve(&reference).await;
    assert_eq!(resolved.len(), 2_000_000);
    assert!(resolved == payload);

    kv.clear(Namespace::File).await.unwrap();
    assert_eq!(codec.resolve(&reference).await, PLACEHOLDER);
}

#[tokio::test]
async fn test_payload_at_threshold_stays_inline() {
    let (codec, kv) = codec_with_quota(50_000_000).await;
    let payload = "y".repeat(DEFAULT_THRESHOLD);

    let reference = codec.route(payload.clone()).await.unwrap();

    assert!(matches!(reference, StorageReference::Inline(_)));
    assert!(reference.to_string() == payload);
    assert!(kv.keys(Namespace::File).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_uploaded_bytes_over_threshold_spill() {
    let (codec, _kv) = codec_with_quota(50_000_000).await;
    // 800 KB of bytes encode to ~1.07M base64 chars.
    let bytes = vec![7u8; 800_000];

    let reference = codec.store_file(&bytes, "application/pdf").await.unwrap();
    let key = reference.local_key().expect("spilled").to_string();
    assert!(key.starts_with("file_"));

    let resolved = codec.resolve(&reference.to_string()).await;
    assert!(resolved.starts_with("data:application/pdf;base64,"));
}

#[tokio::test]
async fn test_quota_exceeded_aborts_with_error() {
    let (codec, kv) = codec_with_quota(1_500_000).await;

    codec.route("a".repeat(1_200_000)).await.unwrap();
    let err = codec.route("b".repeat(1_200_000)).await.unwrap_err();

    assert!(matches!(err, AppError::StorageQuota));
    assert_eq!(kv.keys(Namespace::File).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_gc_removes_orphaned_blobs() {
    let (codec, kv) = codec_with_quota(50_000_000).await;
    let codec = codec.with_gc_grace(Duration::ZERO);
    let kept = codec.route("k".repeat(1_000_001)).await.unwrap().to_string();
    codec.route("o".repeat(1_000_001)).await.unwrap();

    let removed = codec.collect_garbage([kept.as_str()]).await.unwrap();

    assert_eq!(removed, 1);
    assert_eq!(kv.keys(Namespace::File).await.unwrap().len(), 1);
    assert_eq!(codec.resolve(&kept).await.len(), 1_000_001);
}

#[tokio::test]
async fn test_gc_keeps_recent_upload_not_yet_attached() {
    let (codec, kv) = codec_with_quota(50_000_000).await;
    let reference = codec
        .store_file(&vec![1u8; 800_000], "application/pdf")
        .await
        .unwrap()
        .to_string();

    let removed = codec.collect_garbage([]).await.unwrap();

    assert_eq!(removed, 0);
    assert_eq!(kv.keys(Namespace::File).await.unwrap().len(), 1);
    assert!(codec.resolve(&reference).await.starts_with("data:application/pdf"));
}
