use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::BlobError;
use crate::store::{BlobStore, collect_bytes};
use crate::types::BlobInfo;

/// Size of the payload used for multi-chunk checks (600 KiB).
const LARGE_PAYLOAD: usize = 600 * 1024;

fn payload(len: usize) -> Bytes {
    #[allow(clippy::cast_possible_truncation)]
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    Bytes::from(data)
}

async fn put(
    store: &dyn BlobStore,
    name: &str,
    content_type: &str,
    data: Bytes,
) -> Result<BlobInfo, BlobError> {
    let mut writer = store.begin_write(name, content_type).await?;
    // Uneven slices so chunk boundaries never line up with writes.
    for piece in data.chunks(70_001) {
        writer.write(Bytes::copy_from_slice(piece)).await?;
    }
    writer.finish().await
}

/// Run the full blob store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_blob_store_conformance_tests(store: &dyn BlobStore) -> Result<(), BlobError> {
    test_missing(store).await?;
    test_round_trip(store).await?;
    test_empty_blob(store).await?;
    test_uncommitted_is_invisible(store).await?;
    test_abort_discards(store).await?;
    test_drop_discards(store).await?;
    test_find_by_name_with_duplicates(store).await?;
    test_delete(store).await?;
    test_reads_are_independent(store).await?;
    Ok(())
}

async fn test_missing(store: &dyn BlobStore) -> Result<(), BlobError> {
    assert!(store.find_by_name("nope.bin").await?.is_none());
    assert!(matches!(
        store.open_read("0190b1a6-0000-7000-8000-000000000000").await,
        Err(BlobError::NotFound(_) | BlobError::InvalidId(_))
    ));
    Ok(())
}

async fn test_round_trip(store: &dyn BlobStore) -> Result<(), BlobError> {
    let data = payload(LARGE_PAYLOAD);
    let info = put(store, "round-trip.bin", "application/octet-stream", data.clone()).await?;

    assert_eq!(info.name, "round-trip.bin");
    assert_eq!(info.content_type, "application/octet-stream");
    assert_eq!(info.length, data.len() as u64);
    assert!(info.chunk_count >= 1);
    assert_eq!(info.checksum_sha256, hex::encode(Sha256::digest(&data)));

    let found = store
        .find_by_name("round-trip.bin")
        .await?
        .expect("committed blob should be findable");
    assert_eq!(found.id, info.id);

    let stat = store.stat(&info.id).await?.expect("stat should see blob");
    assert_eq!(stat.length, info.length);

    let read = collect_bytes(store.open_read(&info.id).await?).await?;
    assert_eq!(read, data, "content should round-trip byte for byte");
    Ok(())
}

async fn test_empty_blob(store: &dyn BlobStore) -> Result<(), BlobError> {
    let info = put(store, "empty.txt", "text/plain", Bytes::new()).await?;
    assert_eq!(info.length, 0);
    let read = collect_bytes(store.open_read(&info.id).await?).await?;
    assert!(read.is_empty());
    Ok(())
}

async fn test_uncommitted_is_invisible(store: &dyn BlobStore) -> Result<(), BlobError> {
    let mut writer = store.begin_write("pending.bin", "application/zip").await?;
    writer.write(payload(1024)).await?;
    assert!(
        store.find_by_name("pending.bin").await?.is_none(),
        "staged blob must not be visible before finish"
    );
    let info = writer.finish().await?;
    assert_eq!(
        store.find_by_name("pending.bin").await?.map(|b| b.id),
        Some(info.id)
    );
    Ok(())
}

async fn test_abort_discards(store: &dyn BlobStore) -> Result<(), BlobError> {
    let mut writer = store.begin_write("aborted.bin", "application/zip").await?;
    let id = writer.id().to_owned();
    writer.write(payload(4096)).await?;
    writer.abort().await?;
    assert!(store.find_by_name("aborted.bin").await?.is_none());
    assert!(store.stat(&id).await?.is_none());
    Ok(())
}

async fn test_drop_discards(store: &dyn BlobStore) -> Result<(), BlobError> {
    {
        let mut writer = store.begin_write("dropped.bin", "application/zip").await?;
        writer.write(payload(4096)).await?;
    }
    assert!(store.find_by_name("dropped.bin").await?.is_none());
    Ok(())
}

async fn test_find_by_name_with_duplicates(store: &dyn BlobStore) -> Result<(), BlobError> {
    let first = put(store, "dup.txt", "text/plain", Bytes::from_static(b"one")).await?;
    let second = put(store, "dup.txt", "text/plain", Bytes::from_static(b"two")).await?;
    assert_ne!(first.id, second.id);

    let found = store.find_by_name("dup.txt").await?.expect("dup present");
    assert_eq!(found.id, first.id, "earliest committed blob wins");

    store.delete(&first.id).await?;
    let found = store.find_by_name("dup.txt").await?.expect("second still present");
    assert_eq!(found.id, second.id);
    store.delete(&second.id).await?;
    assert!(store.find_by_name("dup.txt").await?.is_none());
    Ok(())
}

async fn test_delete(store: &dyn BlobStore) -> Result<(), BlobError> {
    let info = put(store, "to-delete.pdf", "application/pdf", payload(10)).await?;
    assert!(store.delete(&info.id).await?, "first delete should succeed");
    assert!(!store.delete(&info.id).await?, "second delete is a no-op");
    assert!(store.stat(&info.id).await?.is_none());
    assert!(matches!(
        store.open_read(&info.id).await,
        Err(BlobError::NotFound(_))
    ));
    Ok(())
}

async fn test_reads_are_independent(store: &dyn BlobStore) -> Result<(), BlobError> {
    let data = payload(LARGE_PAYLOAD / 2);
    let info = put(store, "twice.bin", "application/octet-stream", data.clone()).await?;
    let a = store.open_read(&info.id).await?;
    let b = store.open_read(&info.id).await?;
    assert_eq!(collect_bytes(b).await?, data);
    assert_eq!(collect_bytes(a).await?, data);
    Ok(())
}
