use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::stream;
use tracing::{debug, info, warn};

use depot_blob::{
    BlobError, BlobInfo, BlobStore, BlobWriter, ByteStream, Chunker, DEFAULT_CHUNK_SIZE,
};

const BLOBS_DIR: &str = "blobs";
const STAGING_DIR: &str = "staging";
const DESCRIPTOR: &str = "blob.json";

fn chunk_file(index: u32) -> String {
    format!("{index:08}.chunk")
}

/// Committed blobs by logical name, earliest first.
#[derive(Debug, Default)]
struct NameIndex {
    by_name: DashMap<String, BTreeSet<(DateTime<Utc>, String)>>,
    by_id: DashMap<String, (String, DateTime<Utc>)>,
}

impl NameIndex {
    fn insert(&self, info: &BlobInfo) {
        self.by_id
            .insert(info.id.clone(), (info.name.clone(), info.uploaded_at));
        self.by_name
            .entry(info.name.clone())
            .or_default()
            .insert((info.uploaded_at, info.id.clone()));
    }

    fn remove(&self, id: &str) {
        let Some((_, (name, uploaded_at))) = self.by_id.remove(id) else {
            return;
        };
        if let Some(mut ids) = self.by_name.get_mut(&name) {
            ids.remove(&(uploaded_at, id.to_owned()));
        }
        self.by_name.remove_if(&name, |_, ids| ids.is_empty());
    }

    fn candidates(&self, name: &str) -> Vec<String> {
        self.by_name
            .get(name)
            .map(|ids| ids.iter().map(|(_, id)| id.clone()).collect())
            .unwrap_or_default()
    }
}

/// Blob store that keeps each blob as a directory of chunk files.
///
/// Name lookups are served from an in-process index rebuilt from the
/// descriptors on [`FsBlobStore::open`].
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    blobs: PathBuf,
    staging: PathBuf,
    chunk_size: usize,
    names: Arc<NameIndex>,
}

impl FsBlobStore {
    /// Open (or create) a store rooted at `root` with the default chunk size.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        Self::open_with_chunk_size(root, DEFAULT_CHUNK_SIZE).await
    }

    /// Open (or create) a store rooted at `root`.
    ///
    /// Any staging directories left by an earlier process are removed.
    pub async fn open_with_chunk_size(
        root: impl AsRef<Path>,
        chunk_size: usize,
    ) -> Result<Self, BlobError> {
        let root = root.as_ref();
        let blobs = root.join(BLOBS_DIR);
        let staging = root.join(STAGING_DIR);
        tokio::fs::create_dir_all(&blobs).await?;
        tokio::fs::create_dir_all(&staging).await?;

        let mut purged = 0usize;
        let mut entries = tokio::fs::read_dir(&staging).await?;
        while let Some(entry) = entries.next_entry().await? {
            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => purged += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to purge staged blob"),
            }
        }
        if purged > 0 {
            info!(purged, "purged abandoned staged blobs");
        }

        let names = Arc::new(NameIndex::default());
        let mut entries = tokio::fs::read_dir(&blobs).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match read_descriptor(&path).await {
                Ok(Some(info)) => names.insert(&info),
                Ok(None) => warn!(path = %path.display(), "blob directory without descriptor"),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable blob descriptor"),
            }
        }
        debug!(blobs = names.by_id.len(), "indexed committed blobs");

        Ok(Self {
            blobs,
            staging,
            chunk_size: chunk_size.max(1),
            names,
        })
    }

    fn blob_dir(&self, id: &str) -> Result<PathBuf, BlobError> {
        uuid::Uuid::parse_str(id).map_err(|_| BlobError::InvalidId(id.to_owned()))?;
        Ok(self.blobs.join(id))
    }
}

async fn read_descriptor(dir: &Path) -> Result<Option<BlobInfo>, BlobError> {
    match tokio::fs::read(dir.join(DESCRIPTOR)).await {
        Ok(raw) => serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| BlobError::Storage(format!("corrupt descriptor in {}: {e}", dir.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn begin_write(
        &self,
        name: &str,
        content_type: &str,
    ) -> Result<Box<dyn BlobWriter>, BlobError> {
        let id = uuid::Uuid::now_v7().to_string();
        let staging_dir = self.staging.join(&id);
        tokio::fs::create_dir(&staging_dir).await?;
        debug!(id = %id, name, "staging blob");

        Ok(Box::new(FsBlobWriter {
            final_dir: self.blobs.join(&id),
            staging_dir,
            id,
            name: name.to_owned(),
            content_type: content_type.to_owned(),
            chunker: Some(Chunker::new(self.chunk_size)),
            next_chunk: 0,
            settled: false,
            names: Arc::clone(&self.names),
        }))
    }

    async fn open_read(&self, id: &str) -> Result<ByteStream, BlobError> {
        let dir = self.blob_dir(id)?;
        let info = read_descriptor(&dir)
            .await?
            .ok_or_else(|| BlobError::NotFound(id.to_owned()))?;

        let chunks = stream::unfold(0u32, move |index| {
            let dir = dir.clone();
            let count = info.chunk_count;
            async move {
                if index >= count {
                    return None;
                }
                let item = tokio::fs::read(dir.join(chunk_file(index)))
                    .await
                    .map(Bytes::from)
                    .map_err(BlobError::from);
                Some((item, index + 1))
            }
        });
        Ok(Box::pin(chunks))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<BlobInfo>, BlobError> {
        for id in self.names.candidates(name) {
            match read_descriptor(&self.blob_dir(&id)?).await {
                Ok(Some(info)) => return Ok(Some(info)),
                Ok(None) => {
                    warn!(id = %id, name, "indexed blob vanished from disk");
                    self.names.remove(&id);
                }
                Err(e) => warn!(id = %id, name, error = %e, "skipping unreadable blob descriptor"),
            }
        }
        Ok(None)
    }

    async fn stat(&self, id: &str) -> Result<Option<BlobInfo>, BlobError> {
        read_descriptor(&self.blob_dir(id)?).await
    }

    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        let removed = match tokio::fs::remove_dir_all(self.blob_dir(id)?).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        self.names.remove(id);
        Ok(removed)
    }
}

struct FsBlobWriter {
    id: String,
    name: String,
    content_type: String,
    staging_dir: PathBuf,
    final_dir: PathBuf,
    chunker: Option<Chunker>,
    next_chunk: u32,
    settled: bool,
    names: Arc<NameIndex>,
}

impl FsBlobWriter {
    async fn persist(&mut self, chunk: Bytes) -> Result<(), BlobError> {
        let path = self.staging_dir.join(chunk_file(self.next_chunk));
        tokio::fs::write(path, &chunk).await?;
        self.next_chunk += 1;
        Ok(())
    }

    fn chunker(&mut self) -> Result<&mut Chunker, BlobError> {
        self.chunker
            .as_mut()
            .ok_or_else(|| BlobError::Storage(format!("writer for {} already finished", self.id)))
    }
}

#[async_trait]
impl BlobWriter for FsBlobWriter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn write(&mut self, data: Bytes) -> Result<(), BlobError> {
        let ready = self.chunker()?.push(&data);
        for chunk in ready {
            self.persist(chunk).await?;
        }
        Ok(())
    }

    async fn finish(mut self: Box<Self>) -> Result<BlobInfo, BlobError> {
        let chunker = self
            .chunker
            .take()
            .ok_or_else(|| BlobError::Storage(format!("writer for {} already finished", self.id)))?;
        #[allow(clippy::cast_possible_truncation)]
        let chunk_size = chunker.chunk_size() as u32;
        let (tail, summary) = chunker.finish();
        if let Some(tail) = tail {
            self.persist(tail).await?;
        }

        let info = BlobInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            length: summary.length,
            chunk_size,
            chunk_count: summary.chunk_count,
            checksum_sha256: summary.checksum_sha256,
            uploaded_at: Utc::now(),
        };
        let descriptor =
            serde_json::to_vec(&info).map_err(|e| BlobError::Storage(e.to_string()))?;
        tokio::fs::write(self.staging_dir.join(DESCRIPTOR), descriptor).await?;
        tokio::fs::rename(&self.staging_dir, &self.final_dir).await?;
        self.settled = true;
        self.names.insert(&info);
        debug!(id = %info.id, length = info.length, "committed blob");
        Ok(info)
    }

    async fn abort(mut self: Box<Self>) -> Result<(), BlobError> {
        self.settled = true;
        match tokio::fs::remove_dir_all(&self.staging_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn discard_staging(id: &str, dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir)
        && e.kind() != ErrorKind::NotFound
    {
        warn!(id, error = %e, "failed to discard staged blob");
    }
}

// Last resort for writers that were neither finished nor aborted.
impl Drop for FsBlobWriter {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = std::mem::take(&mut self.id);
        let dir = std::mem::take(&mut self.staging_dir);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || discard_staging(&id, &dir));
            }
            Err(_) => discard_staging(&id, &dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use depot_blob::collect_bytes;
    use depot_blob::testing::run_blob_store_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        run_blob_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn conformance_with_small_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open_with_chunk_size(dir.path(), 4096)
            .await
            .unwrap();
        run_blob_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }

    #[tokio::test]
    async fn reopen_purges_staging_and_keeps_committed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        let mut w = store.begin_write("keep.txt", "text/plain").await.unwrap();
        w.write(Bytes::from_static(b"kept")).await.unwrap();
        let kept = w.finish().await.unwrap();

        // Simulate a crash mid-write: leave a staging directory behind.
        let orphan = dir.path().join(STAGING_DIR).join("leftover");
        std::fs::create_dir_all(&orphan).unwrap();
        std::fs::write(orphan.join(chunk_file(0)), b"partial").unwrap();

        let reopened = FsBlobStore::open(dir.path()).await.unwrap();
        assert!(!orphan.exists());
        let body = collect_bytes(reopened.open_read(&kept.id).await.unwrap())
            .await
            .unwrap();
        assert_eq!(body, Bytes::from_static(b"kept"));
    }

    #[tokio::test]
    async fn rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.delete("../staging").await,
            Err(BlobError::InvalidId(_))
        ));
        assert!(matches!(
            store.open_read("../../etc").await,
            Err(BlobError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn chunk_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open_with_chunk_size(dir.path(), 3).await.unwrap();
        let mut w = store.begin_write("c.bin", "application/zip").await.unwrap();
        w.write(Bytes::from_static(b"abcdefg")).await.unwrap();
        let info = w.finish().await.unwrap();
        assert_eq!(info.chunk_count, 3);

        let blob_dir = dir.path().join(BLOBS_DIR).join(&info.id);
        assert!(blob_dir.join(DESCRIPTOR).exists());
        assert_eq!(std::fs::read(blob_dir.join(chunk_file(2))).unwrap(), b"g");
    }

    async fn put(store: &FsBlobStore, name: &str, body: &'static [u8]) -> BlobInfo {
        let mut w = store.begin_write(name, "text/plain").await.unwrap();
        w.write(Bytes::from_static(body)).await.unwrap();
        w.finish().await.unwrap()
    }

    #[tokio::test]
    async fn corrupt_sibling_descriptor_does_not_hide_other_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let good = put(&store, "good.txt", b"good").await;
        let other = put(&store, "other.txt", b"other").await;

        let other_descriptor = dir.path().join(BLOBS_DIR).join(&other.id).join(DESCRIPTOR);
        std::fs::write(&other_descriptor, b"{trunc").unwrap();

        let found = store.find_by_name("good.txt").await.unwrap().unwrap();
        assert_eq!(found.id, good.id);
        assert!(store.find_by_name("other.txt").await.unwrap().is_none());

        let reopened = FsBlobStore::open(dir.path()).await.unwrap();
        let found = reopened.find_by_name("good.txt").await.unwrap().unwrap();
        assert_eq!(found.id, good.id);
        let body = collect_bytes(reopened.open_read(&good.id).await.unwrap())
            .await
            .unwrap();
        assert_eq!(body, Bytes::from_static(b"good"));
    }

    #[tokio::test]
    async fn reopen_rebuilds_name_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let first = put(&store, "same.txt", b"one").await;
        let second = put(&store, "same.txt", b"two").await;
        drop(store);

        let reopened = FsBlobStore::open(dir.path()).await.unwrap();
        let found = reopened.find_by_name("same.txt").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);

        reopened.delete(&first.id).await.unwrap();
        let found = reopened.find_by_name("same.txt").await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn blob_removed_behind_the_store_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let info = put(&store, "gone.txt", b"gone").await;
        std::fs::remove_dir_all(dir.path().join(BLOBS_DIR).join(&info.id)).unwrap();

        assert!(store.find_by_name("gone.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_writer_cleans_staging_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let staged = {
            let mut w = store.begin_write("dropped.txt", "text/plain").await.unwrap();
            w.write(Bytes::from_static(b"partial")).await.unwrap();
            dir.path().join(STAGING_DIR).join(w.id())
        };

        for _ in 0..100 {
            if !staged.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!staged.exists());
        assert!(store.find_by_name("dropped.txt").await.unwrap().is_none());
    }
}
