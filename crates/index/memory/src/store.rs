use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use depot_core::{FilePage, FileQuery, FileRecord};
use depot_index::{IndexError, MetadataIndex};

/// In-memory metadata index backed by a concurrent hash map keyed by
/// generated file name.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    records: DashMap<String, FileRecord>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataIndex for MemoryIndex {
    async fn insert(&self, record: FileRecord) -> Result<(), IndexError> {
        match self.records.entry(record.filename.clone()) {
            Entry::Occupied(_) => Err(IndexError::Duplicate(record.filename)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, filename: &str) -> Result<Option<FileRecord>, IndexError> {
        Ok(self.records.get(filename).map(|r| r.value().clone()))
    }

    async fn delete(&self, filename: &str) -> Result<bool, IndexError> {
        Ok(self.records.remove(filename).is_some())
    }

    async fn increment_downloads(&self, filename: &str) -> Result<Option<u64>, IndexError> {
        Ok(self.records.get_mut(filename).map(|mut r| {
            r.download_count += 1;
            r.download_count
        }))
    }

    async fn query(&self, query: &FileQuery) -> Result<FilePage, IndexError> {
        let limit = query.effective_limit();
        let offset = query.effective_offset();

        let mut matched: Vec<FileRecord> = self
            .records
            .iter()
            .filter(|r| query.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        let total = matched.len() as u64;

        query.sort(&mut matched);
        let records = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(FilePage {
            records,
            total,
            limit,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use depot_index::testing::run_index_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let index = Arc::new(MemoryIndex::new());
        run_index_conformance_tests(&index)
            .await
            .expect("conformance tests should pass");
        assert!(index.is_empty(), "suite cleans up after itself");
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let index = Arc::new(MemoryIndex::new());
        index
            .insert(FileRecord::new("hot.png", "hot.png", "image/png", 1, "png", "u", "b"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let index = Arc::clone(&index);
            handles.push(tokio::spawn(async move {
                index.increment_downloads("hot.png").await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let rec = index.get("hot.png").await.unwrap().unwrap();
        assert_eq!(rec.download_count, 50);
    }
}
