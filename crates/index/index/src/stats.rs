use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use depot_core::{
    FileQuery, FileRecord, FileStats, OverallStats, PopularFile, SortField, SortOrder,
    TypeBreakdown,
};

use crate::error::IndexError;
use crate::store::MetadataIndex;

/// Trait for statistics backends.
///
/// Implementations may aggregate natively (e.g. SQL `GROUP BY`) or fall
/// back to [`InMemoryStats`] over raw records.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Compute totals, the per-type breakdown and the `top_n` most
    /// downloaded files across every record, public or not.
    async fn file_stats(&self, top_n: usize) -> Result<FileStats, IndexError>;
}

/// Statistics computed in memory over any [`MetadataIndex`].
///
/// Fetches every record in batches and groups them explicitly.
pub struct InMemoryStats<I: MetadataIndex + ?Sized> {
    index: Arc<I>,
}

impl<I: MetadataIndex + ?Sized> InMemoryStats<I> {
    /// Create a new in-memory aggregator wrapping an index.
    pub fn new(index: Arc<I>) -> Self {
        Self { index }
    }
}

const BATCH_SIZE: u32 = 1000;

#[async_trait]
impl<I: MetadataIndex + ?Sized + 'static> StatsStore for InMemoryStats<I> {
    async fn file_stats(&self, top_n: usize) -> Result<FileStats, IndexError> {
        let mut records = Vec::new();
        let mut offset = 0u32;

        loop {
            let query = FileQuery {
                sort_by: SortField::Filename,
                sort_order: SortOrder::Asc,
                limit: Some(BATCH_SIZE),
                offset: Some(offset),
                ..Default::default()
            };
            let page = self.index.query(&query).await?;
            let fetched = page.records.len();
            records.extend(page.records);
            #[allow(clippy::cast_possible_truncation)]
            let step = fetched as u32;
            if fetched < BATCH_SIZE as usize || records.len() as u64 >= page.total {
                break;
            }
            offset += step;
        }

        Ok(aggregate(&records, top_n))
    }
}

/// Group a full set of records into [`FileStats`].
pub fn aggregate(records: &[FileRecord], top_n: usize) -> FileStats {
    let total_size: u64 = records.iter().map(|r| r.size).sum();
    let total_downloads: u64 = records.iter().map(|r| r.download_count).sum();
    let overall = OverallStats::from_totals(records.len() as u64, total_size, total_downloads);

    let mut groups: HashMap<&str, (u64, u64)> = HashMap::new();
    for record in records {
        let entry = groups.entry(record.mimetype.as_str()).or_default();
        entry.0 += 1;
        entry.1 += record.size;
    }
    let mut by_type: Vec<TypeBreakdown> = groups
        .into_iter()
        .map(|(mimetype, (count, total_size))| TypeBreakdown {
            mimetype: mimetype.to_owned(),
            count,
            total_size,
        })
        .collect();
    by_type.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.mimetype.cmp(&b.mimetype)));

    let mut ranked: Vec<&FileRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        b.download_count
            .cmp(&a.download_count)
            .then_with(|| b.uploaded_at.cmp(&a.uploaded_at))
    });
    let popular_files = ranked
        .into_iter()
        .take(top_n)
        .map(PopularFile::from)
        .collect();

    FileStats {
        overall,
        by_type,
        popular_files,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn rec(name: &str, mime: &str, size: u64, downloads: u64) -> FileRecord {
        let mut r = FileRecord::new(name, name, mime, size, "bin", "u", "b");
        r.download_count = downloads;
        r
    }

    #[test]
    fn empty_is_all_zero() {
        let stats = aggregate(&[], 5);
        assert_eq!(stats.overall.total_files, 0);
        assert!(stats.by_type.is_empty());
        assert!(stats.popular_files.is_empty());
    }

    #[test]
    fn type_breakdown_ordering() {
        let records = vec![
            rec("a", "text/plain", 1, 0),
            rec("b", "image/png", 2, 0),
            rec("c", "image/png", 3, 0),
            rec("d", "application/pdf", 4, 0),
        ];
        let stats = aggregate(&records, 5);
        let order: Vec<_> = stats.by_type.iter().map(|t| t.mimetype.as_str()).collect();
        assert_eq!(order, ["image/png", "application/pdf", "text/plain"]);
        assert_eq!(stats.by_type[0].total_size, 5);
    }

    #[test]
    fn popular_ties_prefer_newest() {
        let now = Utc::now();
        let mut old = rec("old", "text/plain", 1, 3);
        old.uploaded_at = now - Duration::hours(1);
        let mut new = rec("new", "text/plain", 1, 3);
        new.uploaded_at = now;
        let top = rec("top", "text/plain", 1, 9);

        let stats = aggregate(&[old, new, top], 2);
        let names: Vec<_> = stats
            .popular_files
            .iter()
            .map(|p| p.filename.as_str())
            .collect();
        assert_eq!(names, ["top", "new"]);
    }
}
