use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters tracking file service outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    /// Files whose blob and record were both committed.
    pub uploads_committed: AtomicU64,
    /// Files rejected by validation before any write.
    pub uploads_rejected: AtomicU64,
    /// Files whose write failed after validation.
    pub uploads_aborted: AtomicU64,
    /// Compensating blob deletes run after a failed record write.
    pub compensations: AtomicU64,
    /// Blobs left without a record because compensation failed.
    pub orphaned_blobs: AtomicU64,
    /// Attachment downloads served.
    pub downloads: AtomicU64,
    /// Inline views served.
    pub views: AtomicU64,
    /// Files deleted.
    pub deletions: AtomicU64,
    /// Download counter updates that failed.
    pub counter_failures: AtomicU64,
}

impl ServiceMetrics {
    /// Increment the committed uploads counter.
    pub fn increment_uploads_committed(&self) {
        self.uploads_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the rejected uploads counter.
    pub fn increment_uploads_rejected(&self) {
        self.uploads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the aborted uploads counter.
    pub fn increment_uploads_aborted(&self) {
        self.uploads_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the compensations counter.
    pub fn increment_compensations(&self) {
        self.compensations.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the orphaned blobs counter.
    pub fn increment_orphaned_blobs(&self) {
        self.orphaned_blobs.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the downloads counter.
    pub fn increment_downloads(&self) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the views counter.
    pub fn increment_views(&self) {
        self.views.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the deletions counter.
    pub fn increment_deletions(&self) {
        self.deletions.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the failed counter updates counter.
    pub fn increment_counter_failures(&self) {
        self.counter_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_committed: self.uploads_committed.load(Ordering::Relaxed),
            uploads_rejected: self.uploads_rejected.load(Ordering::Relaxed),
            uploads_aborted: self.uploads_aborted.load(Ordering::Relaxed),
            compensations: self.compensations.load(Ordering::Relaxed),
            orphaned_blobs: self.orphaned_blobs.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            views: self.views.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
            counter_failures: self.counter_failures.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`ServiceMetrics`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MetricsSnapshot {
    /// Files whose blob and record were both committed.
    pub uploads_committed: u64,
    /// Files rejected by validation.
    pub uploads_rejected: u64,
    /// Files whose write failed after validation.
    pub uploads_aborted: u64,
    /// Compensating blob deletes.
    pub compensations: u64,
    /// Blobs left without a record.
    pub orphaned_blobs: u64,
    /// Attachment downloads served.
    pub downloads: u64,
    /// Inline views served.
    pub views: u64,
    /// Files deleted.
    pub deletions: u64,
    /// Failed download counter updates.
    pub counter_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = ServiceMetrics::default();
        m.increment_uploads_committed();
        m.increment_uploads_committed();
        m.increment_orphaned_blobs();
        m.increment_views();
        let snap = m.snapshot();
        assert_eq!(snap.uploads_committed, 2);
        assert_eq!(snap.orphaned_blobs, 1);
        assert_eq!(snap.views, 1);
        assert_eq!(snap.downloads, 0);
    }
}
