use async_trait::async_trait;
use sqlx::PgPool;

use depot_core::{FileRecord, FileStats, OverallStats, PopularFile, TypeBreakdown};
use depot_index::{IndexError, StatsStore};

use crate::store::FileRow;

/// Statistics computed with `GROUP BY` on the files table.
///
/// Created via the `stats()` method on `PostgresIndex` and shares its pool.
pub struct PostgresStatsStore {
    pool: PgPool,
    table: String,
}

impl PostgresStatsStore {
    /// Create a new `PostgresStatsStore`.
    pub fn new(pool: PgPool, table: String) -> Self {
        Self { pool, table }
    }
}

#[derive(sqlx::FromRow)]
struct TypeRow {
    mimetype: String,
    count: i64,
    total_size: i64,
}

#[async_trait]
impl StatsStore for PostgresStatsStore {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    async fn file_stats(&self, top_n: usize) -> Result<FileStats, IndexError> {
        let overall_sql = format!(
            "SELECT COUNT(*)::BIGINT, COALESCE(SUM(size), 0)::BIGINT, COALESCE(SUM(download_count), 0)::BIGINT FROM {}",
            self.table
        );
        let (files, size, downloads) = sqlx::query_as::<_, (i64, i64, i64)>(&overall_sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;

        let by_type_sql = format!(
            "SELECT mimetype, COUNT(*)::BIGINT AS count, COALESCE(SUM(size), 0)::BIGINT AS total_size \
             FROM {} GROUP BY mimetype ORDER BY count DESC, mimetype ASC",
            self.table
        );
        let by_type = sqlx::query_as::<_, TypeRow>(&by_type_sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?
            .into_iter()
            .map(|row| TypeBreakdown {
                mimetype: row.mimetype,
                count: row.count as u64,
                total_size: row.total_size as u64,
            })
            .collect();

        let popular_sql = format!(
            "SELECT * FROM {} ORDER BY download_count DESC, uploaded_at DESC LIMIT $1",
            self.table
        );
        let popular_files = sqlx::query_as::<_, FileRow>(&popular_sql)
            .bind(top_n as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?
            .into_iter()
            .map(|row| PopularFile::from(&FileRecord::from(row)))
            .collect();

        Ok(FileStats {
            overall: OverallStats::from_totals(files as u64, size as u64, downloads as u64),
            by_type,
            popular_files,
        })
    }
}
