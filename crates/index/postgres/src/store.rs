use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use depot_core::{FilePage, FileQuery, FileRecord, SortField};
use depot_index::{IndexError, MetadataIndex, StatsStore};

use crate::config::PostgresIndexConfig;
use crate::migrations;
use crate::stats::PostgresStatsStore;

/// Postgres-backed metadata index using `sqlx`.
pub struct PostgresIndex {
    pool: PgPool,
    table: String,
}

impl PostgresIndex {
    /// Create a new index, connecting to Postgres and running migrations.
    pub async fn new(config: &PostgresIndexConfig) -> Result<Self, IndexError> {
        let pool = PgPool::connect(&config.url)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;
        Self::from_pool(pool, &config.prefix).await
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: PgPool, prefix: &str) -> Result<Self, IndexError> {
        migrations::run_migrations(&pool, prefix)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;
        info!(table = %format!("{prefix}files"), "postgres index ready");

        Ok(Self {
            pool,
            table: format!("{prefix}files"),
        })
    }
}

#[async_trait]
impl MetadataIndex for PostgresIndex {
    async fn insert(&self, record: FileRecord) -> Result<(), IndexError> {
        let sql = format!(
            r"
            INSERT INTO {} (
                filename, id, original_name, mimetype, size, size_formatted,
                extension, path, uploader, description, tags, is_public,
                download_count, uploaded_at, blob_id
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10, $11, $12,
                $13, $14, $15
            )
            ",
            self.table
        );

        #[allow(clippy::cast_possible_wrap)]
        let size = record.size as i64;
        #[allow(clippy::cast_possible_wrap)]
        let download_count = record.download_count as i64;

        sqlx::query(&sql)
            .bind(&record.filename)
            .bind(&record.id)
            .bind(&record.original_name)
            .bind(&record.mimetype)
            .bind(size)
            .bind(&record.size_formatted)
            .bind(&record.extension)
            .bind(&record.path)
            .bind(&record.uploader)
            .bind(&record.description)
            .bind(&record.tags)
            .bind(record.is_public)
            .bind(download_count)
            .bind(record.uploaded_at)
            .bind(&record.blob_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    IndexError::Duplicate(record.filename.clone())
                }
                other => IndexError::Storage(other.to_string()),
            })?;

        Ok(())
    }

    async fn get(&self, filename: &str) -> Result<Option<FileRecord>, IndexError> {
        let sql = format!("SELECT * FROM {} WHERE filename = $1", self.table);

        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn delete(&self, filename: &str) -> Result<bool, IndexError> {
        let sql = format!("DELETE FROM {} WHERE filename = $1", self.table);

        let result = sqlx::query(&sql)
            .bind(filename)
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_downloads(&self, filename: &str) -> Result<Option<u64>, IndexError> {
        let sql = format!(
            "UPDATE {} SET download_count = download_count + 1 WHERE filename = $1 RETURNING download_count",
            self.table
        );

        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;

        #[allow(clippy::cast_sign_loss)]
        Ok(count.map(|c| c as u64))
    }

    async fn query(&self, query: &FileQuery) -> Result<FilePage, IndexError> {
        let limit = query.effective_limit();
        let offset = query.effective_offset();
        let (where_clause, binds, bind_idx) = build_where_clause(query);

        // Count query.
        let count_sql = format!("SELECT COUNT(*) as cnt FROM {} {where_clause}", self.table);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for b in &binds {
            count_q = count_q.bind(b);
        }
        let total = count_q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;

        // Data query.
        let limit_idx = bind_idx;
        let offset_idx = bind_idx + 1;
        let data_sql = format!(
            "SELECT * FROM {} {where_clause} ORDER BY {} {}, filename ASC LIMIT ${limit_idx} OFFSET ${offset_idx}",
            self.table,
            sort_column(query.sort_by),
            query.sort_order.as_sql(),
        );
        let mut data_q = sqlx::query_as::<_, FileRow>(&data_sql);
        for b in &binds {
            data_q = data_q.bind(b);
        }
        data_q = data_q.bind(i64::from(limit));
        data_q = data_q.bind(i64::from(offset));

        let rows: Vec<FileRow> = data_q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(e.to_string()))?;

        #[allow(clippy::cast_sign_loss)]
        let total = total as u64;

        Ok(FilePage {
            records: rows.into_iter().map(Into::into).collect(),
            total,
            limit,
            offset,
        })
    }

    fn stats(&self) -> Option<Arc<dyn StatsStore>> {
        Some(Arc::new(PostgresStatsStore::new(
            self.pool.clone(),
            self.table.clone(),
        )))
    }

    async fn close(&self) -> Result<(), IndexError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Column backing each sortable field.
fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::UploadedAt => "uploaded_at",
        SortField::Filename => "filename",
        SortField::OriginalName => "original_name",
        SortField::Size => "size",
        SortField::DownloadCount => "download_count",
        SortField::Mimetype => "mimetype",
        SortField::Extension => "extension",
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build the WHERE clause and text bind values for the query.
///
/// Returns `(clause, binds, next_bind_idx)`.
fn build_where_clause(query: &FileQuery) -> (String, Vec<String>, u32) {
    let mut conditions = Vec::new();
    let mut bind_idx = 1u32;
    let mut binds: Vec<String> = Vec::new();

    if let Some(ref search) = query.search {
        conditions.push(format!(
            r"(filename ILIKE ${bind_idx} ESCAPE '\' OR original_name ILIKE ${bind_idx} ESCAPE '\' OR COALESCE(description, '') ILIKE ${bind_idx} ESCAPE '\')"
        ));
        binds.push(format!("%{}%", escape_like(search)));
        bind_idx += 1;
    }

    let fields: &[(&Option<String>, &str)] = &[
        (&query.mimetype, "mimetype"),
        (&query.extension, "extension"),
        (&query.uploader, "uploader"),
    ];

    for (value, col) in fields {
        if let Some(v) = value {
            conditions.push(format!("{col} = ${bind_idx}"));
            binds.push(v.clone());
            bind_idx += 1;
        }
    }

    if let Some(ref tag) = query.tag {
        conditions.push(format!("${bind_idx} = ANY(tags)"));
        binds.push(tag.clone());
        bind_idx += 1;
    }

    if let Some(is_public) = query.is_public {
        conditions.push(format!("is_public = ${bind_idx}::BOOLEAN"));
        binds.push(is_public.to_string());
        bind_idx += 1;
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, binds, bind_idx)
}

/// Internal row type for mapping database rows to `FileRecord`.
#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    filename: String,
    id: String,
    original_name: String,
    mimetype: String,
    size: i64,
    size_formatted: String,
    extension: String,
    path: String,
    uploader: String,
    description: Option<String>,
    tags: Vec<String>,
    is_public: bool,
    download_count: i64,
    uploaded_at: chrono::DateTime<chrono::Utc>,
    blob_id: String,
}

impl From<FileRow> for FileRecord {
    #[allow(clippy::cast_sign_loss)]
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            original_name: row.original_name,
            mimetype: row.mimetype,
            size: row.size as u64,
            size_formatted: row.size_formatted,
            extension: row.extension,
            path: row.path,
            uploader: row.uploader,
            description: row.description,
            tags: row.tags,
            is_public: row.is_public,
            download_count: row.download_count as u64,
            uploaded_at: row.uploaded_at,
            blob_id: row.blob_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use depot_core::SortOrder;

    use super::*;

    #[test]
    fn empty_query_has_no_where() {
        let (clause, binds, next) = build_where_clause(&FileQuery::default());
        assert!(clause.is_empty());
        assert!(binds.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn filters_are_numbered_in_order() {
        let query = FileQuery {
            search: Some("cat".into()),
            mimetype: Some("image/png".into()),
            uploader: Some("alice".into()),
            tag: Some("pets".into()),
            is_public: Some(true),
            ..Default::default()
        };
        let (clause, binds, next) = build_where_clause(&query);
        assert!(clause.starts_with("WHERE (filename ILIKE $1"));
        assert!(clause.contains("mimetype = $2"));
        assert!(clause.contains("uploader = $3"));
        assert!(clause.contains("$4 = ANY(tags)"));
        assert!(clause.contains("is_public = $5::BOOLEAN"));
        assert_eq!(binds, ["%cat%", "image/png", "alice", "pets", "true"]);
        assert_eq!(next, 6);
    }

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        let query = FileQuery {
            search: Some("50%".into()),
            ..Default::default()
        };
        let (_, binds, _) = build_where_clause(&query);
        assert_eq!(binds, ["%50\\%%"]);
    }

    #[test]
    fn every_sort_field_maps_to_a_column() {
        assert_eq!(sort_column(SortField::OriginalName), "original_name");
        assert_eq!(sort_column(SortField::DownloadCount), "download_count");
        assert_eq!(sort_column(SortField::default()), "uploaded_at");
        assert_eq!(SortOrder::default().as_sql(), "DESC");
    }

    /// Runs against a live database when `DEPOT_TEST_POSTGRES_URL` is set.
    #[tokio::test]
    #[ignore = "requires a running Postgres"]
    async fn conformance() {
        let Ok(url) = std::env::var("DEPOT_TEST_POSTGRES_URL") else {
            return;
        };
        let prefix = format!("t{}_", std::process::id());
        let index = Arc::new(
            PostgresIndex::new(&PostgresIndexConfig::new(url).with_prefix(prefix))
                .await
                .expect("connect"),
        );
        depot_index::testing::run_index_conformance_tests(&index)
            .await
            .expect("conformance tests should pass");
    }
}
