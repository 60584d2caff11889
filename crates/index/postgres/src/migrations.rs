use sqlx::PgPool;

/// Create the files table and its indexes if they do not already exist.
pub async fn run_migrations(pool: &PgPool, prefix: &str) -> Result<(), sqlx::Error> {
    let table = format!("{prefix}files");

    let create_table = format!(
        "
        CREATE TABLE IF NOT EXISTS {table} (
            filename        TEXT PRIMARY KEY,
            id              TEXT NOT NULL,
            original_name   TEXT NOT NULL,
            mimetype        TEXT NOT NULL,
            size            BIGINT NOT NULL,
            size_formatted  TEXT NOT NULL,
            extension       TEXT NOT NULL,
            path            TEXT NOT NULL,
            uploader        TEXT NOT NULL,
            description     TEXT,
            tags            TEXT[] NOT NULL DEFAULT '{{}}',
            is_public       BOOLEAN NOT NULL DEFAULT TRUE,
            download_count  BIGINT NOT NULL DEFAULT 0,
            uploaded_at     TIMESTAMPTZ NOT NULL,
            blob_id         TEXT NOT NULL
        )
        "
    );

    sqlx::query(&create_table).execute(pool).await?;

    let indexes = [
        format!("CREATE INDEX IF NOT EXISTS idx_{prefix}files_uploader ON {table} (uploader)"),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}files_uploaded_at ON {table} (uploaded_at DESC)"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{prefix}files_mimetype ON {table} (mimetype)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{prefix}files_extension ON {table} (extension)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{prefix}files_tags ON {table} USING GIN (tags)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{prefix}files_public ON {table} (is_public)"),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{prefix}files_downloads ON {table} (download_count DESC)"
        ),
    ];

    for idx in &indexes {
        sqlx::query(idx).execute(pool).await?;
    }

    Ok(())
}
