use chrono::{Duration, Utc};

use depot_core::{FileQuery, FileRecord, SortField, SortOrder};

use crate::error::IndexError;
use crate::stats::{InMemoryStats, StatsStore};
use crate::store::MetadataIndex;

fn record(filename: &str, original: &str, mimetype: &str, size: u64) -> FileRecord {
    let ext = original.rsplit('.').next().unwrap_or_default().to_owned();
    FileRecord::new(
        filename,
        original,
        mimetype,
        size,
        ext,
        "tester",
        format!("blob-{filename}"),
    )
}

/// Run the full metadata index conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty index.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_index_conformance_tests<I>(index: &std::sync::Arc<I>) -> Result<(), IndexError>
where
    I: MetadataIndex + 'static,
{
    test_get_missing(index.as_ref()).await?;
    test_insert_and_get(index.as_ref()).await?;
    test_duplicate_insert(index.as_ref()).await?;
    test_increment(index.as_ref()).await?;
    test_delete(index.as_ref()).await?;
    test_query_filters(index.as_ref()).await?;
    test_query_sort_and_paginate(index.as_ref()).await?;
    test_stats(index).await?;
    Ok(())
}

async fn test_get_missing(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    assert!(index.get("missing").await?.is_none());
    assert!(!index.delete("missing").await?);
    assert_eq!(index.increment_downloads("missing").await?, None);
    Ok(())
}

async fn test_insert_and_get(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    let rec = record("100-aa.png", "photo.png", "image/png", 500_000)
        .with_description(Some("A holiday photo".into()))
        .with_tags(vec!["travel".into(), "beach".into()]);
    index.insert(rec.clone()).await?;

    let fetched = index.get("100-aa.png").await?.expect("record inserted");
    assert_eq!(fetched.id, rec.id);
    assert_eq!(fetched.original_name, "photo.png");
    assert_eq!(fetched.size_formatted, "488.28 KB");
    assert_eq!(fetched.description.as_deref(), Some("A holiday photo"));
    assert_eq!(fetched.tags, rec.tags);
    assert_eq!(fetched.blob_id, rec.blob_id);
    assert!(fetched.is_public);

    index.delete("100-aa.png").await?;
    Ok(())
}

async fn test_duplicate_insert(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    index
        .insert(record("dup.txt", "a.txt", "text/plain", 1))
        .await?;
    let err = index
        .insert(record("dup.txt", "b.txt", "text/plain", 2))
        .await;
    assert!(
        matches!(err, Err(IndexError::Duplicate(_))),
        "second insert under the same name should be rejected"
    );
    index.delete("dup.txt").await?;
    Ok(())
}

async fn test_increment(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    index
        .insert(record("count.pdf", "c.pdf", "application/pdf", 10))
        .await?;
    for expected in 1..=3 {
        assert_eq!(index.increment_downloads("count.pdf").await?, Some(expected));
    }
    let fetched = index.get("count.pdf").await?.expect("record present");
    assert_eq!(fetched.download_count, 3);
    index.delete("count.pdf").await?;
    Ok(())
}

async fn test_delete(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    index
        .insert(record("gone.zip", "g.zip", "application/zip", 5))
        .await?;
    assert!(index.delete("gone.zip").await?);
    assert!(index.get("gone.zip").await?.is_none());
    assert!(!index.delete("gone.zip").await?);
    Ok(())
}

async fn seed(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    let now = Utc::now();
    let rows = [
        ("q1.png", "Sunset.png", "image/png", 300, "alice", true, 0),
        ("q2.pdf", "report.pdf", "application/pdf", 100, "bob", true, 1),
        ("q3.png", "cat.png", "image/png", 200, "alice", false, 2),
        ("q4.txt", "notes.txt", "text/plain", 50, "carol", true, 3),
    ];
    for (name, original, mime, size, uploader, public, age) in rows {
        let mut rec = record(name, original, mime, size).with_public(public);
        rec.uploader = uploader.to_owned();
        rec.uploaded_at = now - Duration::minutes(age);
        if name == "q4.txt" {
            rec.description = Some("Meeting SUNSET notes".into());
            rec.tags = vec!["work".into()];
        }
        index.insert(rec).await?;
    }
    Ok(())
}

async fn unseed(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    for name in ["q1.png", "q2.pdf", "q3.png", "q4.txt"] {
        index.delete(name).await?;
    }
    Ok(())
}

fn names(page: &depot_core::FilePage) -> Vec<&str> {
    page.records.iter().map(|r| r.filename.as_str()).collect()
}

async fn test_query_filters(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    seed(index).await?;

    let page = index
        .query(&FileQuery {
            search: Some("sunset".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.total, 2, "search covers original name and description");

    let page = index
        .query(&FileQuery {
            mimetype: Some("image/png".into()),
            is_public: Some(true),
            ..Default::default()
        })
        .await?;
    assert_eq!(names(&page), ["q1.png"]);

    let page = index
        .query(&FileQuery {
            uploader: Some("alice".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.total, 2);

    let page = index
        .query(&FileQuery {
            extension: Some("pdf".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(names(&page), ["q2.pdf"]);

    let page = index
        .query(&FileQuery {
            tag: Some("work".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(names(&page), ["q4.txt"]);

    let page = index
        .query(&FileQuery {
            search: Some("100%_".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.total, 0, "wildcards in search are literal");

    unseed(index).await
}

async fn test_query_sort_and_paginate(index: &dyn MetadataIndex) -> Result<(), IndexError> {
    seed(index).await?;

    let page = index.query(&FileQuery::default()).await?;
    assert_eq!(
        names(&page),
        ["q1.png", "q2.pdf", "q3.png", "q4.txt"],
        "default order is newest first"
    );

    let page = index
        .query(&FileQuery {
            sort_by: SortField::Size,
            sort_order: SortOrder::Asc,
            limit: Some(2),
            offset: Some(1),
            ..Default::default()
        })
        .await?;
    assert_eq!(page.total, 4);
    assert_eq!(page.limit, 2);
    assert_eq!(page.offset, 1);
    assert_eq!(names(&page), ["q2.pdf", "q3.png"]);

    let page = index
        .query(&FileQuery {
            sort_by: SortField::Filename,
            sort_order: SortOrder::Desc,
            limit: Some(1),
            ..Default::default()
        })
        .await?;
    assert_eq!(names(&page), ["q4.txt"]);

    let page = index
        .query(&FileQuery {
            offset: Some(10),
            ..Default::default()
        })
        .await?;
    assert!(page.records.is_empty());
    assert_eq!(page.total, 4);

    unseed(index).await
}

async fn test_stats<I>(index: &std::sync::Arc<I>) -> Result<(), IndexError>
where
    I: MetadataIndex + 'static,
{
    let stats: std::sync::Arc<dyn StatsStore> = match index.stats() {
        Some(native) => native,
        None => std::sync::Arc::new(InMemoryStats::new(std::sync::Arc::clone(index))),
    };

    let empty = stats.file_stats(5).await?;
    assert_eq!(empty.overall.total_files, 0);
    assert!(empty.overall.average_size.abs() < f64::EPSILON);

    seed(index.as_ref()).await?;
    index.increment_downloads("q2.pdf").await?;
    index.increment_downloads("q2.pdf").await?;
    index.increment_downloads("q3.png").await?;

    let result = stats.file_stats(2).await?;
    assert_eq!(result.overall.total_files, 4, "private files are counted");
    assert_eq!(result.overall.total_size, 650);
    assert_eq!(result.overall.total_downloads, 3);
    assert!((result.overall.average_size - 162.5).abs() < 1e-9);

    assert_eq!(result.by_type[0].mimetype, "image/png");
    assert_eq!(result.by_type[0].count, 2);
    assert_eq!(result.by_type[0].total_size, 500);
    assert_eq!(result.by_type[1].mimetype, "application/pdf");
    assert_eq!(result.by_type[2].mimetype, "text/plain");

    let popular: Vec<_> = result
        .popular_files
        .iter()
        .map(|p| p.filename.as_str())
        .collect();
    assert_eq!(popular, ["q2.pdf", "q3.png"]);

    unseed(index.as_ref()).await
}
