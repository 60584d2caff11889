use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::FileRecord;

/// Record field a listing can be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Creation time.
    #[default]
    UploadedAt,
    /// Generated name.
    Filename,
    /// Uploader-supplied name.
    #[serde(rename = "originalname")]
    OriginalName,
    /// Byte size.
    Size,
    /// Download counter.
    DownloadCount,
    /// MIME type.
    Mimetype,
    /// Extension.
    Extension,
}

impl SortField {
    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UploadedAt => "uploadedAt",
            Self::Filename => "filename",
            Self::OriginalName => "originalname",
            Self::Size => "size",
            Self::DownloadCount => "downloadCount",
            Self::Mimetype => "mimetype",
            Self::Extension => "extension",
        }
    }

    /// Compare two records on this field (ascending).
    pub fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
        match self {
            Self::UploadedAt => a.uploaded_at.cmp(&b.uploaded_at),
            Self::Filename => a.filename.cmp(&b.filename),
            Self::OriginalName => a.original_name.cmp(&b.original_name),
            Self::Size => a.size.cmp(&b.size),
            Self::DownloadCount => a.download_count.cmp(&b.download_count),
            Self::Mimetype => a.mimetype.cmp(&b.mimetype),
            Self::Extension => a.extension.cmp(&b.extension),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a sort field name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort field: {0}")]
pub struct ParseSortFieldError(pub String);

impl FromStr for SortField {
    type Err = ParseSortFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploadedAt" => Ok(Self::UploadedAt),
            "filename" => Ok(Self::Filename),
            "originalname" => Ok(Self::OriginalName),
            "size" => Ok(Self::Size),
            "downloadCount" => Ok(Self::DownloadCount),
            "mimetype" => Ok(Self::Mimetype),
            "extension" => Ok(Self::Extension),
            other => Err(ParseSortFieldError(other.to_owned())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse a query-string value: `"desc"` sorts descending, anything else
    /// ascending.
    pub fn from_param(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    /// SQL keyword for this direction.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters, ordering and pagination for listing file records.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FileQuery {
    /// Case-insensitive substring matched against the generated name, the
    /// original name and the description.
    pub search: Option<String>,
    /// Exact MIME type.
    pub mimetype: Option<String>,
    /// Exact extension.
    pub extension: Option<String>,
    /// Exact uploader.
    pub uploader: Option<String>,
    /// Only records carrying this tag.
    pub tag: Option<String>,
    /// Only records with this visibility.
    pub is_public: Option<bool>,
    /// Field to order by.
    #[serde(default)]
    pub sort_by: SortField,
    /// Direction to order in.
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Maximum number of records to return (default 20, max 1000).
    pub limit: Option<u32>,
    /// Number of records to skip.
    pub offset: Option<u32>,
}

impl FileQuery {
    /// Return the effective limit, clamped to 1..=1000, defaulting to 20.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, 1000)
    }

    /// Return the effective offset, defaulting to 0.
    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Whether a record passes every filter of this query.
    pub fn matches(&self, record: &FileRecord) -> bool {
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            let hit = record.filename.to_lowercase().contains(&needle)
                || record.original_name.to_lowercase().contains(&needle)
                || record
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if !matches_filter(self.mimetype.as_ref(), &record.mimetype)
            || !matches_filter(self.extension.as_ref(), &record.extension)
            || !matches_filter(self.uploader.as_ref(), &record.uploader)
        {
            return false;
        }
        if let Some(ref tag) = self.tag
            && !record.tags.iter().any(|t| t == tag)
        {
            return false;
        }
        self.is_public.is_none_or(|p| p == record.is_public)
    }

    /// Order records in place according to `sort_by`/`sort_order`.
    ///
    /// Ties are broken by generated name so pages are stable.
    pub fn sort(&self, records: &mut [FileRecord]) {
        records.sort_by(|a, b| {
            let ord = self.sort_by.compare(a, b);
            let ord = match self.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then_with(|| a.filename.cmp(&b.filename))
        });
    }
}

fn matches_filter(filter: Option<&String>, value: &str) -> bool {
    filter.is_none_or(|f| f == value)
}

/// A page of file records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FilePage {
    /// The records on this page.
    pub records: Vec<FileRecord>,
    /// Number of records matching the query before pagination.
    pub total: u64,
    /// The limit used for this page.
    pub limit: u32,
    /// The offset used for this page.
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn rec(name: &str, original: &str, mime: &str, size: u64) -> FileRecord {
        FileRecord::new(name, original, mime, size, "png", "u1", "b")
    }

    #[test]
    fn sort_field_parses_wire_names() {
        for field in [
            SortField::UploadedAt,
            SortField::Filename,
            SortField::OriginalName,
            SortField::Size,
            SortField::DownloadCount,
            SortField::Mimetype,
            SortField::Extension,
        ] {
            assert_eq!(field.as_str().parse::<SortField>().unwrap(), field);
        }
        assert!("password".parse::<SortField>().is_err());
    }

    #[test]
    fn sort_order_defaults_to_ascending_for_unknown() {
        assert_eq!(SortOrder::from_param("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::from_param("DESC"), SortOrder::Desc);
        assert_eq!(SortOrder::from_param("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::from_param("sideways"), SortOrder::Asc);
    }

    #[test]
    fn search_is_case_insensitive_over_three_fields() {
        let mut r = rec("1-aa.png", "Holiday.png", "image/png", 1);
        r.description = Some("Beach SUNSET".into());
        let q = |s: &str| FileQuery {
            search: Some(s.into()),
            ..Default::default()
        };
        assert!(q("holi").matches(&r));
        assert!(q("sunset").matches(&r));
        assert!(q("1-AA").matches(&r));
        assert!(!q("winter").matches(&r));
    }

    #[test]
    fn exact_filters() {
        let mut r = rec("1-aa.png", "a.png", "image/png", 1);
        r.tags = vec!["work".into()];
        r.is_public = false;

        let q = FileQuery {
            mimetype: Some("image/png".into()),
            tag: Some("work".into()),
            is_public: Some(false),
            ..Default::default()
        };
        assert!(q.matches(&r));

        let q = FileQuery {
            mimetype: Some("image/PNG".into()),
            ..Default::default()
        };
        assert!(!q.matches(&r));

        let q = FileQuery {
            is_public: Some(true),
            ..Default::default()
        };
        assert!(!q.matches(&r));
    }

    #[test]
    fn sorting_by_size_and_default_newest_first() {
        let now = Utc::now();
        let mut a = rec("a", "a", "x", 300);
        a.uploaded_at = now - Duration::seconds(10);
        let mut b = rec("b", "b", "x", 100);
        b.uploaded_at = now;
        let mut records = vec![a, b];

        FileQuery::default().sort(&mut records);
        assert_eq!(records[0].filename, "b");

        let q = FileQuery {
            sort_by: SortField::Size,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        q.sort(&mut records);
        assert_eq!(records[0].size, 100);
    }

    #[test]
    fn limit_is_clamped() {
        let q = FileQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(q.effective_limit(), 1);
        assert_eq!(FileQuery::default().effective_limit(), 20);
        assert_eq!(FileQuery::default().effective_offset(), 0);
    }
}
