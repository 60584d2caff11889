use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::FileRecord;
use crate::size::{format_kilobytes, format_megabytes};

/// Number of entries in the most-downloaded list by default.
pub const DEFAULT_POPULAR_LIMIT: usize = 5;

/// Totals across every indexed file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    /// Number of files.
    pub total_files: u64,
    /// Sum of file sizes in bytes.
    pub total_size: u64,
    /// Mean file size in bytes (0 when empty).
    pub average_size: f64,
    /// Sum of download counters.
    pub total_downloads: u64,
    /// `total_size` in megabytes, unrounded.
    pub total_size_formatted: String,
    /// `average_size` in kilobytes, unrounded.
    pub average_size_formatted: String,
}

impl OverallStats {
    /// Derive the average and renderings from raw totals.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_totals(total_files: u64, total_size: u64, total_downloads: u64) -> Self {
        let average_size = if total_files == 0 {
            0.0
        } else {
            total_size as f64 / total_files as f64
        };
        Self {
            total_files,
            total_size,
            average_size,
            total_downloads,
            total_size_formatted: format_megabytes(total_size),
            average_size_formatted: format_kilobytes(average_size),
        }
    }
}

/// Count and volume for one MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdown {
    /// The MIME type.
    pub mimetype: String,
    /// Number of files of this type.
    pub count: u64,
    /// Sum of their sizes in bytes.
    pub total_size: u64,
}

/// Summary of a frequently downloaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PopularFile {
    /// Generated name.
    pub filename: String,
    /// Uploader-supplied name.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// MIME type.
    pub mimetype: String,
    /// Size in bytes.
    pub size: u64,
    /// Download counter.
    pub download_count: u64,
    /// Creation time.
    pub uploaded_at: DateTime<Utc>,
}

impl From<&FileRecord> for PopularFile {
    fn from(record: &FileRecord) -> Self {
        Self {
            filename: record.filename.clone(),
            original_name: record.original_name.clone(),
            mimetype: record.mimetype.clone(),
            size: record.size,
            download_count: record.download_count,
            uploaded_at: record.uploaded_at,
        }
    }
}

/// The three statistics rollups served together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    /// Totals.
    pub overall: OverallStats,
    /// Per-MIME-type breakdown, largest count first.
    pub by_type: Vec<TypeBreakdown>,
    /// Most downloaded files.
    pub popular_files: Vec<PopularFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_for_two_files() {
        let overall = OverallStats::from_totals(2, 400, 0);
        assert_eq!(overall.total_files, 2);
        assert_eq!(overall.total_size, 400);
        assert!((overall.average_size - 200.0).abs() < f64::EPSILON);
        assert_eq!(overall.total_downloads, 0);
        assert_eq!(overall.average_size_formatted, "0.1953125 KB");
    }

    #[test]
    fn empty_totals_have_zero_average() {
        let overall = OverallStats::from_totals(0, 0, 0);
        assert!(overall.average_size.abs() < f64::EPSILON);
        assert_eq!(overall.total_size_formatted, "0 MB");
    }

    #[test]
    fn serializes_camel_case() {
        let stats = FileStats {
            overall: OverallStats::from_totals(1, 10, 3),
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["overall"]["totalFiles"], 1);
        assert_eq!(json["overall"]["totalDownloads"], 3);
        assert!(json["byType"].is_array());
        assert!(json["popularFiles"].is_array());
    }
}
