#![allow(clippy::needless_for_each)]

use depot_core::{FileRecord, FileStats, OverallStats, PopularFile, TypeBreakdown};
use depot_service::MetricsSnapshot;

use super::schemas::{
    BatchUploadData, BatchUploadResponse, ErrorResponse, FailedUpload, FileData, HealthResponse,
    ListFilesResponse, MessageResponse, MetadataResponse, MultiUploadForm, SingleUploadForm,
    StatsResponse, UploadResponse,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Depot File API",
        version = "0.1.0",
        description = "HTTP API for the Depot file store. Upload, list, download, view and delete files.",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "Health", description = "Service health and metrics"),
        (name = "Files", description = "File upload, retrieval, listing and deletion")
    ),
    paths(
        super::health::health,
        super::health::metrics,
        super::files::upload_file,
        super::files::upload_multiple,
        super::files::list_files,
        super::files::file_stats,
        super::files::file_metadata,
        super::files::download_file,
        super::files::view_file,
        super::files::delete_file,
    ),
    components(schemas(
        FileRecord,
        FileStats,
        OverallStats,
        TypeBreakdown,
        PopularFile,
        MetricsSnapshot,
        ErrorResponse,
        MessageResponse,
        FileData,
        UploadResponse,
        FailedUpload,
        BatchUploadData,
        BatchUploadResponse,
        ListFilesResponse,
        MetadataResponse,
        StatsResponse,
        HealthResponse,
        SingleUploadForm,
        MultiUploadForm,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use utoipa::OpenApi;

    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/metrics",
            "/api/files",
            "/api/files/upload",
            "/api/files/upload-multiple",
            "/api/files/stats",
            "/api/files/metadata/{filename}",
            "/api/files/download/{filename}",
            "/api/files/view/{filename}",
            "/api/files/{filename}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
