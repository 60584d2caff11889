pub mod files;
pub mod health;
pub mod multipart;
pub mod openapi;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use depot_core::UploadPolicy;
use depot_service::FileService;

use self::openapi::ApiDoc;

/// Room for multipart framing and text fields on top of the file payloads.
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The file service.
    pub files: FileService,
    /// Uploader recorded when a request does not name one.
    pub default_uploader: Arc<str>,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
}

impl AppState {
    /// State with a body limit sized for `files`' upload policy.
    pub fn new(files: FileService, default_uploader: impl Into<Arc<str>>) -> Self {
        let body_limit = default_body_limit(files.policy());
        Self {
            files,
            default_uploader: default_uploader.into(),
            body_limit,
        }
    }
}

/// Body limit that admits a full multi-file upload.
///
/// One extra file's worth of room is allowed so that an oversize file in a
/// batch is reported per file instead of failing the whole request.
pub fn default_body_limit(policy: &UploadPolicy) -> usize {
    let per_file = usize::try_from(policy.max_file_size).unwrap_or(usize::MAX);
    per_file
        .saturating_mul(policy.max_files.saturating_add(1))
        .saturating_add(BODY_OVERHEAD)
}

/// Build the Axum router with all API routes, middleware, and Swagger UI.
pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/api/files", get(files::list_files))
        .route("/api/files/upload", post(files::upload_file))
        .route("/api/files/upload-multiple", post(files::upload_multiple))
        .route("/api/files/stats", get(files::file_stats))
        .route("/api/files/metadata/{filename}", get(files::file_metadata))
        .route("/api/files/download/{filename}", get(files::download_file))
        .route("/api/files/view/{filename}", get(files::view_file))
        .route("/api/files/{filename}", delete(files::delete_file))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
