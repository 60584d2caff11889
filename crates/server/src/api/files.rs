use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{MultipartRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::info;

use depot_core::{DEFAULT_POPULAR_LIMIT, FileQuery, SortField, SortOrder};
use depot_service::FileDownload;

use super::AppState;
use super::multipart::read_upload_form;
use super::schemas::{
    BatchUploadData, BatchUploadResponse, ErrorResponse, FileData, ListFilesParams,
    ListFilesResponse, MessageResponse, MetadataResponse, MultiUploadForm, SingleUploadForm,
    StatsResponse, UploadResponse,
};
use crate::error::ServerError;

fn accept_multipart(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &str,
) -> Result<Multipart, ServerError> {
    multipart.map_err(|_| {
        ServerError::BadRequest(format!(
            "Please use form-data with \"{file_field}\" as the field name for file uploads"
        ))
    })
}

/// `POST /api/files/upload` -- store one file.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "Files",
    summary = "Upload a file",
    description = "Stores one file sent as multipart form data in the `file` field.",
    request_body(content = SingleUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing file, disallowed type or oversize file", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let multipart = accept_multipart(multipart, "file")?;
    let mut form = read_upload_form(multipart, "file").await?;
    if form.files.len() > 1 {
        return Err(ServerError::BadRequest(
            "Only one file may be sent to this endpoint; use /upload-multiple for more".into(),
        ));
    }
    let options = form.options(&state.default_uploader);
    let Some(file) = form.files.pop() else {
        return Err(ServerError::BadRequest("No file uploaded".into()));
    };

    let uploaded = state.files.upload(file, options).await?;
    let body = UploadResponse {
        success: true,
        message: "File uploaded successfully".into(),
        data: FileData::from(uploaded),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// `POST /api/files/upload-multiple` -- store up to five files at once.
#[utoipa::path(
    post,
    path = "/api/files/upload-multiple",
    tag = "Files",
    summary = "Upload several files",
    description = "Stores each file in the `files` field independently. Files that fail validation or storage are reported in `failed` without affecting the others.",
    request_body(content = MultiUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Batch settled, possibly with per-file failures", body = BatchUploadResponse),
        (status = 400, description = "No files, too many files or a misnamed field", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn upload_multiple(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let multipart = accept_multipart(multipart, "files")?;
    let form = read_upload_form(multipart, "files").await?;
    if form.files.is_empty() {
        return Err(ServerError::BadRequest("No files uploaded".into()));
    }
    let options = form.options(&state.default_uploader);

    let report = state.files.upload_many(form.files, options).await?;
    let mut message = format!("Uploaded {} file(s) successfully", report.successful.len());
    if !report.failed.is_empty() {
        message.push_str(&format!(", {} failed", report.failed.len()));
    }
    let body = BatchUploadResponse {
        success: true,
        message,
        data: BatchUploadData {
            successful: report.successful.into_iter().map(FileData::from).collect(),
            failed: report.failed.into_iter().map(Into::into).collect(),
        },
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// `GET /api/files` -- list public files.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "Files",
    summary = "List files",
    description = "Returns a page of public files matching the filters.",
    params(ListFilesParams),
    responses(
        (status = 200, description = "A page of files", body = ListFilesResponse),
        (status = 400, description = "Invalid query parameter", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    params: Result<Query<ListFilesParams>, QueryRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let query = build_list_query(&params)?;
    let page_number = params.page.unwrap_or(1).max(1);

    let page = state.files.list(&query).await?;
    let limit = u64::from(page.limit);
    let body = ListFilesResponse {
        success: true,
        count: page.records.len(),
        total: page.total,
        total_pages: page.total.div_ceil(limit),
        current_page: page_number,
        data: page.records,
    };
    Ok((StatusCode::OK, Json(body)))
}

/// Translate list parameters into an index query over public files.
pub(crate) fn build_list_query(params: &ListFilesParams) -> Result<FileQuery, ServerError> {
    let sort_by = match params.sort_by.as_deref() {
        Some(raw) => raw
            .parse::<SortField>()
            .map_err(|e| ServerError::BadRequest(format!("Invalid sortBy value: {}", e.0)))?,
        None => SortField::default(),
    };
    let sort_order = params
        .sort_order
        .as_deref()
        .map_or_else(SortOrder::default, SortOrder::from_param);

    let mut query = FileQuery {
        search: params.search.clone().filter(|s| !s.is_empty()),
        mimetype: params.mimetype.clone(),
        extension: params.extension.clone(),
        uploader: params.uploader.clone(),
        tag: params.tag.clone(),
        is_public: Some(true),
        sort_by,
        sort_order,
        limit: params.limit,
        offset: None,
    };
    let limit = query.effective_limit();
    let page = params.page.unwrap_or(1).max(1);
    query.limit = Some(limit);
    query.offset = Some((page - 1).saturating_mul(limit));
    Ok(query)
}

/// `GET /api/files/stats` -- aggregate statistics.
#[utoipa::path(
    get,
    path = "/api/files/stats",
    tag = "Files",
    summary = "File statistics",
    description = "Totals, a per-type breakdown and the most downloaded files, over every stored file.",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 500, description = "Index failure", body = ErrorResponse)
    )
)]
pub async fn file_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    let stats = state.files.stats(DEFAULT_POPULAR_LIMIT).await?;
    Ok((
        StatusCode::OK,
        Json(StatsResponse {
            success: true,
            data: stats,
        }),
    ))
}

/// `GET /api/files/metadata/{filename}` -- one file's record.
#[utoipa::path(
    get,
    path = "/api/files/metadata/{filename}",
    tag = "Files",
    summary = "File metadata",
    params(("filename" = String, Path, description = "Generated file name")),
    responses(
        (status = 200, description = "The record", body = MetadataResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn file_metadata(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let record = state.files.metadata(&filename).await?;
    Ok((
        StatusCode::OK,
        Json(MetadataResponse {
            success: true,
            data: record,
        }),
    ))
}

/// `GET /api/files/download/{filename}` -- stream a file as an attachment.
#[utoipa::path(
    get,
    path = "/api/files/download/{filename}",
    tag = "Files",
    summary = "Download a file",
    description = "Streams the file content with an attachment disposition and counts the download.",
    params(("filename" = String, Path, description = "Generated file name")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    let served = state.files.download(&filename).await?;
    stream_response(served)
}

/// `GET /api/files/view/{filename}` -- stream a file inline.
#[utoipa::path(
    get,
    path = "/api/files/view/{filename}",
    tag = "Files",
    summary = "View a file",
    description = "Streams images, PDF and plain text with an inline disposition. Other types must be downloaded.",
    params(("filename" = String, Path, description = "Generated file name")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 400, description = "File type cannot be viewed inline", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn view_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    let served = state.files.view(&filename).await?;
    stream_response(served)
}

fn stream_response(served: FileDownload) -> Result<Response, ServerError> {
    let disposition = served.content_disposition();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, served.content_type.as_str())
        .header(header::CONTENT_LENGTH, served.content_length.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(served.stream))?;
    Ok(response)
}

/// `DELETE /api/files/{filename}` -- delete a file and its record.
#[utoipa::path(
    delete,
    path = "/api/files/{filename}",
    tag = "Files",
    summary = "Delete a file",
    params(("filename" = String, Path, description = "Generated file name")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    state.files.delete(&filename).await?;
    info!(filename = %filename, "delete request served");
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: "File deleted successfully".into(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults_to_public_newest_first() {
        let query = build_list_query(&ListFilesParams::default()).unwrap();
        assert_eq!(query.is_public, Some(true));
        assert_eq!(query.sort_by, SortField::UploadedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn page_becomes_offset() {
        let params = ListFilesParams {
            page: Some(3),
            limit: Some(10),
            sort_by: Some("size".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        };
        let query = build_list_query(&params).unwrap();
        assert_eq!(query.offset, Some(20));
        assert_eq!(query.sort_by, SortField::Size);
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    #[test]
    fn page_zero_is_first_page() {
        let params = ListFilesParams {
            page: Some(0),
            ..Default::default()
        };
        assert_eq!(build_list_query(&params).unwrap().offset, Some(0));
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let params = ListFilesParams {
            sort_by: Some("password".into()),
            ..Default::default()
        };
        let err = build_list_query(&params).unwrap_err();
        assert_eq!(err.to_string(), "Invalid sortBy value: password");
    }
}
