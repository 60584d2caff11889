use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use tracing::debug;

use depot_core::parse_tags;
use depot_service::{FileUpload, UploadOptions};

use crate::error::ServerError;

/// The parts of an upload request.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// Files received under the expected field name, in request order.
    pub files: Vec<FileUpload>,
    /// `description` text field.
    pub description: Option<String>,
    /// `tags` text field, comma separated.
    pub tags: Option<String>,
    /// `isPublic` text field.
    pub is_public: Option<String>,
    /// `uploader` text field.
    pub uploader: Option<String>,
}

impl UploadForm {
    /// Record attributes for the files in this form.
    ///
    /// Blank text fields count as absent and only the literal `"false"`
    /// makes a file private.
    pub fn options(&self, default_uploader: &str) -> UploadOptions {
        UploadOptions {
            uploader: non_blank(self.uploader.as_deref())
                .unwrap_or(default_uploader)
                .to_owned(),
            description: non_blank(self.description.as_deref()).map(str::to_owned),
            tags: self.tags.as_deref().map(parse_tags).unwrap_or_default(),
            is_public: self.is_public.as_deref() != Some("false"),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Read every part of a multipart upload.
///
/// File parts must use `file_field`; a file under any other name rejects the
/// whole request. Unknown text fields are ignored.
pub async fn read_upload_form(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<UploadForm, ServerError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().unwrap_or_default().to_owned();

        if let Some(file_name) = field.file_name().map(str::to_owned) {
            if name != file_field {
                return Err(ServerError::BadRequest(format!(
                    "Please use \"{file_field}\" as the field name for file uploads"
                )));
            }
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let data = field.bytes().await.map_err(upload_error)?;
            debug!(field = %name, file = %file_name, size = data.len(), "received file part");
            form.files.push(FileUpload::new(file_name, content_type, data));
            continue;
        }

        let slot = match name.as_str() {
            "description" => &mut form.description,
            "tags" => &mut form.tags,
            "isPublic" => &mut form.is_public,
            "uploader" => &mut form.uploader,
            _ => continue,
        };
        *slot = Some(field.text().await.map_err(upload_error)?);
    }
    Ok(form)
}

fn upload_error(e: MultipartError) -> ServerError {
    ServerError::BadRequest(format!("File upload error: {}", e.body_text()))
}
