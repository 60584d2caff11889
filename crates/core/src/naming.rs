use chrono::Utc;
use rand_core::{OsRng, RngCore};

/// Generate a collision-resistant storage name for an uploaded file.
///
/// The name is `<unix millis>-<16 hex chars>.<ext>` where `<ext>` is the text
/// after the last dot of `original_name` (the whole name when it has none).
pub fn generate_unique_filename(original_name: &str) -> String {
    let mut suffix = [0u8; 8];
    OsRng.fill_bytes(&mut suffix);
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        hex::encode(suffix),
        raw_extension(original_name)
    )
}

/// Lowercased extension of a file name.
pub fn file_extension(name: &str) -> String {
    raw_extension(name).to_lowercase()
}

fn raw_extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// MIME type for a known extension, `application/octet-stream` otherwise.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
