use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use depot_service::ServiceError;

use crate::api::schemas::ErrorResponse;

/// Errors that can occur when running the Depot server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was malformed before it reached the file service.
    #[error("{0}")]
    BadRequest(String),

    /// A response could not be assembled.
    #[error("http error: {0}")]
    Http(#[from] axum::http::Error),

    /// A file service error surfaced through the API.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            Self::Service(ServiceError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }
            Self::Service(e @ ServiceError::NotInlineable(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string(), None)
            }
            Self::Service(e @ ServiceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, e.to_string(), None)
            }
            Self::Service(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
                Some(e.to_string()),
            ),
            Self::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
                Some(msg.clone()),
            ),
            Self::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
                Some(e.to_string()),
            ),
            Self::Http(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
                Some(e.to_string()),
            ),
        };

        if let Some(ref detail) = detail {
            error!(error = %detail, "request failed");
        }

        let body = ErrorResponse {
            success: false,
            message,
            error: detail,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use depot_blob::BlobError;

    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (ServerError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Validation("x".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::NotInlineable("application/zip".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::NotFound("a.png".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Blob(BlobError::Storage("disk".into())).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServerError::Config("bad".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
