use thiserror::Error;

/// Errors returned by [`DepotClient`](crate::DepotClient).
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the response could not be read.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code.
        status: u16,
        /// Message from the server's error body, or the status text.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The client or a request was misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether the server reported that the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Whether the server rejected the request as invalid.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Http { status: 400, .. })
    }
}
