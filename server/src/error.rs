use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{error, warn};
use std::io;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded.")]
    NoFile,

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UploadError {
    /// Client-side problems are warnings; anything the server failed at is an error.
    pub fn log(&self) {
        match self {
            UploadError::Storage(StorageError::Body(e)) => warn!("Upload aborted: {}", e),
            UploadError::Storage(e) => error!("Upload failed: {}", e),
            e => warn!("Upload rejected: {}", e),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::NoFile | UploadError::UnexpectedField(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            UploadError::Multipart(e) => (e.status(), e.body_text()).into_response(),
            UploadError::Storage(StorageError::Body(e)) => body_failure(&e),
            UploadError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// A failure while reading the part body is the client's stream breaking, not
/// the disk. Reuse the multipart parser's own status when it is the cause.
fn body_failure(e: &io::Error) -> Response {
    match e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
    {
        Some(multipart) => (multipart.status(), multipart.body_text()).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            format!("Failed to read upload body: {}", e),
        )
            .into_response(),
    }
}
