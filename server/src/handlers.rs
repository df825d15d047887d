use axum::extract::{
    multipart::{Multipart, MultipartRejection},
    State,
};
use futures::TryStreamExt;
use log::{debug, error, info};
use std::io;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::{
    error::UploadError,
    naming::{sanitize_filename, storage_name},
    state::AppState,
    storage::{StorageError, StoredFile},
};

/// Form field that carries the uploaded file.
pub const UPLOAD_FIELD: &str = "pdf";

/// How many consecutive milliseconds are tried when the storage name is taken.
const MAX_NAME_ATTEMPTS: u64 = 64;

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<String, UploadError> {
    let result = match multipart {
        Ok(mut multipart) => receive_single_file(&state, &mut multipart).await,
        // A body that is not multipart cannot carry the file part.
        Err(rejection) => {
            debug!("Not a multipart request: {}", rejection.body_text());
            Err(UploadError::NoFile)
        }
    };

    result
        .map(|stored| format!("File uploaded: {}", stored.name))
        .inspect_err(UploadError::log)
}

/// Reads the whole form and returns the one stored `pdf` file.
///
/// Nothing stays on disk unless the form was read to the end without error.
async fn receive_single_file(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<StoredFile, UploadError> {
    let mut stored = None;
    let outcome = drain_fields(state, multipart, &mut stored).await;

    match (outcome, stored) {
        (Ok(()), Some(file)) => Ok(file),
        (Ok(()), None) => Err(UploadError::NoFile),
        (Err(e), Some(file)) => {
            discard(state, &file).await;
            Err(e)
        }
        (Err(e), None) => Err(e),
    }
}

async fn drain_fields(
    state: &AppState,
    multipart: &mut Multipart,
    stored: &mut Option<StoredFile>,
) -> Result<(), UploadError> {
    let mut started = false;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // A body that ends before its first part carries no file at all.
            Err(e) if !started => {
                debug!("Multipart body has no parts: {}", e);
                return Err(UploadError::NoFile);
            }
            Err(e) => return Err(e.into()),
        };
        started = true;

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        // No filename means a plain text field; an empty one is a file input
        // submitted with nothing selected.
        let Some(original) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(sanitize_filename)
        else {
            continue;
        };
        if stored.is_some() {
            return Err(UploadError::UnexpectedField(UPLOAD_FIELD.to_string()));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let mut body = StreamReader::new(Box::pin(field.map_err(io::Error::other)));
        let file = store_under_unique_name(state, &original, &mut body).await?;

        info!(
            "Stored upload {} ({}, {}, {} bytes)",
            file.name, original, content_type, file.size
        );
        *stored = Some(file);
    }
    Ok(())
}

/// Names the file after its receipt time, moving forward one millisecond
/// whenever the name is already taken.
async fn store_under_unique_name(
    state: &AppState,
    original: &str,
    body: &mut (dyn AsyncRead + Send + Unpin),
) -> Result<StoredFile, UploadError> {
    let received_at = state.clock.now_millis();

    for offset in 0..MAX_NAME_ATTEMPTS {
        let name = storage_name(received_at + offset, original);
        match state.store.store(&name, body).await {
            Err(StorageError::AlreadyExists(taken)) => {
                debug!("Storage name {} is taken, trying the next millisecond", taken);
            }
            result => return result.map_err(UploadError::from),
        }
    }

    Err(StorageError::NamesExhausted {
        original: original.to_string(),
        attempts: MAX_NAME_ATTEMPTS,
    }
    .into())
}

async fn discard(state: &AppState, file: &StoredFile) {
    match state.store.remove(file).await {
        Ok(()) => debug!("Removed {} from rejected request", file.name),
        Err(e) => error!("Failed to remove {} from rejected request: {}", file.name, e),
    }
}
