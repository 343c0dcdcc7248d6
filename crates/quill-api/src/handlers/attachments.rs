//! Attachment upload/download handlers.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use quill_core::{AttachmentRepository, NoteRepository};

use crate::{ApiError, AppState, Owner};

/// Upload one or more files as attachments on a note (multipart form).
pub async fn upload_attachments(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(note_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    // Ownership gate: a foreign note behaves as absent.
    state
        .notes
        .find_owned(note_id, owner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found.".to_string()))?;

    let mut stored = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue; // non-file form field
        };
        let file_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let meta = state
            .attachments
            .store(note_id, &file_name, &file_type, data.to_vec())
            .await?;
        stored.push(meta);
    }

    if stored.is_empty() {
        return Err(ApiError::BadRequest("No files provided.".to_string()));
    }

    Ok(Json(json!({
        "error": false,
        "attachments": stored,
        "message": "Attachments uploaded successfully."
    })))
}

/// Serve attachment bytes with inline disposition.
pub async fn download_attachment(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path((note_id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    state
        .notes
        .find_owned(note_id, owner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found.".to_string()))?;

    let attachment = state
        .attachments
        .fetch(attachment_id, note_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Attachment not found.".to_string()))?;

    // Inline bytes first; legacy rows fall back to their on-disk payload.
    let data = match attachment.data {
        Some(data) => data,
        None => match &attachment.legacy_path {
            Some(path) => state
                .attachments
                .read_legacy_path(path)
                .await?
                .ok_or_else(|| ApiError::NotFound("Attachment data not found.".to_string()))?,
            None => return Err(ApiError::NotFound("Attachment data not found.".to_string())),
        },
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, attachment.file_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", attachment.name),
        )
        .header(header::CONTENT_LENGTH, data.len())
        .body(axum::body::Body::from(data))
        .map_err(|e| ApiError::Internal(quill_core::Error::Internal(e.to_string())))?;

    Ok(response)
}

/// Delete one attachment from a note.
pub async fn delete_attachment(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path((note_id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .notes
        .find_owned(note_id, owner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found.".to_string()))?;

    state.attachments.delete(attachment_id, note_id).await?;

    Ok(Json(json!({
        "error": false,
        "message": "Attachment deleted successfully."
    })))
}
