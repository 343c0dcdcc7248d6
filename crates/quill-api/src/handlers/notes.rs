//! Note CRUD handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use quill_core::{CreateNoteRequest, NoteRepository, SetPinnedRequest, UpdateNoteRequest};

use crate::{ApiError, AppState, Owner};

/// Create a note.
pub async fn create_note(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required.".to_string()));
    }
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Content is required.".to_string()));
    }

    let note = state.notes.insert(owner_id, req).await?;

    Ok(Json(json!({
        "error": false,
        "note": note,
        "message": "Note added successfully."
    })))
}

/// List the owner's notes, pinned first.
pub async fn list_notes(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
) -> Result<impl IntoResponse, ApiError> {
    let notes = state.notes.list_for_owner(owner_id).await?;

    Ok(Json(json!({
        "error": false,
        "notes": notes,
        "message": "All notes retrieved successfully."
    })))
}

/// Edit a note (title, content, tags, pinned; all optional).
pub async fn update_note(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(note_id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.is_empty() {
        return Err(ApiError::BadRequest("No changes provided.".to_string()));
    }

    let note = state.notes.update(note_id, owner_id, req).await?;

    Ok(Json(json!({
        "error": false,
        "note": note,
        "message": "Note updated successfully."
    })))
}

/// Delete a note. Attachments cascade with it.
pub async fn delete_note(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(note_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notes.delete(note_id, owner_id).await?;

    Ok(Json(json!({
        "error": false,
        "message": "Note deleted successfully."
    })))
}

/// Set the pinned flag.
pub async fn set_note_pinned(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(note_id): Path<Uuid>,
    Json(req): Json<SetPinnedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state
        .notes
        .set_pinned(note_id, owner_id, req.is_pinned)
        .await?;

    Ok(Json(json!({
        "error": false,
        "note": note,
        "message": "Note updated successfully."
    })))
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    query: String,
}

/// Case-insensitive title/content substring search.
pub async fn search_notes(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.query.is_empty() {
        return Err(ApiError::BadRequest("Search query is required.".to_string()));
    }

    let notes = state.notes.search(owner_id, &params.query).await?;

    Ok(Json(json!({
        "error": false,
        "notes": notes,
        "message": "Notes matching the search query retrieved successfully."
    })))
}
