//! AI summarization handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::{ApiError, AppState, Owner};

/// Summarize a note. Empty request body; the response carries the summary
/// text on success and the taxonomy-mapped status on failure (409 busy,
/// 400 length policy, 504 timeout, 429 rate limited, 404 unknown note).
pub async fn summarize_note(
    State(state): State<AppState>,
    Owner(owner_id): Owner,
    Path(note_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .summarizer
        .summarize(note_id, owner_id)
        .await
        .map_err(ApiError::from_summarize)?;

    Ok(Json(json!({
        "error": false,
        "summary": summary,
        "message": "Summary generated successfully"
    })))
}
