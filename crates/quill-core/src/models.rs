//! Core data models for quillbox.
//!
//! JSON field names use camelCase because the web client speaks the
//! original API's camelCase contract (`isPinned`, `fileType`, ...).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::STUCK_TIMEOUT_SECS;

/// Lightweight attachment metadata carried on a note.
///
/// The byte payload lives in the attachment store; notes only reference it.
/// `legacy_path` is set for rows migrated from the old filesystem layout
/// whose bytes were never imported into the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub id: Uuid,
    pub name: String,
    pub file_type: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_path: Option<String>,
}

impl AttachmentRef {
    /// True if the declared content type is PDF (the only attachment type
    /// whose text feeds summarization).
    pub fn is_pdf(&self) -> bool {
        self.file_type == "application/pdf"
    }
}

/// A note owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    /// Rich-text body (HTML markup).
    pub content: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub attachments: Vec<AttachmentRef>,
    /// AI-generated summary; empty string when absent.
    pub summary: String,
    /// Busy flag for the summarization state machine.
    pub is_summarizing: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// A summarization attempt is stuck when the busy flag is set but the
    /// record has not been touched within the stuck window; the owning
    /// request crashed or was abandoned and must not lock the note forever.
    pub fn is_stuck(&self, now: DateTime<Utc>) -> bool {
        self.is_summarizing && now - self.updated_at > Duration::seconds(STUCK_TIMEOUT_SECS)
    }

    /// True when a new summarization attempt must be rejected with a
    /// conflict: an attempt is active and not stuck.
    pub fn summarize_blocked(&self, now: DateTime<Utc>) -> bool {
        self.is_summarizing && !self.is_stuck(now)
    }
}

/// Full attachment record as stored (metadata plus optional inline bytes).
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: Uuid,
    pub note_id: Uuid,
    pub name: String,
    pub file_type: String,
    pub size: i64,
    /// None for legacy rows whose bytes still live on disk at `legacy_path`.
    pub data: Option<Vec<u8>>,
    pub legacy_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a note.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request payload for editing a note. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
}

impl UpdateNoteRequest {
    /// True when the request carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.is_pinned.is_none()
    }
}

/// Request payload for the pin toggle endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPinnedRequest {
    pub is_pinned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_with_flag(is_summarizing: bool, updated_secs_ago: i64) -> Note {
        let now = Utc::now();
        Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Test".to_string(),
            content: "<p>body</p>".to_string(),
            tags: vec![],
            is_pinned: false,
            attachments: vec![],
            summary: String::new(),
            is_summarizing,
            created_at: now - Duration::seconds(3600),
            updated_at: now - Duration::seconds(updated_secs_ago),
        }
    }

    #[test]
    fn test_idle_note_is_not_stuck_and_not_blocked() {
        let note = note_with_flag(false, 0);
        let now = Utc::now();
        assert!(!note.is_stuck(now));
        assert!(!note.summarize_blocked(now));
    }

    #[test]
    fn test_fresh_busy_note_blocks() {
        let note = note_with_flag(true, 10);
        let now = Utc::now();
        assert!(!note.is_stuck(now));
        assert!(note.summarize_blocked(now));
    }

    #[test]
    fn test_busy_note_at_window_edge_still_blocks() {
        // Exactly at the window: not yet strictly older, so still blocked.
        let note = note_with_flag(true, STUCK_TIMEOUT_SECS);
        let now = note.updated_at + Duration::seconds(STUCK_TIMEOUT_SECS);
        assert!(!note.is_stuck(now));
        assert!(note.summarize_blocked(now));
    }

    #[test]
    fn test_stale_busy_note_is_stuck_and_reentrant() {
        let note = note_with_flag(true, STUCK_TIMEOUT_SECS + 1);
        let now = Utc::now();
        assert!(note.is_stuck(now));
        assert!(!note.summarize_blocked(now));
    }

    #[test]
    fn test_stale_idle_note_is_not_stuck() {
        let note = note_with_flag(false, 10_000);
        assert!(!note.is_stuck(Utc::now()));
    }

    #[test]
    fn test_attachment_ref_is_pdf() {
        let mut a = AttachmentRef {
            id: Uuid::new_v4(),
            name: "report.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            size: 1024,
            legacy_path: None,
        };
        assert!(a.is_pdf());
        a.file_type = "image/png".to_string();
        assert!(!a.is_pdf());
    }

    #[test]
    fn test_update_request_is_empty() {
        assert!(UpdateNoteRequest::default().is_empty());
        let req = UpdateNoteRequest {
            is_pinned: Some(true),
            ..Default::default()
        };
        assert!(!req.is_empty());
    }

    #[test]
    fn test_note_serializes_camel_case() {
        let note = note_with_flag(false, 0);
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("isPinned").is_some());
        assert!(json.get("isSummarizing").is_some());
        assert!(json.get("ownerId").is_some());
        assert!(json.get("is_pinned").is_none());
    }

    #[test]
    fn test_create_request_defaults_tags() {
        let req: CreateNoteRequest =
            serde_json::from_str(r#"{"title":"T","content":"C"}"#).unwrap();
        assert!(req.tags.is_empty());
    }
}
