//! Repository and backend traits.
//!
//! The summarize orchestrator depends only on these interfaces; the
//! Postgres implementations live in `quill-db`, the Gemini backend in
//! `quill-ai`, and tests substitute in-memory fakes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Attachment, AttachmentRef, CreateNoteRequest, Note, UpdateNoteRequest};
use crate::Result;

/// Note persistence operations.
///
/// Every read is owner-scoped: a note that exists but belongs to someone
/// else is indistinguishable from an absent one.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Create a note for the given owner.
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch a note by id, scoped to its owner.
    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Note>>;

    /// List an owner's notes, pinned first.
    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Note>>;

    /// Case-insensitive substring search over title and content.
    async fn search(&self, owner_id: Uuid, query: &str) -> Result<Vec<Note>>;

    /// Apply a partial update.
    async fn update(&self, id: Uuid, owner_id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Toggle the pinned flag.
    async fn set_pinned(&self, id: Uuid, owner_id: Uuid, pinned: bool) -> Result<Note>;

    /// Delete a note; the attachment rows cascade with it.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<()>;

    /// Mark a note as summarizing and refresh `updated_at`.
    ///
    /// The refresh resets the staleness clock so the attempt that is
    /// starting is not immediately judged stuck by a concurrent reader.
    async fn begin_summarizing(&self, id: Uuid) -> Result<()>;

    /// Clear the summarizing flag by id.
    ///
    /// Idempotent and tolerant of an absent note: this is the recovery
    /// path run from failure handlers, so it must never make things worse.
    async fn reset_summarizing(&self, id: Uuid) -> Result<()>;

    /// Persist a completed summary and clear the summarizing flag.
    async fn store_summary(&self, id: Uuid, summary: &str) -> Result<()>;
}

/// Attachment byte-store operations.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Store attachment bytes for a note and return the metadata ref.
    async fn store(
        &self,
        note_id: Uuid,
        name: &str,
        file_type: &str,
        data: Vec<u8>,
    ) -> Result<AttachmentRef>;

    /// Fetch the full record (metadata plus inline bytes), scoped to a note.
    async fn fetch(&self, id: Uuid, note_id: Uuid) -> Result<Option<Attachment>>;

    /// Read stored bytes by attachment id. `None` when the row is absent or
    /// holds no inline payload (legacy rows).
    async fn read_data(&self, id: Uuid) -> Result<Option<Vec<u8>>>;

    /// Read bytes from a legacy filesystem path. `None` when the file does
    /// not exist.
    async fn read_legacy_path(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Delete one attachment, scoped to a note.
    async fn delete(&self, id: Uuid, note_id: Uuid) -> Result<()>;
}

/// A text-generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// True when a usable service credential is configured. The gateway
    /// fails fast, before any network attempt, when this is false.
    fn has_credential(&self) -> bool;

    /// Generate a completion for `prompt` using the named model.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

/// Fixed adapter interface for PDF text extraction.
///
/// Implementations may wrap whatever concrete tool or library they like;
/// callers depend only on bytes-in, text-out.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    async fn extract_text(&self, data: &[u8]) -> Result<String>;
}
