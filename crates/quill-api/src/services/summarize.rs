//! Summarize orchestrator: the end-to-end request flow tying the state
//! guard, content extraction, prompt builder, and AI gateway together.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use quill_ai::{build_summary_prompt, SummaryGateway};
use quill_core::defaults::{SUMMARY_MAX_CHARS, SUMMARY_MIN_CHARS};
use quill_core::{AttachmentRepository, Error, Note, NoteRepository, PdfExtractor, Result};
use quill_extract::{attachment_text, markup_to_plain};

/// Reject inputs outside the summarizable range.
///
/// Too-short notes (under 50 plain-text characters with no attachments)
/// waste model quota on trivia; too-long notes (over 30000 characters)
/// blow the practical context/cost budget. Checked before any model call.
fn check_length_policy(plain_text: &str, has_attachments: bool) -> Result<()> {
    let len = plain_text.chars().count();

    if len < SUMMARY_MIN_CHARS && !has_attachments {
        return Err(Error::InvalidInput(format!(
            "Note content is too short to summarize (minimum {} characters required).",
            SUMMARY_MIN_CHARS
        )));
    }

    if len > SUMMARY_MAX_CHARS {
        return Err(Error::InvalidInput(format!(
            "Note is too long to summarize (limit: {} characters). Please shorten it and try again.",
            SUMMARY_MAX_CHARS
        )));
    }

    Ok(())
}

/// Request-level coordinator for note summarization.
///
/// Sole owner of the note record for the duration of an attempt. Depends
/// only on the core traits so tests can substitute in-memory stores and a
/// scripted backend.
pub struct SummarizeService {
    notes: Arc<dyn NoteRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    pdf: Arc<dyn PdfExtractor>,
    gateway: SummaryGateway,
}

impl SummarizeService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        pdf: Arc<dyn PdfExtractor>,
        gateway: SummaryGateway,
    ) -> Self {
        Self {
            notes,
            attachments,
            pdf,
            gateway,
        }
    }

    /// Summarize one owned note.
    ///
    /// Known limitation: the busy check and the busy-flag write are not one
    /// atomic step, so two requests landing in that window can both
    /// proceed. Accepted tradeoff: the flag is a duplicate-click guard,
    /// not a mutual-exclusion lock.
    pub async fn summarize(&self, note_id: Uuid, owner_id: Uuid) -> Result<String> {
        let note = self
            .notes
            .find_owned(note_id, owner_id)
            .await?
            .ok_or(Error::NoteNotFound(note_id))?;

        let now = Utc::now();
        if note.summarize_blocked(now) {
            return Err(Error::Conflict(
                "Summarization is already in progress".to_string(),
            ));
        }
        if note.is_stuck(now) {
            warn!(
                subsystem = "api",
                op = "summarize",
                note_id = %note_id,
                "Taking over a stuck summarization attempt"
            );
        }

        // Persist the busy flag before any extraction or model call so a
        // concurrent reader sees it promptly. This also refreshes
        // updated_at, restarting the staleness clock for this attempt.
        self.notes.begin_summarizing(note.id).await?;

        match self.run_attempt(&note).await {
            Ok(summary) => match self.notes.store_summary(note.id, &summary).await {
                Ok(()) => {
                    info!(
                        subsystem = "api",
                        op = "summarize",
                        note_id = %note_id,
                        response_len = summary.len(),
                        success = true,
                        "Summary generated"
                    );
                    Ok(summary)
                }
                Err(err) => {
                    self.reset_quietly(note_id).await;
                    Err(err)
                }
            },
            Err(err) => {
                self.reset_quietly(note_id).await;
                Err(err)
            }
        }
    }

    /// Extraction → validation → prompt → gateway. Runs with the busy flag
    /// already persisted; every exit path is followed by a flag reset or
    /// `store_summary` (which clears it).
    async fn run_attempt(&self, note: &Note) -> Result<String> {
        let plain_text = markup_to_plain(&note.content)?;
        check_length_policy(&plain_text, !note.attachments.is_empty())?;

        let attachments_text = attachment_text(
            &note.attachments,
            self.attachments.as_ref(),
            self.pdf.as_ref(),
        )
        .await?;

        let prompt = build_summary_prompt(&note.title, &plain_text, &attachments_text);
        self.gateway.summarize(&prompt).await
    }

    /// Id-based busy-flag recovery, robust to a note that vanished
    /// mid-attempt. Never escalates: a failed reset is logged, not
    /// returned, so it cannot mask the original error.
    async fn reset_quietly(&self, note_id: Uuid) {
        if let Err(err) = self.notes.reset_summarizing(note_id).await {
            warn!(
                subsystem = "api",
                op = "summarize",
                note_id = %note_id,
                error = %err,
                "Failed to reset summarizing flag"
            );
        }
    }
}
