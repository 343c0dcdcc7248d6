//! Assembly of the attachments-text blob that accompanies a note body into
//! the summarization prompt.

use quill_core::{AttachmentRef, AttachmentRepository, PdfExtractor, Result};
use tracing::debug;

/// Collect extracted text from a note's PDF attachments, in attachment
/// order, each section labeled with its source attachment name.
///
/// Bytes come from the attachment store by id; rows without a stored
/// payload fall back to their legacy filesystem path. Attachments whose
/// bytes cannot be located anywhere are skipped; an attachment that *has*
/// bytes but fails extraction fails the whole operation, so the caller sees
/// the failure rather than a silently partial summary.
pub async fn attachment_text(
    attachments: &[AttachmentRef],
    store: &dyn AttachmentRepository,
    pdf: &dyn PdfExtractor,
) -> Result<String> {
    let mut collected = String::new();

    for meta in attachments {
        if !meta.is_pdf() {
            continue;
        }

        let mut data = store.read_data(meta.id).await?;

        if data.is_none() {
            if let Some(path) = &meta.legacy_path {
                data = store.read_legacy_path(path).await?;
            }
        }

        let Some(bytes) = data else {
            debug!(
                subsystem = "extract",
                attachment_id = %meta.id,
                "No payload found for attachment, skipping"
            );
            continue;
        };

        let text = pdf.extract_text(&bytes).await?;
        collected.push_str(&format!(
            "\n[Content from Attachment: {}]\n{}",
            meta.name, text
        ));
    }

    Ok(collected)
}
