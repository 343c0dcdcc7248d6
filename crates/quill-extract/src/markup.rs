//! Rich-text body to plain text conversion.

use quill_core::defaults::PLAIN_TEXT_WRAP_COLUMNS;
use quill_core::{Error, Result};

/// Convert a rich-text (HTML) note body to plain text.
///
/// Lines are wrapped at [`PLAIN_TEXT_WRAP_COLUMNS`]; the wrap is cosmetic
/// and does not change what gets summarized. Reading order is preserved.
pub fn markup_to_plain(markup: &str) -> Result<String> {
    html2text::config::plain()
        .string_from_read(markup.as_bytes(), PLAIN_TEXT_WRAP_COLUMNS)
        .map_err(|e| Error::Extraction(format!("Failed to convert note body: {}", e)))
}
