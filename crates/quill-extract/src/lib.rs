//! # quill-extract
//!
//! Content extraction for quillbox.
//!
//! This crate provides:
//! - Rich-text (HTML) body to wrapped plain-text conversion
//! - PDF text extraction behind the fixed `PdfExtractor` adapter trait
//!   (shipped implementation shells out to `pdftotext`)
//! - Assembly of the labeled attachments-text blob for summarization

pub mod markup;
pub mod material;
pub mod pdf;

pub use markup::markup_to_plain;
pub use material::attachment_text;
pub use pdf::PdfTextExtractor;
