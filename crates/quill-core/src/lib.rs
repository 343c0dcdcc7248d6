//! # quill-core
//!
//! Core types, traits, and abstractions for quillbox.
//!
//! This crate provides:
//! - The `Note`/`Attachment` data model with the summarization state machine
//! - The shared error taxonomy and `Result` alias
//! - Repository and backend traits consumed by the orchestrator
//! - Centralized default constants
//! - Structured-logging field name constants

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

pub use error::{Error, Result};
pub use models::{
    Attachment, AttachmentRef, CreateNoteRequest, Note, SetPinnedRequest, UpdateNoteRequest,
};
pub use traits::{AttachmentRepository, GenerationBackend, NoteRepository, PdfExtractor};
