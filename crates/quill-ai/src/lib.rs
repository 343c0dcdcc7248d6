//! # quill-ai
//!
//! Generative AI integration for quillbox.
//!
//! This crate provides:
//! - The `GeminiBackend` implementation of `GenerationBackend`
//! - The `SummaryGateway` with ordered multi-model fallback, per-attempt
//!   timeout, and rate-limit-aware error classification
//! - The deterministic summarization prompt builder

pub mod gateway;
pub mod gemini;
pub mod prompt;

// Re-export core types
pub use quill_core::*;

pub use gateway::{candidate_models, SummaryGateway};
pub use gemini::GeminiBackend;
pub use prompt::build_summary_prompt;
