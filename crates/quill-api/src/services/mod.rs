//! Request-level services shared by the HTTP handlers.

pub mod summarize;

pub use summarize::SummarizeService;
