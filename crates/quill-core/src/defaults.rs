//! Centralized default constants for quillbox.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. Organized by domain area; document the rationale for any
//! new value.

// =============================================================================
// SUMMARIZATION STATE GUARD
// =============================================================================

/// A summarization attempt older than this is considered stuck and may be
/// taken over by a new request (crash/abandon recovery).
pub const STUCK_TIMEOUT_SECS: i64 = 120;

// =============================================================================
// SUMMARIZATION INPUT POLICY
// =============================================================================

/// Minimum plain-text length for a note with no attachments. Shorter notes
/// are rejected before any model call.
pub const SUMMARY_MIN_CHARS: usize = 50;

/// Maximum plain-text length accepted for summarization. Keeps the prompt
/// inside the provider's practical context/cost budget.
pub const SUMMARY_MAX_CHARS: usize = 30_000;

// =============================================================================
// CONTENT EXTRACTION
// =============================================================================

/// Column width used when converting rich-text bodies to plain text.
/// Cosmetic only; does not affect summarization semantics.
pub const PLAIN_TEXT_WRAP_COLUMNS: usize = 130;

/// Timeout for external extraction commands (pdftotext) in seconds.
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Per-candidate generation timeout in seconds. Each model in the fallback
/// chain gets this budget before the gateway moves on.
pub const AI_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Fallback generation models, tried in order after any operator-configured
/// override.
pub const FALLBACK_MODELS: [&str; 3] = [
    "gemini-2.0-flash",
    "gemini-flash-latest",
    "gemini-pro-latest",
];

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Maximum request body size in bytes (25 MB, sized for attachment uploads).
pub const MAX_BODY_SIZE_BYTES: usize = 25 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuck_timeout_is_two_minutes() {
        assert_eq!(STUCK_TIMEOUT_SECS, 120);
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(SUMMARY_MIN_CHARS, 50);
        assert_eq!(SUMMARY_MAX_CHARS, 30_000);
    }

    #[test]
    fn test_attempt_timeout() {
        assert_eq!(AI_ATTEMPT_TIMEOUT_SECS, 30);
    }

    #[test]
    fn test_fallback_model_order() {
        assert_eq!(
            FALLBACK_MODELS,
            ["gemini-2.0-flash", "gemini-flash-latest", "gemini-pro-latest"]
        );
    }
}
