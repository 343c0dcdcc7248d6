//! quill-api - HTTP API server for quillbox

mod handlers;
mod services;

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, State},
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use governor::{Quota, RateLimiter};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use quill_ai::{GeminiBackend, SummaryGateway};
use quill_core::defaults::{
    CORS_MAX_AGE_SECS, MAX_BODY_SIZE_BYTES, RATE_LIMIT_PERIOD_SECS, RATE_LIMIT_REQUESTS,
    SERVER_PORT,
};
use quill_core::{AttachmentRepository, GenerationBackend, NoteRepository};
use quill_db::Database;
use quill_extract::PdfTextExtractor;

use handlers::ai::summarize_note;
use handlers::attachments::{delete_attachment, download_attachment, upload_attachments};
use handlers::notes::{
    create_note, delete_note, list_notes, search_notes, set_note_pinned, update_note,
};
use services::SummarizeService;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically, which is useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Global rate limiter type (direct quota, no keyed bucketing for a
/// personal server).
type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Note repository.
    pub notes: Arc<dyn NoteRepository>,
    /// Attachment byte store.
    pub attachments: Arc<dyn AttachmentRepository>,
    /// Summarize orchestrator.
    pub summarizer: Arc<SummarizeService>,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

// =============================================================================
// OWNER IDENTITY
// =============================================================================

/// The authenticated note owner, taken from the `X-User-Id` header.
///
/// Token verification happens upstream; this extractor only carries the
/// identity into handlers. Requests without a parseable id get 401.
pub struct Owner(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(Owner)
            .ok_or_else(|| {
                ApiError::Unauthorized("Missing or invalid X-User-Id header.".to_string())
            })
    }
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// AI generation exceeded its deadline on every candidate.
    Timeout,
    /// AI provider quota rejection, with its optional retry-delay hint.
    RateLimited {
        message: String,
        retry_after: Option<String>,
    },
    /// Summarization failed for a reason the client cannot act on.
    SummaryFailed(quill_core::Error),
    Internal(quill_core::Error),
}

impl From<quill_core::Error> for ApiError {
    fn from(err: quill_core::Error) -> Self {
        match err {
            quill_core::Error::NoteNotFound(_) => ApiError::NotFound("Note not found.".to_string()),
            quill_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            quill_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            quill_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl ApiError {
    /// Map a summarization failure onto the response contract. Differs from
    /// the blanket `From` impl in the 404 wording and in routing AI-layer
    /// failures to the summary-specific 5xx/4xx statuses.
    fn from_summarize(err: quill_core::Error) -> Self {
        match err {
            quill_core::Error::NoteNotFound(_) => {
                ApiError::NotFound("Note not found or unauthorized".to_string())
            }
            quill_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            quill_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            quill_core::Error::AiTimeout => ApiError::Timeout,
            quill_core::Error::AiRateLimited {
                message,
                retry_after,
            } => ApiError::RateLimited {
                message,
                retry_after,
            },
            other => ApiError::SummaryFailed(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, retry_after) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "AI response timed out. Please try again.".to_string(),
                None,
            ),
            ApiError::RateLimited {
                message,
                retry_after,
            } => (StatusCode::TOO_MANY_REQUESTS, message, retry_after),
            ApiError::SummaryFailed(err) => {
                error!(error = %err, "Summarization failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred while generating the summary. Please try again later."
                        .to_string(),
                    None,
                )
            }
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error.".to_string(),
                    None,
                )
            }
        };

        let mut body = serde_json::json!({
            "error": true,
            "message": message,
        });
        if let Some(delay) = retry_after {
            body["retryAfter"] = serde_json::Value::String(delay);
        }

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Global request throttle. Applies to every route when enabled.
async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: middleware::Next,
) -> axum::response::Response {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": true,
                    "message": "Too many requests. Please slow down."
                })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

/// CORS origin whitelist from `CORS_ALLOWED_ORIGINS` (comma-separated),
/// defaulting to the local dev frontends.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let configured = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string());

    configured
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect()
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// STARTUP
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "quill_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quill_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("quill-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            layer = layer.with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files by default
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/quillbox".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(SERVER_PORT);

    let rate_limit_requests: u64 = std::env::var("RATE_LIMIT_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(RATE_LIMIT_REQUESTS);
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(RATE_LIMIT_PERIOD_SECS);
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Construct the AI backend once; handlers share it by reference.
    let backend: Arc<dyn GenerationBackend> = Arc::new(GeminiBackend::from_env());
    if !backend.has_credential() {
        warn!("GEMINI_API_KEY is not set; summarization requests will fail");
    }
    let gateway = SummaryGateway::from_env(backend);
    info!(candidates = ?gateway.candidates(), "AI gateway initialized");

    if !PdfTextExtractor::health_check().await {
        warn!("pdftotext not found on PATH; PDF attachment extraction will fail");
    }

    let Database {
        notes, attachments, ..
    } = db;
    let notes: Arc<dyn NoteRepository> = Arc::new(notes);
    let attachments: Arc<dyn AttachmentRepository> = Arc::new(attachments);

    let summarizer = Arc::new(SummarizeService::new(
        notes.clone(),
        attachments.clone(),
        Arc::new(PdfTextExtractor),
        gateway,
    ));

    // Create rate limiter if enabled
    let rate_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(std::time::Duration::from_secs(rate_limit_period_secs))
            .expect("Rate limit period must be non-zero")
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32).expect("Rate limit must be non-zero"),
            );
        info!(
            rate_limit_requests,
            rate_limit_period_secs, "Rate limiting enabled"
        );
        Some(Arc::new(RateLimiter::direct(quota)))
    } else {
        info!("Rate limiting disabled");
        None
    };

    let state = AppState {
        notes,
        attachments,
        summarizer,
        rate_limiter,
    };

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Notes CRUD
        .route("/api/v1/notes", get(list_notes).post(create_note))
        .route("/api/v1/notes/search", get(search_notes))
        .route("/api/v1/notes/:id", put(update_note).delete(delete_note))
        .route("/api/v1/notes/:id/pinned", patch(set_note_pinned))
        // Attachments
        .route("/api/v1/notes/:id/attachments", post(upload_attachments))
        .route(
            "/api/v1/notes/:id/attachments/:attachment_id",
            get(download_attachment).delete(delete_attachment),
        )
        // AI summarization
        .route("/api/ai/summarize/:note_id", post(summarize_note))
        // Middleware
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins()))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(CORS_MAX_AGE_SECS))
        })
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE_BYTES))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            status_of(ApiError::Unauthorized("no header".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::NotFound("gone".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::BadRequest("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Conflict("busy".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(ApiError::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_of(ApiError::RateLimited {
                message: "slow down".into(),
                retry_after: Some("30s".into())
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(ApiError::SummaryFailed(quill_core::Error::AiUnavailable(
                "no key".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_summarize_error_mapping() {
        let err = ApiError::from_summarize(quill_core::Error::AiTimeout);
        assert!(matches!(err, ApiError::Timeout));

        let err = ApiError::from_summarize(quill_core::Error::AiRateLimited {
            message: "limit".into(),
            retry_after: Some("30s".into()),
        });
        match err {
            ApiError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after.as_deref(), Some("30s"));
            }
            other => panic!("Expected RateLimited, got {:?}", other),
        }

        let err = ApiError::from_summarize(quill_core::Error::NoteNotFound(Uuid::nil()));
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "Note not found or unauthorized"),
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let err = ApiError::from_summarize(quill_core::Error::AiUnavailable("no key".into()));
        assert!(matches!(err, ApiError::SummaryFailed(_)));
    }

    #[test]
    fn test_default_origins_parse() {
        std::env::remove_var("CORS_ALLOWED_ORIGINS");
        let origins = parse_allowed_origins();
        assert_eq!(origins.len(), 2);
    }
}
