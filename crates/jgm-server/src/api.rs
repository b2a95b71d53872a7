//! Shared plumbing for API handlers: the error type and scoped sessions.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jgm_db::DbPool;
use jgm_models::ModelError;
use thiserror::Error;

/// Message returned for failures whose details must stay server-side.
pub(crate) const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// API error type mapping to HTTP status codes.
///
/// Rendered as `{"detail": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
    /// A request that failed extraction, with the status axum assigned.
    #[error("rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Rejected { status, message } => (status, message),
        };

        let body = Json(serde_json::json!({
            "detail": message
        }));

        (status, body).into_response()
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            ModelError::Conflict(msg) => ApiError::Conflict(msg),
            ModelError::Invalid(_) => ApiError::BadRequest(e.to_string()),
            ModelError::Database(_) | ModelError::Json(_) => {
                tracing::error!(error = %e, "model operation failed");
                ApiError::InternalServerError(INTERNAL_ERROR_MESSAGE.to_string())
            }
        }
    }
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )*
    };
}

impl_from_rejection!(JsonRejection, QueryRejection, PathRejection);

/// Runs `f` on the blocking pool with a connection checked out of `pool`.
///
/// The connection guard lives inside the blocking task, so it goes back to
/// the pool when `f` returns, fails, or panics. Checkout failures are logged
/// and reported as a generic 500; they are not retried.
pub(crate) async fn with_session<T, F>(pool: &DbPool, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&rusqlite::Connection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to check out database session");
            ApiError::InternalServerError(INTERNAL_ERROR_MESSAGE.to_string())
        })?;
        f(&conn)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "database task failed");
        ApiError::InternalServerError(INTERNAL_ERROR_MESSAGE.to_string())
    })?
}
