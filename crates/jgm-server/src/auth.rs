//! Auth router: access token issuance and bearer-token verification.
//!
//! Access tokens are HS256 JWTs signed with `SECRET_KEY`. The `sub` claim
//! carries the user id and `exp` lies [`TOKEN_TTL_SECS`] after issuance.

use crate::{api::ApiError, extract::ApiJson, AppState};
use axum::{
    body::Body,
    extract::{Extension, Json},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Lifetime of an access token (12 hours).
pub const TOKEN_TTL_SECS: u64 = 12 * 60 * 60;

/// Reasons a token cannot be issued or is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed,
        }
    }
}

/// Registered claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user id.
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// The authenticated caller, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Issues a token for `user_id` that expires `TOKEN_TTL_SECS` after `now`.
pub fn issue_token(user_id: &str, secret: &[u8], now: u64) -> Result<String, AuthError> {
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Verifies a token against the current time and returns its subject.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<String, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
    Ok(data.claims.sub)
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Response body for a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// Handler for `POST /auth/login`.
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_id = payload
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("UserId is required".to_string()))?;

    let access_token = issue_token(&user_id, state.settings.secret_key.as_bytes(), now_unix_secs())
        .map_err(|e| {
            tracing::error!(error = %e, "failed to issue access token");
            ApiError::InternalServerError(crate::api::INTERNAL_ERROR_MESSAGE.to_string())
        })?;
    tracing::info!(user_id = %user_id, "issued access token");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: TOKEN_TTL_SECS,
    }))
}

/// Handler for `GET /auth/me`.
pub async fn me_handler(Extension(user): Extension<AuthUser>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "userId": user.0 }))
}

/// Middleware that requires `Authorization: Bearer <token>`.
///
/// On success the caller's [`AuthUser`] is added to the request extensions.
pub async fn auth_middleware(mut req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .ok_or_else(|| {
            tracing::error!("application state missing from request extensions");
            ApiError::InternalServerError(crate::api::INTERNAL_ERROR_MESSAGE.to_string())
        })?;

    let user_id = verify_token(token, state.settings.secret_key.as_bytes())
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            ApiError::Unauthorized(e.to_string())
        })?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Routes under `/auth`.
pub fn router() -> Router {
    Router::new()
        .route(
            "/auth/me",
            get(me_handler).layer(middleware::from_fn(auth_middleware)),
        )
        .route("/auth/login", post(login_handler))
}
