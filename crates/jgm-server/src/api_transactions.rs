//! Transaction handlers.
//!
//! Status changes arrive through `PATCH /transactions/{id}/status`. No order
//! is imposed on them here; the payment gateway integration decides when a
//! charge is paid, failed or refunded.
//!
//! `POST /transactions` honours an idempotency key from the
//! `X-Idempotency-Key` header or the `idempotencyKey` body field. The header
//! wins when both are present.

use crate::api::{with_session, ApiError};
use crate::auth::AuthUser;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::{HeaderMap, StatusCode},
};
use jgm_models::{
    claim_idempotency_key, create_transaction, get_transaction, list_transactions, update_transaction_status,
    CreateTransactionParams, Transaction, TransactionFilter,
};
use jgm_types::TransactionStatus;
use serde::Deserialize;
use std::sync::Arc;

/// Header carrying a client-chosen idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";

/// Request body for `POST /transactions`.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(flatten)]
    pub params: CreateTransactionParams,
    #[serde(rename = "idempotencyKey")]
    pub idempotency_key: Option<String>,
}

/// Request body for `PATCH /transactions/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TransactionStatus,
    /// Latest gateway response; the stored payload is kept when absent.
    pub metadata_payload: Option<serde_json::Value>,
}

/// Handler for `POST /transactions`.
///
/// When the body carries no `user_id`, the authenticated user id is used if
/// it is numeric. A claimed idempotency key is committed together with the
/// transaction, so a rejected request can be retried with the same key.
pub async fn create_transaction_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| ApiError::BadRequest("invalid idempotency key header".to_string()))
        })
        .transpose()?
        .or(payload.idempotency_key);

    let mut params = payload.params;
    if params.user_id.is_none() {
        params.user_id = user.0.parse().ok();
    }

    let transaction = with_session(&state.pool, move |conn| {
        let db_tx = conn.unchecked_transaction().map_err(|e| {
            tracing::error!(error = %e, "failed to begin transaction");
            ApiError::InternalServerError(crate::api::INTERNAL_ERROR_MESSAGE.to_string())
        })?;
        if let Some(key) = idempotency_key.as_deref() {
            claim_idempotency_key(&db_tx, key, "POST", "/transactions")?;
        }
        let created = create_transaction(&db_tx, &params)?;
        db_tx.commit().map_err(|e| {
            tracing::error!(error = %e, "failed to commit transaction");
            ApiError::InternalServerError(crate::api::INTERNAL_ERROR_MESSAGE.to_string())
        })?;
        Ok(created)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Handler for `GET /transactions`.
pub async fn list_transactions_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let transactions = with_session(&state.pool, move |conn| {
        Ok(list_transactions(conn, &filter)?)
    })
    .await?;
    Ok(Json(transactions))
}

/// Handler for `GET /transactions/{id}`.
pub async fn get_transaction_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction =
        with_session(&state.pool, move |conn| Ok(get_transaction(conn, id)?)).await?;
    Ok(Json(transaction))
}

/// Handler for `PATCH /transactions/{id}/status`.
pub async fn update_status_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction = with_session(&state.pool, move |conn| {
        Ok(update_transaction_status(
            conn,
            id,
            payload.status,
            payload.metadata_payload.as_ref(),
        )?)
    })
    .await?;
    Ok(Json(transaction))
}
