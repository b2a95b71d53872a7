//! Store handlers.

use crate::api::{with_session, ApiError};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use jgm_models::{
    create_store, delete_store, get_store, list_stores, update_store, CreateStoreParams, Store,
    UpdateStoreParams,
};
use std::sync::Arc;

/// Handler for `POST /stores`.
pub async fn create_store_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateStoreParams>,
) -> Result<(StatusCode, Json<Store>), ApiError> {
    let store = with_session(&state.pool, move |conn| Ok(create_store(conn, &payload)?)).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// Handler for `GET /stores`.
pub async fn list_stores_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Store>>, ApiError> {
    let stores = with_session(&state.pool, |conn| Ok(list_stores(conn)?)).await?;
    Ok(Json(stores))
}

/// Handler for `GET /stores/{id}`.
pub async fn get_store_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Store>, ApiError> {
    let store = with_session(&state.pool, move |conn| Ok(get_store(conn, id)?)).await?;
    Ok(Json(store))
}

/// Handler for `PUT /stores/{id}`.
pub async fn update_store_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateStoreParams>,
) -> Result<Json<Store>, ApiError> {
    let store = with_session(&state.pool, move |conn| {
        Ok(update_store(conn, id, &payload)?)
    })
    .await?;
    Ok(Json(store))
}

/// Handler for `DELETE /stores/{id}`.
pub async fn delete_store_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    with_session(&state.pool, move |conn| Ok(delete_store(conn, id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
