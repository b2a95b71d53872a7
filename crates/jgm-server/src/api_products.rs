//! Product catalog handlers.

use crate::api::{with_session, ApiError};
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use jgm_models::{
    create_product, delete_product, get_product, list_products, update_product,
    CreateProductParams, Product, UpdateProductParams,
};
use serde::Deserialize;
use std::sync::Arc;

/// Request body for `PUT /products/{sku}`.
///
/// `sku` may be echoed back but must match the path; products cannot be
/// re-keyed.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Handler for `POST /products`.
pub async fn create_product_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateProductParams>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = with_session(&state.pool, move |conn| {
        Ok(create_product(conn, &payload)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for `GET /products`.
pub async fn list_products_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = with_session(&state.pool, |conn| Ok(list_products(conn)?)).await?;
    Ok(Json(products))
}

/// Handler for `GET /products/{sku}`.
pub async fn get_product_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(sku): ApiPath<String>,
) -> Result<Json<Product>, ApiError> {
    let product = with_session(&state.pool, move |conn| Ok(get_product(conn, &sku)?)).await?;
    Ok(Json(product))
}

/// Handler for `PUT /products/{sku}`.
pub async fn update_product_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(sku): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    if payload.sku.as_deref().is_some_and(|body_sku| body_sku != sku) {
        return Err(ApiError::BadRequest("sku cannot be changed".to_string()));
    }
    let updates = UpdateProductParams {
        name: payload.name,
        price: payload.price,
    };
    let product = with_session(&state.pool, move |conn| {
        Ok(update_product(conn, &sku, &updates)?)
    })
    .await?;
    Ok(Json(product))
}

/// Handler for `DELETE /products/{sku}`.
pub async fn delete_product_handler(
    Extension(state): Extension<Arc<AppState>>,
    ApiPath(sku): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    with_session(&state.pool, move |conn| Ok(delete_product(conn, &sku)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
