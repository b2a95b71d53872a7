//! Catalog products keyed by SKU.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A catalog item. The SKU is both its identity and its primary key, and it
/// never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub sku: String,
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Parameters for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductParams {
    pub sku: String,
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Fields a product update may change. The SKU is deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductParams {
    pub name: Option<String>,
    pub price: Option<f64>,
}

fn validate_price(price: Option<f64>) -> Result<(), ModelError> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => {
            Err(ModelError::Invalid(format!("price: {p}")))
        }
        _ => Ok(()),
    }
}

/// Inserts a new product.
///
/// # Errors
///
/// `ModelError::Conflict` if the SKU already exists, `ModelError::Invalid`
/// for an empty SKU or a negative price.
pub fn create_product(
    conn: &Connection,
    params: &CreateProductParams,
) -> Result<Product, ModelError> {
    if params.sku.trim().is_empty() {
        return Err(ModelError::Invalid("sku: must not be empty".to_string()));
    }
    validate_price(params.price)?;

    conn.execute(
        "INSERT INTO products (sku, name, price) VALUES (?1, ?2, ?3)",
        params![params.sku, params.name, params.price],
    )
    .map_err(|e| ModelError::from_write(e, || format!("product already exists: {}", params.sku)))?;

    tracing::debug!(sku = %params.sku, "product created");

    Ok(Product {
        sku: params.sku.clone(),
        name: params.name.clone(),
        price: params.price,
    })
}

/// Retrieves a product by SKU.
pub fn get_product(conn: &Connection, sku: &str) -> Result<Product, ModelError> {
    conn.query_row(
        "SELECT sku, name, price FROM products WHERE sku = ?1",
        [sku],
        map_row_to_product,
    )
    .optional()?
    .ok_or_else(|| ModelError::not_found("product", sku))
}

/// Lists all products ordered by SKU.
pub fn list_products(conn: &Connection) -> Result<Vec<Product>, ModelError> {
    let mut stmt = conn.prepare("SELECT sku, name, price FROM products ORDER BY sku ASC")?;
    let rows = stmt.query_map([], map_row_to_product)?;
    let mut products = Vec::new();
    for row in rows {
        products.push(row?);
    }
    Ok(products)
}

/// Updates the name and/or price of a product. `None` fields are left as
/// they are.
pub fn update_product(
    conn: &Connection,
    sku: &str,
    updates: &UpdateProductParams,
) -> Result<Product, ModelError> {
    validate_price(updates.price)?;

    let changed = conn.execute(
        "UPDATE products
         SET name = COALESCE(?2, name),
             price = COALESCE(?3, price)
         WHERE sku = ?1",
        params![sku, updates.name, updates.price],
    )?;
    if changed == 0 {
        return Err(ModelError::not_found("product", sku));
    }
    get_product(conn, sku)
}

/// Deletes a product.
pub fn delete_product(conn: &Connection, sku: &str) -> Result<(), ModelError> {
    let deleted = conn.execute("DELETE FROM products WHERE sku = ?1", [sku])?;
    if deleted == 0 {
        return Err(ModelError::not_found("product", sku));
    }
    Ok(())
}

fn map_row_to_product(row: &Row) -> rusqlite::Result<Product> {
    Ok(Product {
        sku: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
    })
}
