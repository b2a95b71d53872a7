//! Physical stores.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A store. `cost_center_id` is an external accounting reference with no
/// enforced format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Store {
    pub id: i64,
    pub name: Option<String>,
    pub cost_center_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateStoreParams {
    pub name: Option<String>,
    pub cost_center_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStoreParams {
    pub name: Option<String>,
    pub cost_center_id: Option<String>,
}

/// Inserts a new store and returns it with its assigned id.
pub fn create_store(conn: &Connection, params: &CreateStoreParams) -> Result<Store, ModelError> {
    conn.execute(
        "INSERT INTO stores (name, cost_center_id) VALUES (?1, ?2)",
        params![params.name, params.cost_center_id],
    )?;
    let id = conn.last_insert_rowid();

    tracing::debug!(store_id = id, "store created");

    Ok(Store {
        id,
        name: params.name.clone(),
        cost_center_id: params.cost_center_id.clone(),
    })
}

/// Retrieves a store by id.
pub fn get_store(conn: &Connection, id: i64) -> Result<Store, ModelError> {
    conn.query_row(
        "SELECT id, name, cost_center_id FROM stores WHERE id = ?1",
        [id],
        map_row_to_store,
    )
    .optional()?
    .ok_or_else(|| ModelError::not_found("store", id))
}

/// Lists all stores ordered by id.
pub fn list_stores(conn: &Connection) -> Result<Vec<Store>, ModelError> {
    let mut stmt = conn.prepare("SELECT id, name, cost_center_id FROM stores ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_row_to_store)?;
    let mut stores = Vec::new();
    for row in rows {
        stores.push(row?);
    }
    Ok(stores)
}

/// Updates a store. `None` fields are left as they are.
pub fn update_store(
    conn: &Connection,
    id: i64,
    updates: &UpdateStoreParams,
) -> Result<Store, ModelError> {
    let changed = conn.execute(
        "UPDATE stores
         SET name = COALESCE(?2, name),
             cost_center_id = COALESCE(?3, cost_center_id)
         WHERE id = ?1",
        params![id, updates.name, updates.cost_center_id],
    )?;
    if changed == 0 {
        return Err(ModelError::not_found("store", id));
    }
    get_store(conn, id)
}

/// Deletes a store. Transactions that reference it keep their `store_id`.
pub fn delete_store(conn: &Connection, id: i64) -> Result<(), ModelError> {
    let deleted = conn.execute("DELETE FROM stores WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(ModelError::not_found("store", id));
    }
    Ok(())
}

fn map_row_to_store(row: &Row) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        cost_center_id: row.get(2)?,
    })
}
