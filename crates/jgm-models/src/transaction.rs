//! Payment transactions.
//!
//! A transaction records one charge attempt against a payment gateway. Its
//! amounts must satisfy `final_amount = total_amount - discount_amount`; the
//! schema only guarantees that `total_amount` and `final_amount` are present,
//! so [`create_transaction`] checks the rest before writing.
//!
//! `created_at` and `updated_at` are owned by the storage layer: the former is
//! a column default, the latter is refreshed by a trigger on every update.

use jgm_types::{GatewayProvider, Label, PaymentMethod, TransactionStatus};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ModelError;

/// Maximum allowed difference between `final_amount` and
/// `total_amount - discount_amount`.
pub const AMOUNT_TOLERANCE: f64 = 1e-6;

/// Default page size for [`list_transactions`].
const DEFAULT_LIST_LIMIT: u32 = 100;
/// Upper bound for [`TransactionFilter::limit`].
const MAX_LIST_LIMIT: u32 = 1_000;

const SELECT_COLUMNS: &str = "SELECT
        id, user_id, store_id, total_amount, discount_amount, final_amount,
        payment_method, gateway_provider, gateway_transaction_id, status,
        created_at, updated_at, metadata_payload
    FROM transactions";

/// A persisted payment transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    /// Soft reference to a user; not enforced by a foreign key.
    pub user_id: Option<i64>,
    /// Soft reference to a [`Store`](crate::Store); not enforced by a foreign key.
    pub store_id: Option<i64>,
    pub total_amount: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub payment_method: Option<Label<PaymentMethod>>,
    pub gateway_provider: Option<Label<GatewayProvider>>,
    /// Correlation id assigned by the gateway. Unique when present.
    pub gateway_transaction_id: Option<String>,
    /// Labels written by other producers are kept as `Unrecognized`.
    pub status: Label<TransactionStatus>,
    /// Insert time (ISO 8601, UTC).
    pub created_at: String,
    /// Last update time (ISO 8601, UTC). `None` until the first update.
    pub updated_at: Option<String>,
    /// Raw gateway response kept for debugging and audit.
    pub metadata_payload: Option<serde_json::Value>,
}

/// Parameters for creating a transaction.
///
/// `discount_amount` defaults to `0.0` and `status` to `PENDING` when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTransactionParams {
    pub user_id: Option<i64>,
    pub store_id: Option<i64>,
    pub total_amount: f64,
    pub discount_amount: Option<f64>,
    pub final_amount: f64,
    pub payment_method: Option<PaymentMethod>,
    pub gateway_provider: Option<GatewayProvider>,
    pub gateway_transaction_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub metadata_payload: Option<serde_json::Value>,
}

/// Filter criteria for [`list_transactions`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub store_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<TransactionStatus>,
    /// Maximum rows to return (default 100, capped at 1000). Zero is rejected.
    pub limit: Option<u32>,
}

fn validate_amounts(total: f64, discount: f64, final_amount: f64) -> Result<(), ModelError> {
    for (field, value) in [
        ("total_amount", total),
        ("discount_amount", discount),
        ("final_amount", final_amount),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ModelError::Invalid(format!(
                "{field}: must be a non-negative number, got {value}"
            )));
        }
    }
    if discount > total {
        return Err(ModelError::Invalid(format!(
            "discount_amount: {discount} exceeds total_amount {total}"
        )));
    }
    let expected = total - discount;
    if (final_amount - expected).abs() > AMOUNT_TOLERANCE {
        return Err(ModelError::Invalid(format!(
            "final_amount: expected {expected} (total_amount - discount_amount), got {final_amount}"
        )));
    }
    Ok(())
}

/// Inserts a new transaction and returns the stored row.
///
/// # Errors
///
/// - `ModelError::Invalid` if the amounts break the discount invariant.
/// - `ModelError::Conflict` if `gateway_transaction_id` is already recorded.
pub fn create_transaction(
    conn: &Connection,
    params: &CreateTransactionParams,
) -> Result<Transaction, ModelError> {
    let discount = params.discount_amount.unwrap_or(0.0);
    validate_amounts(params.total_amount, discount, params.final_amount)?;

    let status = params.status.unwrap_or_default();
    let metadata_json = params
        .metadata_payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO transactions (
            user_id, store_id, total_amount, discount_amount, final_amount,
            payment_method, gateway_provider, gateway_transaction_id, status,
            metadata_payload
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            params.user_id,
            params.store_id,
            params.total_amount,
            discount,
            params.final_amount,
            params.payment_method.map(PaymentMethod::as_str),
            params.gateway_provider.map(GatewayProvider::as_str),
            params.gateway_transaction_id,
            status.as_str(),
            metadata_json,
        ],
    )
    .map_err(|e| {
        ModelError::from_write(e, || {
            format!(
                "gateway transaction already recorded: {}",
                params.gateway_transaction_id.as_deref().unwrap_or_default()
            )
        })
    })?;

    let id = conn.last_insert_rowid();
    tracing::info!(
        transaction_id = id,
        status = status.as_str(),
        gateway = params.gateway_provider.map(GatewayProvider::as_str),
        "transaction created"
    );

    get_transaction(conn, id)
}

/// Retrieves a transaction by id.
pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction, ModelError> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        [id],
        map_row_to_transaction,
    )
    .optional()?
    .ok_or_else(|| ModelError::not_found("transaction", id))
}

/// Retrieves a transaction by the gateway's correlation id.
pub fn get_transaction_by_gateway_id(
    conn: &Connection,
    gateway_transaction_id: &str,
) -> Result<Transaction, ModelError> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE gateway_transaction_id = ?1"),
        [gateway_transaction_id],
        map_row_to_transaction,
    )
    .optional()?
    .ok_or_else(|| ModelError::not_found("transaction", gateway_transaction_id))
}

/// Lists transactions matching `filter`, oldest first.
///
/// Rows whose labels this build does not recognise are still returned.
pub fn list_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, ModelError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(store_id) = filter.store_id {
        values.push(Box::new(store_id));
        clauses.push(format!("store_id = ?{}", values.len()));
    }
    if let Some(user_id) = filter.user_id {
        values.push(Box::new(user_id));
        clauses.push(format!("user_id = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", values.len()));
    }

    let limit = match filter.limit {
        Some(0) => return Err(ModelError::Invalid("limit: must be at least 1".to_string())),
        Some(limit) => limit.min(MAX_LIST_LIMIT),
        None => DEFAULT_LIST_LIMIT,
    };
    values.push(Box::new(limit));
    let limit_idx = values.len();

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!("{SELECT_COLUMNS}{where_sql} ORDER BY id ASC LIMIT ?{limit_idx}");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
        map_row_to_transaction,
    )?;
    let mut transactions = Vec::new();
    for row in rows {
        transactions.push(row?);
    }
    Ok(transactions)
}

/// Sets the status of a transaction, optionally replacing its metadata
/// payload with the latest gateway response.
///
/// Any status may follow any other; the gateway integration is responsible
/// for the order in which they arrive. `updated_at` is refreshed by the
/// storage layer.
pub fn update_transaction_status(
    conn: &Connection,
    id: i64,
    status: TransactionStatus,
    metadata_payload: Option<&serde_json::Value>,
) -> Result<Transaction, ModelError> {
    let metadata_json = metadata_payload.map(serde_json::to_string).transpose()?;

    let changed = conn.execute(
        "UPDATE transactions
         SET status = ?2,
             metadata_payload = COALESCE(?3, metadata_payload)
         WHERE id = ?1",
        params![id, status.as_str(), metadata_json],
    )?;
    if changed == 0 {
        return Err(ModelError::not_found("transaction", id));
    }

    tracing::info!(transaction_id = id, status = status.as_str(), "transaction status updated");

    get_transaction(conn, id)
}

fn stored_label<T: FromStr>(row: &Row, idx: usize) -> rusqlite::Result<Option<Label<T>>> {
    Ok(row.get::<_, Option<String>>(idx)?.map(Label::from_stored))
}

fn map_row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let metadata_payload = row
        .get::<_, Option<String>>(12)?
        .map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        store_id: row.get(2)?,
        total_amount: row.get(3)?,
        discount_amount: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
        final_amount: row.get(5)?,
        payment_method: stored_label(row, 6)?,
        gateway_provider: stored_label(row, 7)?,
        gateway_transaction_id: row.get(8)?,
        status: stored_label(row, 9)?.unwrap_or_else(|| TransactionStatus::default().into()),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        metadata_payload,
    })
}
