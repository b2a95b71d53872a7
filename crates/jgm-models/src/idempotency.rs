//! Idempotency keys for write requests.
//!
//! A client may tag a write with a key. The first request carrying it claims
//! the key for [`IDEMPOTENCY_TTL_SECS`]; any repeat inside that window is a
//! conflict, whether the first request finished or is still running.

use rusqlite::{params, Connection};

use crate::ModelError;

/// How long a claimed key blocks repeats (24 hours).
pub const IDEMPOTENCY_TTL_SECS: i64 = 24 * 60 * 60;

/// Message reported when a key has already been claimed.
pub const IDEMPOTENCY_CONFLICT_MESSAGE: &str = "Request already processed or in progress";

/// Longest key accepted, in bytes.
const MAX_KEY_LEN: usize = 255;

/// Claims `key` for the request identified by `method` and `path`.
///
/// Expired keys are purged first, so a key can be reused once its window has
/// passed. Run this inside the same transaction as the guarded write to
/// release the key when that write fails.
///
/// # Errors
///
/// - `ModelError::Invalid` if the key is blank or too long.
/// - `ModelError::Conflict` if the key is still claimed.
pub fn claim_idempotency_key(
    conn: &Connection,
    key: &str,
    method: &str,
    path: &str,
) -> Result<(), ModelError> {
    let key = key.trim();
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(ModelError::Invalid(format!(
            "idempotency key: must be 1 to {MAX_KEY_LEN} bytes"
        )));
    }

    purge_expired_idempotency_keys(conn)?;

    conn.execute(
        "INSERT INTO idempotency_keys (key, method, path) VALUES (?1, ?2, ?3)",
        params![key, method, path],
    )
    .map_err(|e| {
        ModelError::from_write(e, || {
            tracing::warn!(idempotency_key = key, "idempotency key already claimed");
            IDEMPOTENCY_CONFLICT_MESSAGE.to_string()
        })
    })?;

    Ok(())
}

/// Deletes keys whose window has passed. Returns the number removed.
pub fn purge_expired_idempotency_keys(conn: &Connection) -> Result<usize, ModelError> {
    let removed = conn.execute(
        "DELETE FROM idempotency_keys
         WHERE created_at_unix <= CAST(strftime('%s', 'now') AS INTEGER) - ?1",
        [IDEMPOTENCY_TTL_SECS],
    )?;
    if removed > 0 {
        tracing::debug!(removed, "purged expired idempotency keys");
    }
    Ok(removed)
}
