//! Domain records for the Just Go Market backend and their persistence.
//!
//! Each record maps one-to-one onto a table created by the `jgm-db`
//! migrations:
//!
//! - [`Product`] → `products`, keyed by its SKU.
//! - [`Store`] → `stores`, with an auto-assigned id.
//! - [`Transaction`] → `transactions`, one row per payment attempt.
//!
//! `idempotency_keys` backs [`claim_idempotency_key`].
//!
//! All functions take a borrowed [`rusqlite::Connection`]; the caller owns
//! the session and decides when it goes back to the pool.

mod error;
mod idempotency;
mod product;
mod store;
mod transaction;

pub use error::ModelError;
pub use idempotency::{
    claim_idempotency_key, purge_expired_idempotency_keys, IDEMPOTENCY_CONFLICT_MESSAGE,
    IDEMPOTENCY_TTL_SECS,
};
pub use product::{
    create_product, delete_product, get_product, list_products, update_product,
    CreateProductParams, Product, UpdateProductParams,
};
pub use store::{
    create_store, delete_store, get_store, list_stores, update_store, CreateStoreParams, Store,
    UpdateStoreParams,
};
pub use transaction::{
    create_transaction, get_transaction, get_transaction_by_gateway_id, list_transactions,
    update_transaction_status, CreateTransactionParams, Transaction, TransactionFilter,
    AMOUNT_TOLERANCE,
};
