//! Database layer for the Just Go Market backend.
//!
//! Provides the process-wide SQLite connection pool (via `r2d2`), parsing of
//! `DATABASE_URL`, and the embedded schema migrations.
//!
//! # Sessions
//!
//! A session is a connection checked out with [`DbPool::get`]. The returned
//! guard hands the connection back to the pool when it is dropped, so every
//! exit path of the caller (early return, `?`, panic unwinding) releases it.
//! There is no retry: a failed checkout is returned to the caller as is.
//!
//! # Migrations
//!
//! Tables are only ever created by [`run_migrations`], which the
//! `jgm-migrate` binary calls. The API server never creates tables on start.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, database_target, DatabaseTarget, DbPool, DbRuntimeSettings, PoolError};
