//! Connection pool creation and configuration.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::time::Duration;
use thiserror::Error;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,

    /// How long a checkout waits for a free connection before failing,
    /// in milliseconds.
    pub connection_timeout_ms: u64,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
            connection_timeout_ms: 30_000,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// `DATABASE_URL` names a database this build cannot open.
    #[error("unsupported database url '{0}': expected sqlite://<path>, sqlite::memory: or a file path")]
    UnsupportedUrl(String),

    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Where a `DATABASE_URL` points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// A private in-memory database per connection.
    Memory,
    /// A database file on disk.
    File(String),
}

/// Parses `DATABASE_URL` into a [`DatabaseTarget`].
///
/// Accepted forms are `sqlite://<path>`, `sqlite:<path>`, `sqlite::memory:`,
/// `:memory:` and a bare file path. Any other `scheme://` is rejected.
///
/// # Errors
///
/// Returns `PoolError::UnsupportedUrl` for foreign schemes or an empty path.
pub fn database_target(database_url: &str) -> Result<DatabaseTarget, PoolError> {
    let url = database_url.trim();
    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if url.contains("://") {
        return Err(PoolError::UnsupportedUrl(database_url.to_string()));
    } else {
        url
    };

    // Query parameters such as `?mode=rwc` are accepted and ignored.
    let path = path.split('?').next().unwrap_or_default();

    match path {
        "" => Err(PoolError::UnsupportedUrl(database_url.to_string())),
        ":memory:" => Ok(DatabaseTarget::Memory),
        file => Ok(DatabaseTarget::File(file.to_string())),
    }
}

/// Creates the SQLite connection pool bound to `database_url`.
///
/// Every connection is opened with WAL journaling, foreign keys on, and the
/// configured busy timeout. Note that each connection to an in-memory target
/// sees its own empty database.
///
/// # Errors
///
/// Returns `PoolError::UnsupportedUrl` if the URL cannot be parsed, or
/// `PoolError::PoolInit` if the connection pool cannot be created.
pub fn create_pool(database_url: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = match database_target(database_url)? {
        DatabaseTarget::Memory => SqliteConnectionManager::memory(),
        DatabaseTarget::File(path) => SqliteConnectionManager::file(path),
    };

    let manager = manager.with_flags(flags).with_init(move |conn| {
        // In-memory databases report "memory", which is expected.
        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        if journal_mode != "wal" && journal_mode != "memory" {
            return Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!(
                    "failed to set WAL journal mode, got: {}",
                    journal_mode
                )),
            ));
        }
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = {};",
            settings.busy_timeout_ms
        ))
    });

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .connection_timeout(Duration::from_millis(settings.connection_timeout_ms))
        .build(manager)?;

    tracing::debug!(
        max_size = settings.pool_max_size,
        "database connection pool ready"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_database_urls() {
        assert_eq!(
            database_target("sqlite://data/jgm.db").unwrap(),
            DatabaseTarget::File("data/jgm.db".to_string())
        );
        assert_eq!(
            database_target("sqlite:///var/lib/jgm.db?mode=rwc").unwrap(),
            DatabaseTarget::File("/var/lib/jgm.db".to_string())
        );
        assert_eq!(
            database_target("sqlite:jgm.db").unwrap(),
            DatabaseTarget::File("jgm.db".to_string())
        );
        assert_eq!(database_target("sqlite::memory:").unwrap(), DatabaseTarget::Memory);
        assert_eq!(database_target(":memory:").unwrap(), DatabaseTarget::Memory);
        assert_eq!(
            database_target("./jgm.db").unwrap(),
            DatabaseTarget::File("./jgm.db".to_string())
        );
    }

    #[test]
    fn rejects_foreign_schemes() {
        let err = database_target("postgresql://user:pw@localhost/jgm").unwrap_err();
        assert!(matches!(err, PoolError::UnsupportedUrl(_)));
        assert!(database_target("sqlite://").is_err());
        assert!(database_target("   ").is_err());
    }

    #[test]
    fn create_in_memory_pool() {
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 2_500,
            pool_max_size: 3,
            connection_timeout_ms: 1_000,
        };

        let pool = create_pool("sqlite::memory:", settings).expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");

        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .expect("should query journal_mode");
        assert!(
            mode == "wal" || mode == "memory",
            "unexpected journal_mode: {mode}"
        );

        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .expect("should query foreign_keys");
        assert_eq!(fk, 1, "foreign keys should be enabled");

        let busy_timeout: i32 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("should query busy_timeout");
        assert_eq!(busy_timeout, 2_500, "busy timeout should match settings");

        assert_eq!(pool.max_size(), 3, "pool max size should match settings");
    }
}
