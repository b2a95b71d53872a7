//! Applies pending schema migrations to the database named by `DATABASE_URL`.
//!
//! This is the only place tables are created; the API server never does it.

use jgm_server::{config, init_tracing};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config_path = config::resolve_process_config_path();

    let settings = match config::load_settings(Some(&config_path.path)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("jgm-migrate: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.logging);
    tracing::info!(
        source = config_path.source,
        path = %config_path.path,
        "resolved migration configuration"
    );

    let runtime = jgm_db::DbRuntimeSettings {
        pool_max_size: 1,
        ..settings.database.runtime_settings()
    };
    let pool = match jgm_db::create_pool(&settings.database_url, runtime) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            return ExitCode::FAILURE;
        }
    };

    let result = pool
        .get()
        .map_err(|e| e.to_string())
        .and_then(|conn| jgm_db::run_migrations(&conn).map_err(|e| e.to_string()));

    match result {
        Ok(applied) => {
            tracing::info!(count = applied, "database migrations complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "migration failed");
            ExitCode::FAILURE
        }
    }
}
