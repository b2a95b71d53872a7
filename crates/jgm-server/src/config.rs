//! Settings loading from the environment, `.env`, and an optional TOML file.
//!
//! The database credentials, `DATABASE_URL` and `SECRET_KEY` are required and
//! only ever come from the environment (or a `.env` file loaded into it).
//! Network, pool and logging tunables have defaults, may be set in a TOML
//! file, and may be overridden by `JGM_*` variables.

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Variables that must be present and non-empty at startup.
pub const REQUIRED_VARS: [&str; 5] = [
    "DB_USER",
    "DB_PASSWORD",
    "DB_NAME",
    "DATABASE_URL",
    "SECRET_KEY",
];

/// Validated process configuration. Built once in `main` and shared through
/// [`AppState`](crate::AppState).
#[derive(Clone)]
pub struct Settings {
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub database_url: String,
    /// Key used to sign access tokens.
    pub secret_key: String,
    /// Deployment label reported by `GET /` (`APP_ENV`, default `dev`).
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("db_user", &self.db_user)
            .field("db_password", &"<redacted>")
            .field("db_name", &self.db_name)
            .field("database_url", &self.database_url)
            .field("secret_key", &"<redacted>")
            .field("environment", &self.environment)
            .field("server", &self.server)
            .field("database", &self.database)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Optional tunables read from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Connection pool tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// How long a request waits for a free connection, in milliseconds.
    #[serde(default = "default_pool_timeout_ms")]
    pub pool_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "jgm_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_pool_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            pool_timeout_ms: default_pool_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl DatabaseConfig {
    /// Converts the tunables into pool settings.
    pub fn runtime_settings(&self) -> jgm_db::DbRuntimeSettings {
        jgm_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
            connection_timeout_ms: self.pool_timeout_ms,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: '{value}'")]
    InvalidVar { var: &'static str, value: String },

    /// A key in the configuration file holds an unusable value.
    #[error("invalid value for config key {key}: '{value}'")]
    InvalidSetting { key: &'static str, value: String },

    /// The `.env` file exists but could not be read.
    #[error("failed to load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Config file used when neither a CLI argument nor `JGM_CONFIG_PATH` names one.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Where the config file path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: String,
    /// `cli-arg`, `env-var` or `default`.
    pub source: &'static str,
}

/// Picks the config file path from the first CLI argument, then
/// `JGM_CONFIG_PATH`, then [`DEFAULT_CONFIG_PATH`]. Blank values are skipped.
pub fn resolve_config_path(cli_arg: Option<String>, env_var: Option<String>) -> ConfigPath {
    let non_blank = |value: &String| !value.trim().is_empty();

    if let Some(path) = cli_arg.filter(non_blank) {
        return ConfigPath {
            path,
            source: "cli-arg",
        };
    }
    if let Some(path) = env_var.filter(non_blank) {
        return ConfigPath {
            path,
            source: "env-var",
        };
    }
    ConfigPath {
        path: DEFAULT_CONFIG_PATH.to_string(),
        source: "default",
    }
}

/// [`resolve_config_path`] for the running process.
pub fn resolve_process_config_path() -> ConfigPath {
    resolve_config_path(std::env::args().nth(1), std::env::var("JGM_CONFIG_PATH").ok())
}

/// Loads `.env` from the working directory (or its parents) into the process
/// environment. Variables that are already set are not overwritten. A missing
/// file is not an error.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env file");
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::DotEnv(e)),
    }
}

/// Reads the TOML tunables file, falling back to defaults when `path` is
/// `None` or the file does not exist.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_file_config(path: Option<&str>) -> Result<FileConfig, ConfigError> {
    match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = p, "config file not found, using defaults");
                Ok(FileConfig::default())
            }
            Err(e) => Err(ConfigError::FileRead(e)),
        },
        None => Ok(FileConfig::default()),
    }
}

/// Loads the full settings: `.env`, then the TOML file, then the process
/// environment.
///
/// Environment variable overrides:
/// - `JGM_HOST`, `JGM_PORT` override `server.host` / `server.port`
/// - `JGM_POOL_MAX_SIZE`, `JGM_POOL_TIMEOUT_MS`, `JGM_BUSY_TIMEOUT_MS`
///   override the `database` section
/// - `JGM_LOG_LEVEL`, `JGM_LOG_JSON` override the `logging` section
/// - `APP_ENV` sets the reported environment
///
/// # Errors
///
/// Fails if any of [`REQUIRED_VARS`] is missing, if an override cannot be
/// parsed, or if the `.env` or TOML file is unreadable.
pub fn load_settings(path: Option<&str>) -> Result<Settings, ConfigError> {
    load_dotenv()?;
    let file = load_file_config(path)?;
    settings_from_lookup(file, |key| std::env::var(key).ok())
}

/// Builds [`Settings`] from `file` and a variable lookup.
pub fn settings_from_lookup<F>(file: FileConfig, lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |var: &'static str| {
        lookup(var)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingVar(var))
    };

    let FileConfig {
        mut server,
        mut database,
        mut logging,
    } = file;

    if let Some(host) = parse_override(&lookup, "JGM_HOST")? {
        server.host = host;
    }
    if let Some(port) = parse_override(&lookup, "JGM_PORT")? {
        server.port = port;
    }
    if let Some(size) = parse_override::<_, u32>(&lookup, "JGM_POOL_MAX_SIZE")? {
        if size == 0 {
            return Err(ConfigError::InvalidVar {
                var: "JGM_POOL_MAX_SIZE",
                value: size.to_string(),
            });
        }
        database.pool_max_size = size;
    }
    if let Some(ms) = parse_override(&lookup, "JGM_POOL_TIMEOUT_MS")? {
        database.pool_timeout_ms = ms;
    }
    if let Some(ms) = parse_override(&lookup, "JGM_BUSY_TIMEOUT_MS")? {
        database.busy_timeout_ms = ms;
    }
    if let Some(level) = lookup("JGM_LOG_LEVEL") {
        logging.level = level;
    }
    if let Some(json) = lookup("JGM_LOG_JSON") {
        logging.json = json == "true" || json == "1";
    }

    if database.pool_max_size == 0 {
        return Err(ConfigError::InvalidSetting {
            key: "database.pool_max_size",
            value: database.pool_max_size.to_string(),
        });
    }

    Ok(Settings {
        db_user: required("DB_USER")?,
        db_password: required("DB_PASSWORD")?,
        db_name: required("DB_NAME")?,
        database_url: required("DATABASE_URL")?,
        secret_key: required("SECRET_KEY")?,
        environment: lookup("APP_ENV")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(default_environment),
        server,
        database,
        logging,
    })
}

fn parse_override<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { var, value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required_vars() -> HashMap<String, String> {
        vars(&[
            ("DB_USER", "jgm"),
            ("DB_PASSWORD", "hunter2"),
            ("DB_NAME", "justgo"),
            ("DATABASE_URL", "sqlite://justgo.db"),
            ("SECRET_KEY", "s3cret"),
        ])
    }

    fn load(env: &HashMap<String, String>) -> Result<Settings, ConfigError> {
        settings_from_lookup(FileConfig::default(), |k| env.get(k).cloned())
    }

    #[test]
    fn loads_required_vars_with_defaults() {
        let settings = load(&required_vars()).expect("settings should load");
        assert_eq!(settings.db_user, "jgm");
        assert_eq!(settings.database_url, "sqlite://justgo.db");
        assert_eq!(settings.environment, "dev");
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.database.pool_max_size, 8);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn each_required_var_is_enforced() {
        for var in REQUIRED_VARS {
            let mut env = required_vars();
            env.remove(var);
            match load(&env) {
                Err(ConfigError::MissingVar(missing)) => assert_eq!(missing, var),
                other => panic!("expected MissingVar({var}), got {other:?}"),
            }

            let mut env = required_vars();
            env.insert(var.to_string(), "   ".to_string());
            assert!(matches!(load(&env), Err(ConfigError::MissingVar(_))));
        }
    }

    #[test]
    fn overrides_apply_and_are_validated() {
        let mut env = required_vars();
        env.extend(vars(&[
            ("JGM_HOST", "0.0.0.0"),
            ("JGM_PORT", "9090"),
            ("JGM_POOL_MAX_SIZE", "2"),
            ("JGM_LOG_JSON", "1"),
            ("APP_ENV", "production"),
        ]));
        let settings = load(&env).expect("settings should load");
        assert_eq!(settings.server.host.to_string(), "0.0.0.0");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.database.pool_max_size, 2);
        assert!(settings.logging.json);
        assert_eq!(settings.environment, "production");

        env.insert("JGM_PORT".to_string(), "eighty".to_string());
        assert!(matches!(
            load(&env),
            Err(ConfigError::InvalidVar { var: "JGM_PORT", .. })
        ));

        env.insert("JGM_PORT".to_string(), "80".to_string());
        env.insert("JGM_POOL_MAX_SIZE".to_string(), "0".to_string());
        assert!(matches!(
            load(&env),
            Err(ConfigError::InvalidVar { var: "JGM_POOL_MAX_SIZE", .. })
        ));
    }

    #[test]
    fn empty_pool_in_file_names_the_file_key() {
        let file: FileConfig = toml::from_str("[database]\npool_max_size = 0\n").unwrap();
        let env = required_vars();
        let err = settings_from_lookup(file.clone(), |k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSetting { key: "database.pool_max_size", .. }
        ));

        // An environment override still wins over the file.
        let mut env = required_vars();
        env.extend(vars(&[("JGM_POOL_MAX_SIZE", "4")]));
        let settings = settings_from_lookup(file, |k| env.get(k).cloned()).unwrap();
        assert_eq!(settings.database.pool_max_size, 4);
    }

    #[test]
    fn config_path_prefers_cli_then_env() {
        let resolved = resolve_config_path(Some("cli.toml".into()), Some("env.toml".into()));
        assert_eq!(resolved.path, "cli.toml");
        assert_eq!(resolved.source, "cli-arg");

        let resolved = resolve_config_path(Some("  ".into()), Some("env.toml".into()));
        assert_eq!(resolved.path, "env.toml");
        assert_eq!(resolved.source, "env-var");

        let resolved = resolve_config_path(None, Some(String::new()));
        assert_eq!(resolved.path, DEFAULT_CONFIG_PATH);
        assert_eq!(resolved.source, "default");
    }

    #[test]
    fn toml_file_sets_tunables() {
        let file: FileConfig = toml::from_str(
            r#"
            [server]
            port = 4000

            [database]
            pool_max_size = 3

            [logging]
            level = "debug"
            "#,
        )
        .expect("toml should parse");
        let env = required_vars();
        let settings = settings_from_lookup(file, |k| env.get(k).cloned()).unwrap();
        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.database.pool_max_size, 3);
        assert_eq!(settings.database.pool_timeout_ms, 5_000);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let file = load_file_config(Some("/nonexistent/jgm-config.toml")).unwrap();
        assert_eq!(file.server.port, 8000);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let settings = load(&required_vars()).unwrap();
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
