//! Connection pool factory.
//!
//! The pool is built once at startup from [`DatabaseConfig`] and handed to the
//! repositories that need it; nothing here keeps a process-global handle.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use url::Url;

use crate::config::DatabaseConfig;

const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Typed error for the connection factory.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database URL not configured")]
    MissingUrl,

    #[error("Invalid database DSN '{dsn}': {reason}")]
    InvalidDsn { dsn: String, reason: String },

    #[error("Unsupported database type: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Sea(#[from] DbErr),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Pool knobs; each is applied only when set, otherwise the driver default stays.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections kept open.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Emit every statement through the `sqlx` logger.
    pub sqlx_logging: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            sqlx_logging: false,
        }
    }
}

impl From<&DatabaseConfig> for ConnectOpts {
    fn from(cfg: &DatabaseConfig) -> Self {
        let defaults = Self::default();
        Self {
            max_conns: cfg.max_conns.or(defaults.max_conns),
            acquire_timeout: cfg
                .acquire_timeout_sec
                .map(Duration::from_secs)
                .or(defaults.acquire_timeout),
            ..defaults
        }
    }
}

/// Detect DB backend from URL scheme.
pub fn detect_engine(dsn: &str) -> Result<DbEngine, DbError> {
    let raw = dsn.trim();
    if raw.is_empty() {
        return Err(DbError::MissingUrl);
    }
    if is_sqlite_memory(raw) {
        return Ok(DbEngine::Sqlite);
    }

    let url = Url::parse(raw).map_err(|e| DbError::InvalidDsn {
        dsn: redact_credentials(raw),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "sqlite" | "sqlite3" => Ok(DbEngine::Sqlite),
        "postgres" | "postgresql" => Ok(DbEngine::Postgres),
        other => Err(DbError::Unsupported(other.to_string())),
    }
}

fn is_sqlite_memory(dsn: &str) -> bool {
    dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
}

/// Replace the password part of a DSN so it can be logged.
pub fn redact_credentials(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => dsn.to_string(),
    }
}

/// Open a pooled connection.
pub async fn connect(dsn: &str, opts: &ConnectOpts) -> Result<DatabaseConnection, DbError> {
    let engine = detect_engine(dsn)?;

    let mut options = ConnectOptions::new(dsn.trim().to_string());
    options.sqlx_logging(opts.sqlx_logging);

    // An in-memory SQLite database disappears with its last connection: keep
    // exactly one open and never recycle it.
    let in_memory = engine == DbEngine::Sqlite && is_sqlite_memory(dsn.trim());
    let (max_conns, min_conns) = if in_memory {
        options
            .idle_timeout(MEMORY_CONN_LIFETIME)
            .max_lifetime(MEMORY_CONN_LIFETIME);
        (Some(1), Some(1))
    } else {
        (opts.max_conns, opts.min_conns)
    };

    if let Some(n) = max_conns {
        options.max_connections(n);
    }
    if let Some(n) = min_conns {
        options.min_connections(n);
    }
    if let Some(t) = opts.acquire_timeout {
        options.acquire_timeout(t);
    }
    if let Some(t) = opts.idle_timeout.filter(|_| !in_memory) {
        options.idle_timeout(t);
    }

    tracing::info!(engine = ?engine, dsn = %redact_credentials(dsn), "Connecting to database");
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Open a pool described by the `database` config section.
pub async fn connect_from_config(cfg: &DatabaseConfig) -> Result<DatabaseConnection, DbError> {
    connect(&cfg.url, &ConnectOpts::from(cfg)).await
}
