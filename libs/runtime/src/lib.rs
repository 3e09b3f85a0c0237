//! Process-level plumbing shared by the server binary: layered configuration,
//! logging setup and the database connection factory.

pub mod config;
pub mod db;
pub mod logging;

pub use config::{AppConfig, CliArgs, ConfigError, DatabaseConfig, LoggingConfig, Section, ServerConfig};
pub use db::{ConnectOpts, DbEngine, DbError};
