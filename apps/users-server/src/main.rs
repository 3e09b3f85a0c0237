use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm_migration::MigratorTrait;
use users::api::rest::{middleware::HttpOptions, routes};
use users::infra::storage::{migrations::Migrator, SeaOrmUsersRepository};

mod shutdown;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps in-memory DSNs as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    // Create the file on first start unless the DSN says otherwise.
    match query {
        Some(q) => {
            out.push('?');
            out.push_str(q);
        }
        None => out.push_str("?mode=rwc"),
    }
    Ok(out)
}

/// Users Server - CRUD service for the users resource
#[derive(Parser)]
#[command(name = "users-server")]
#[command(about = "Users Server - CRUD service for the users resource")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database instead of the configured one
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; present variables feed the APP__ layer below.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Users server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn bind_addr(config: &AppConfig) -> Result<SocketAddr> {
    let raw = format!("{}:{}", config.server.host, config.server.port);
    raw.parse()
        .with_context(|| format!("invalid bind address '{raw}'"))
}

/// The `database` section with its DSN checked and sqlite paths made absolute.
fn resolve_database(config: &AppConfig, create_dirs: bool) -> Result<DatabaseConfig> {
    let mut db = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("Database configuration missing"))?;

    runtime::db::detect_engine(&db.url)?;
    if db.url.trim().starts_with("sqlite") {
        db.url = absolutize_sqlite_dsn(db.url.trim(), Path::new(&config.server.home_dir), create_dirs)?;
    }
    Ok(db)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let addr = bind_addr(&config)?;
    let db_config = resolve_database(&config, true)?;

    let conn = runtime::db::connect_from_config(&db_config)
        .await
        .context("failed to connect to database")?;
    Migrator::up(&conn, None)
        .await
        .context("failed to prepare the users table")?;
    tracing::info!("Users table ready");

    let repo = Arc::new(SeaOrmUsersRepository::new(conn));
    let http = HttpOptions {
        cors_enabled: config.server.cors_enabled,
        body_limit_bytes: config.server.body_limit_bytes,
    };
    let app = routes::router(repo, &http);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    bind_addr(config)?;
    let db = resolve_database(config, false)?;
    tracing::info!(
        dsn = %runtime::db::redact_credentials(&db.url),
        "Database DSN accepted"
    );

    tracing::info!("Configuration is valid");
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_paths_are_resolved_against_home_dir() {
        let base = Path::new("/srv/users");
        assert_eq!(
            absolutize_sqlite_dsn("sqlite://data/users.db", base, false).unwrap(),
            "sqlite:///srv/users/data/users.db?mode=rwc"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite:///var/lib/users.db?mode=ro", base, false).unwrap(),
            "sqlite:///var/lib/users.db?mode=ro"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite::memory:", base, false).unwrap(),
            "sqlite::memory:"
        );
        assert!(absolutize_sqlite_dsn("sqlite://", base, false).is_err());
    }

    #[test]
    fn bind_address_must_parse() {
        let mut config = AppConfig::default();
        assert!(bind_addr(&config).is_ok());

        config.server.host = "not an address".into();
        let err = bind_addr(&config).unwrap_err();
        assert!(err.to_string().contains("invalid bind address"));
    }

    #[test]
    fn missing_database_section_is_an_error() {
        let mut config = AppConfig::default();
        config.database = None;
        assert!(resolve_database(&config, false).is_err());
    }
}
