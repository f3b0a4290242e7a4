use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::{ModuleCtxBuilder, ModuleEntry, ModuleRegistry};
use modkit_db::{ConnectOpts, DbHandle};
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use api_ingress::{ApiIngress, ApiIngressConfig};
use backoffice::config::BackofficeConfig;
use backoffice::Backoffice;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(Arc<AppConfigProvider>);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
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

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Back-office API server for invoices, clients, jobs and expenses
#[derive(Parser)]
#[command(name = "backoffice-server")]
#[command(about = "Back-office API server for invoices, clients, jobs and expenses")]
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

    /// Use an in-memory database
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

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Backoffice server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config).await,
    }
}

/// Detect DB backend from URL scheme.
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.effective_url();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let url = Url::parse(&raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" | "sqlite3" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

fn bind_addr(config: &AppConfig) -> Result<SocketAddr> {
    let raw = format!("{}:{}", config.server.host, config.server.port);
    raw.parse()
        .with_context(|| format!("invalid bind address '{raw}'"))
}

async fn connect_db(db_config: &DatabaseConfig, base_dir: &Path) -> Result<Arc<DbHandle>> {
    let backend = detect_from_dsn(db_config)?;

    let mut dsn = db_config.effective_url();
    // Relative sqlite paths are resolved against server.home_dir, not the cwd
    if backend == "sqlite" {
        dsn = absolutize_sqlite_dsn(&dsn, base_dir, true)?;
    }

    let connect_opts = ConnectOpts {
        max_conns: db_config.max_conns,
        acquire_timeout: Some(Duration::from_secs(5)),
        busy_timeout: db_config
            .busy_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms))),
        create_sqlite_dirs: true,
    };

    tracing::info!(
        "Connecting to database: {}",
        modkit_db::redact_credentials_in_dsn(&dsn)
    );
    let db = DbHandle::connect(&dsn, connect_opts).await?;
    tracing::info!("Connected DB backend: {:?}", db.engine());
    Ok(Arc::new(db))
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");

    let addr = bind_addr(&config)?;
    let db_config = config
        .database
        .clone()
        .ok_or_else(|| anyhow!("database section is required to run the server"))?;
    let base_dir = PathBuf::from(&config.server.home_dir);
    let db = connect_db(&db_config, &base_dir).await?;

    let config_provider = Arc::new(ModkitConfigAdapter(Arc::new(AppConfigProvider::new(
        config.clone(),
    ))));
    let ctx = ModuleCtxBuilder::new()
        .with_db(db.clone())
        .with_config_provider(config_provider)
        .build();

    let ingress = Arc::new(ApiIngress::default());
    let office = Arc::new(Backoffice::new());
    let registry = ModuleRegistry::builder()
        .register(ModuleEntry::new(api_ingress::MODULE_NAME, ingress.clone()))
        .register(
            ModuleEntry::new(backoffice::module::MODULE_NAME, office.clone())
                .with_db(office.clone())
                .with_rest(office),
        )
        .build()?;

    registry.run_init_phase(&ctx).await?;
    registry.run_db_phase(&ctx).await?;
    let routes = registry.run_rest_phase(&ctx, axum::Router::new())?;
    let router = ingress.build_router(routes);

    let served = ingress
        .serve(router, addr, async {
            if let Err(e) = modkit::wait_for_shutdown().await {
                tracing::error!(error = %e, "shutdown signal listener failed");
            }
        })
        .await;

    db.close().await;
    tracing::info!("Backoffice server stopped");
    served
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    bind_addr(&config)?;
    if let Some(db) = &config.database {
        let backend = detect_from_dsn(db)?;
        tracing::info!(backend, "database DSN recognized");
    }
    if let Some(raw) = config.modules.get(api_ingress::MODULE_NAME) {
        serde_json::from_value::<ApiIngressConfig>(raw.clone())
            .context("invalid modules.api_ingress section")?;
    }
    if let Some(raw) = config.modules.get(backoffice::module::MODULE_NAME) {
        serde_json::from_value::<BackofficeConfig>(raw.clone())
            .context("invalid modules.backoffice section")?;
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_dsn_is_kept() {
        let dsn = absolutize_sqlite_dsn("sqlite://:memory:", Path::new("/srv"), false).unwrap();
        assert_eq!(dsn, "sqlite::memory:");
    }

    #[test]
    fn relative_sqlite_path_is_anchored_at_home() {
        let dir = tempfile::tempdir().unwrap();
        let dsn =
            absolutize_sqlite_dsn("sqlite://database/backoffice.db?mode=rwc", dir.path(), true)
                .unwrap();
        let expected = dir.path().join("database").join("backoffice.db");
        assert_eq!(
            dsn,
            format!(
                "sqlite://{}?mode=rwc",
                expected.to_string_lossy().replace('\\', "/")
            )
        );
        assert!(dir.path().join("database").is_dir());
    }

    #[test]
    fn dsn_scheme_detection() {
        let cfg = |url: &str| DatabaseConfig {
            url: url.to_string(),
            name: None,
            max_conns: None,
            busy_timeout_ms: None,
        };
        assert_eq!(detect_from_dsn(&cfg("sqlite::memory:")).unwrap(), "sqlite");
        assert_eq!(
            detect_from_dsn(&cfg("postgresql://u:p@db:5432/backoffice")).unwrap(),
            "postgres"
        );
        assert!(detect_from_dsn(&cfg("mysql://db/backoffice")).is_err());
        assert!(detect_from_dsn(&cfg("")).is_err());
    }

    #[test]
    fn bind_address_requires_ip_host() {
        let mut config = AppConfig::default();
        config.server.port = 8087;
        assert_eq!(
            bind_addr(&config).unwrap(),
            "127.0.0.1:8087".parse::<SocketAddr>().unwrap()
        );
        config.server.host = "not a host".to_string();
        assert!(bind_addr(&config).is_err());
    }
}
