use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod catalog;
use catalog::HttpCatalogClient;

mod config;
use config::{AppConfig, CliConfig, FileConfig};

mod server;
use server::{run_server, RequestsLoggingLevel};

mod sqlite_persistence;

mod stats;
use stats::SqliteStatsStore;

mod user;
use user::SqliteUserStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite databases (stats.db, user.db).
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the content catalog API.
    #[clap(long)]
    pub catalog_base_url: Option<String>,

    /// Header whose value is treated as a role name, bypassing auth.
    /// Local development only.
    #[clap(long)]
    pub dev_role_header: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
        catalog_base_url: cli_args.catalog_base_url,
        dev_role_header: cli_args.dev_role_header,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    // Initialize metrics system
    info!("Initializing metrics...");
    server::metrics::init_metrics();

    info!(
        "Opening SQLite stats database at {:?}...",
        config.stats_db_path()
    );
    let stats_store = Arc::new(SqliteStatsStore::new(
        config.stats_db_path(),
        config.capabilities,
    )?);

    let user_store = Box::new(SqliteUserStore::new(config.user_db_path())?);

    info!("Content catalog at {}", config.catalog_base_url);
    let catalog = Arc::new(HttpCatalogClient::new(config.catalog_base_url.clone())?);

    if let Some(header) = &config.dev_role_header {
        info!("Dev role header {:?} enabled, do not expose this server", header);
    }

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(
        config.server_config(),
        config.capabilities,
        stats_store,
        catalog,
        user_store,
    )
    .await
}
