//! DataDAO Server
//!
//! Runs the DataDAO REST API over a SQLite-backed key-value store.

use anyhow::{Context, Result};
use clap::Parser;
use datadao::api::{run_server, ApiState};
use datadao::config::default_data_dir;
use datadao::util::clock::SystemClock;
use datadao::{DaoConfig, DataDao, KvStore, SqliteKv};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "datadao-server")]
#[command(about = "DataDAO marketplace HTTP server")]
struct Args {
    /// Server port
    #[arg(short, long, default_value = "3000", env = "DATADAO_PORT")]
    port: u16,

    /// Server host
    #[arg(long, default_value = "0.0.0.0", env = "DATADAO_HOST")]
    host: String,

    /// Data directory (defaults to the user data dir)
    #[arg(short, long, env = "DATADAO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "DATADAO_CONFIG")]
    config: Option<PathBuf>,

    /// Keep all state in memory (lost on exit)
    #[arg(long)]
    in_memory: bool,

    /// Sentry DSN for error monitoring
    #[arg(long, env = "SENTRY_DSN", hide_env_values = true)]
    sentry_dsn: Option<String>,
}

fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn.filter(|d| !d.is_empty())?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

fn init_tracing(with_sentry: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("datadao=debug,info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    if with_sentry {
        registry.with(sentry_tracing::layer()).init();
    } else {
        registry.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Sentry must be initialised before the runtime starts its threads
    let sentry_guard = init_sentry(args.sentry_dsn.as_deref());
    init_tracing(sentry_guard.is_some());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => DaoConfig::load(path)?,
        None => DaoConfig::default(),
    };

    let store: Arc<dyn KvStore> = if args.in_memory {
        warn!("Running with an in-memory store, state is lost on exit");
        Arc::new(SqliteKv::open_in_memory()?)
    } else {
        let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
        Arc::new(SqliteKv::open(data_dir.join("datadao.db"))?)
    };

    info!("Starting DataDAO Server");
    info!("  Config: {}", args.config.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".to_string()));
    info!("  Consensus: {:?}", config.review.consensus);
    info!("  Faucet: {}", if config.faucet.enabled { "enabled" } else { "disabled" });
    info!("  Admins: {}", config.admins.len());

    let dao = Arc::new(DataDao::new(store, Arc::new(SystemClock), config));
    let state = Arc::new(ApiState::new(dao));

    run_server(state, &args.host, args.port).await
}
