use anyhow::{Context, Result, bail};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::DriverManager;
use domain::DomainError;
use domain::event::EventListener;
use domain::storage::{TimeIndexedStore, latest_record};
use infrastructure::config::NodeConfig;
use infrastructure::messaging::StorageArchiver;
use infrastructure::storage::{StorageConfig, StorageFactory};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Only run the driver with this id
    #[arg(long)]
    driver: Option<String>,

    /// Seconds between two status reports
    #[arg(long, default_value_t = 30)]
    status_interval_secs: u64,
}

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,sensor_node=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("📷 Sensor Node Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    // 1. Load Configuration
    info!(config_dir = %args.config_dir, "Loading configuration...");
    let mut config = NodeConfig::load(&args.config_dir)
        .with_context(|| format!("Failed to load configuration from {}", args.config_dir))?;

    if let Some(only) = &args.driver {
        config.drivers.retain(|d| &d.config.id == only);
        if config.drivers.is_empty() {
            bail!("Driver {} is not configured", only);
        }
    }

    if let Some(path) = &config.module_config_path {
        info!("📂 Module config path: {}", path);
    }
    info!(node_id = %config.node_id, drivers = config.drivers.len(), "✅ Configuration loaded");

    // 2. Archive
    if let StorageConfig::Sqlite { url } = &config.storage {
        ensure_sqlite_dir(url)?;
    }
    let store = StorageFactory::create(&config.storage)
        .await
        .context("Failed to open archive")?;
    let archiver = Arc::new(StorageArchiver::new(store.clone()));
    let archive_listener: Arc<dyn EventListener> = archiver.clone();

    // 3. Drivers
    let manager = DriverManager::from_config(&config, &[archive_listener]).await?;
    let started = manager.start_all().await;
    info!(started, configured = manager.len(), "✅ Drivers started");

    // 4. Status loop
    let status_store = store.clone();
    let status_archiver = archiver.clone();
    let status_interval = Duration::from_secs(args.status_interval_secs.max(1));
    let status_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(status_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            match status_store.record_count().await {
                Ok(total) => info!(
                    archived = status_archiver.archived_count(),
                    total,
                    "📊 Archive status"
                ),
                Err(e) => warn!(error = %e, "Failed to read archive status"),
            }
            if let Err(e) = log_latest_records(status_store.as_ref()).await {
                warn!(error = %e, "Failed to read latest records");
            }
        }
    });

    // 5. Shutdown Signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutting down..."),
        Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
    }

    status_handle.abort();
    for (driver_id, report) in manager.stop_all().await {
        if !report.is_clean() {
            warn!(driver_id = %driver_id, diagnostics = ?report.diagnostics(), "Driver stopped with errors");
        }
    }

    match store.time_range().await {
        Ok(range) => match range.bounds() {
            Some((start, end)) => info!(start, end, "💾 Archive covers"),
            None => info!("💾 Archive is empty"),
        },
        Err(e) => warn!(error = %e, "Failed to read archive range"),
    }

    info!("👋 Good bye!");
    Ok(())
}

/// Log the newest archived record of every producer
async fn log_latest_records(store: &dyn TimeIndexedStore) -> Result<(), DomainError> {
    for producer_id in store.producer_ids().await? {
        if let Some(record) = latest_record(store, &producer_id).await? {
            info!(producer_id = %producer_id, timestamp = record.timestamp, data = %record.data, "Latest record");
        }
    }
    Ok(())
}

/// Create the parent directory of a file-backed SQLite url
fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path.starts_with(':') || url.starts_with("sqlite::memory:") {
        return Ok(());
    }
    if let Some(dir) = std::path::Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        }
    }
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
