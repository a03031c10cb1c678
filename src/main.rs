use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bedflow_core::{
    AllocationService, CoreConfig, FileStore, LogSink,
    config::{
        cleaning_minutes_from_env_value, load_bed_seed, overflow_ward_from_env_value,
        ward_priority_from_env_value,
    },
    constants::DEFAULT_DATA_FILE,
};

/// Seconds between sweeps that return cleaned beds to `available`.
const CLEANING_SWEEP_SECS: u64 = 60;

/// Main entry point for the Bedflow server
///
/// Loads configuration, opens the data file, provisions beds from the seed file when one is
/// given, reports any broken bed/patient links, then serves the REST API. A background task
/// returns beds to `available` once their cleaning time has passed.
///
/// # Environment Variables
/// - `BEDFLOW_DATA_FILE`: YAML data file (default: "bedflow_data.yaml")
/// - `BEDFLOW_SEED_FILE`: optional YAML list of beds to provision at startup
/// - `BEDFLOW_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `BEDFLOW_OVERFLOW_WARD`: overflow ward name (default: "Emergency")
/// - `BEDFLOW_WARD_PRIORITY`: comma separated ward order for emergency matching
/// - `BEDFLOW_CLEANING_MINUTES`: cleaning duration after discharge (default: 30)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any configuration value is invalid,
/// - the data or seed file cannot be read,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bedflow_run=info".parse()?)
                .add_directive("bedflow_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::new(
        overflow_ward_from_env_value(std::env::var("BEDFLOW_OVERFLOW_WARD").ok())?,
        ward_priority_from_env_value(std::env::var("BEDFLOW_WARD_PRIORITY").ok())?,
        cleaning_minutes_from_env_value(std::env::var("BEDFLOW_CLEANING_MINUTES").ok())?,
    )?);

    let data_file = std::env::var("BEDFLOW_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.into());
    let store = Arc::new(FileStore::open(&data_file)?);
    tracing::info!("++ Using data file {}", store.path().display());

    let service = AllocationService::new(cfg, store, Arc::new(LogSink));

    if let Some(seed) = std::env::var("BEDFLOW_SEED_FILE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
    {
        let added = service.provision_beds(load_bed_seed(&seed)?)?;
        tracing::info!("++ Provisioned {} bed(s) from {}", added.len(), seed.display());
    }

    for problem in service.audit()? {
        tracing::warn!(%problem, "bed/patient link inconsistent");
    }

    let sweeper = service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CLEANING_SWEEP_SECS));
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.complete_cleaning(chrono::Utc::now()) {
                tracing::error!("cleaning sweep failed: {:?}", e);
            }
        }
    });

    let rest_addr = std::env::var("BEDFLOW_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("++ Starting Bedflow REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(service)).await?;

    Ok(())
}
