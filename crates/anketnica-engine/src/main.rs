//! Host binary for the Anketnica game economy.
//!
//! Hunting, crafting and races run on demand from the bot's handlers; the
//! only work that runs on its own is the pair of price loops. This binary
//! owns them.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `anketnica-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `SQLite`, apply migrations and seed the house stable
//! 4. Spawn the stock and crypto price loops
//! 5. Wait for Ctrl-C, stop the loops and close the pool

mod error;

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use anketnica_casino::house_stable;
use anketnica_core::{
    EconomyConfig, LogFormat, LoggingConfig, SchedulerSummary, ShutdownSignal, shutdown_channel,
    spawn_periodic,
};
use anketnica_db::{SqliteConfig, SqliteStore};
use anketnica_market::{PriceEngine, PriceProfile};
use anketnica_types::InstrumentKind;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "anketnica-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the database or the signal handler
/// cannot be set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config =
        EconomyConfig::load_or_default(Path::new(CONFIG_PATH)).map_err(EngineError::from)?;
    init_logging(&config.logging);

    info!(
        database = %config.database.url,
        market_enabled = config.market.enabled,
        seeded = config.rng.seed.is_some(),
        "anketnica-engine starting"
    );

    let store = connect(&config).await?;

    let (shutdown, signal) = shutdown_channel();
    let jobs = if config.market.enabled {
        spawn_price_loops(&store, &config, &signal)
    } else {
        info!("Market disabled, no price loops started");
        Vec::new()
    };
    drop(signal);

    tokio::signal::ctrl_c()
        .await
        .map_err(|source| EngineError::Signal { source })?;
    info!("Shutdown requested");
    shutdown.shutdown();

    for (name, handle) in jobs {
        match handle.await {
            Ok(SchedulerSummary {
                ticks_run,
                ticks_failed,
            }) => info!(job = name, ticks_run, ticks_failed, "Price loop joined"),
            Err(e) => warn!(job = name, error = %e, "Price loop ended abnormally"),
        }
    }

    store.close().await;
    info!("anketnica-engine stopped");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
    }
}

/// Open the pool, then apply pending migrations and seed the house stable
/// when configured to.
async fn connect(config: &EconomyConfig) -> Result<SqliteStore, EngineError> {
    let sqlite = SqliteConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections);
    let store = SqliteStore::connect(&sqlite).await?;
    if config.database.run_migrations {
        store.run_migrations().await?;
        let added = store.seed_stable(&house_stable()).await?;
        info!(horses_added = added, "Migrations applied");
    }
    Ok(store)
}

/// Start one price loop per market.
///
/// A configured seed gives each loop its own reproducible stream; without
/// one both draw from OS entropy.
fn spawn_price_loops(
    store: &SqliteStore,
    config: &EconomyConfig,
    signal: &ShutdownSignal,
) -> Vec<(&'static str, JoinHandle<SchedulerSummary>)> {
    let markets = [
        (InstrumentKind::Stock, config.market.stock_interval(), 0),
        (InstrumentKind::Crypto, config.market.crypto_interval(), 1),
    ];

    markets
        .into_iter()
        .map(|(kind, period, stream)| {
            let rng = config.rng.seed.map_or_else(SmallRng::from_os_rng, |seed| {
                SmallRng::seed_from_u64(seed.wrapping_add(stream))
            });
            let engine = PriceEngine::new(
                store.clone(),
                PriceProfile::for_kind(kind, &config.market),
                rng,
            );
            info!(market = %kind, period_secs = period.as_secs(), "Price loop spawned");
            (market_job_name(kind), spawn_periodic(engine, period, signal.clone()))
        })
        .collect()
}

const fn market_job_name(kind: InstrumentKind) -> &'static str {
    match kind {
        InstrumentKind::Stock => "stock-prices",
        InstrumentKind::Crypto => "crypto-prices",
    }
}
