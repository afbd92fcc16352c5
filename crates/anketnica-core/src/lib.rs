//! Configuration and scheduling for the Anketnica economy engines.
//!
//! # Modules
//!
//! - [`config`] -- Typed configuration loaded from `anketnica-config.yaml`
//! - [`scheduler`] -- Cancellable fixed-interval runner for background jobs

pub mod config;
pub mod scheduler;

pub use config::{
    ConfigError, DatabaseConfig, EconomyConfig, LogFormat, LoggingConfig, MarketConfig, RngConfig,
};
pub use scheduler::{
    PeriodicJob, SchedulerSummary, ShutdownHandle, ShutdownSignal, run_periodic, shutdown_channel,
    spawn_periodic,
};
