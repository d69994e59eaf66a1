//! ArbSim Runner: replay orchestration on top of `arbsim-core`.
//!
//! This crate provides:
//! - Configuration loading (TOML and the legacy `Key=Value` format)
//! - CSV quote sources and dataset hashing
//! - The replay loop with PnL snapshots and timing
//! - JSON / CSV export of run reports
//! - Parallel parameter sweeps

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, SimConfig, TieBreakMode};
pub use data_loader::{dataset_hash, load_quotes, CsvQuoteSource};
pub use export::{export_json, import_json, write_json, write_trade_log};
pub use runner::{
    replay, run_simulation, PnlSnapshot, ReplayOptions, ReplayOutcome, RunError, RunReport,
    TimingStats, SCHEMA_VERSION,
};
pub use sweep::{run_sweep, ParamGrid, SweepRow};
