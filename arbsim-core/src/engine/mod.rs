//! Simulation engine: event-by-event state machine and its supporting types.
//!
//! The engine consumes merged quotes one at a time:
//!
//! 1. Quote update: remember the last quote per leg
//! 2. Mark-to-market: re-mark the ledger on traded-leg quotes
//! 3. Decision: ask the strategy once both legs are known
//! 4. Execution: fill one lot at the touch, or count a dropped trade
//!
//! A stop-loss flatten halts the engine for the rest of the run.

pub mod simulation;
pub mod state;
pub mod summary;
pub mod trade_log;

pub use simulation::SimulationEngine;
pub use state::{EngineState, RunState};
pub use summary::RunSummary;
pub use trade_log::{TradeLog, DEFAULT_TRADE_LOG_CAPACITY};
