//! ArbSim Core: quotes, fixed-point ledger, stream merger, strategy, simulation engine.
//!
//! This crate contains the replay-and-decision pipeline:
//! - Domain types (quotes, instruments, sides, trades)
//! - Fixed-point `Money` for drift-free PnL
//! - `QuoteSource` seam and a two-way deterministic stream merger
//! - Position ledger with mark-to-market accounting
//! - Threshold arbitrage strategy behind the `Strategy` trait
//! - Simulation engine with a one-way halt state machine
//!
//! No I/O happens here; file parsing and configuration live in `arbsim-runner`.

pub mod domain;
pub mod engine;
pub mod ledger;
pub mod merge;
pub mod money;
pub mod rng;
pub mod source;
pub mod strategy;

pub use domain::{CloseReason, Instrument, Quote, Side, Trade};
pub use engine::{RunState, RunSummary, SimulationEngine, TradeLog};
pub use ledger::{LedgerError, PositionLedger};
pub use merge::{MergeStats, StreamMerger, TieBreak};
pub use money::Money;
pub use source::{QuoteSource, SourceError, VecSource};
pub use strategy::{Action, ParamsError, Strategy, StrategyParams, ThresholdArbStrategy};
