//! Replay runner: wires sources, merger and engine together.
//!
//! Two entry points:
//! - `replay()`: drives an already-built merger into an engine. No I/O.
//! - `run_simulation()`: config in, `RunReport` out. Used by the CLI.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use arbsim_core::domain::format_price;
use arbsim_core::{
    Instrument, MergeStats, ParamsError, Quote, QuoteSource, RunSummary, SimulationEngine,
    SourceError, Strategy, StrategyParams, StreamMerger, ThresholdArbStrategy, TieBreak,
};

use crate::config::{ConfigError, SimConfig};
use crate::data_loader::{dataset_hash, CsvQuoteSource};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("data error: {0}")]
    Source(#[from] SourceError),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

const NANOS_PER_SEC: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Event-time spacing of PnL snapshots in nanoseconds; 0 disables them.
    pub snapshot_interval_ns: i64,
}

impl ReplayOptions {
    pub fn from_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self {
            snapshot_interval_ns: secs.saturating_mul(NANOS_PER_SEC),
        }
    }

    pub fn without_snapshots() -> Self {
        Self {
            snapshot_interval_ns: 0,
        }
    }
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self::from_secs(60)
    }
}

/// Periodic view of the run, taken right after the event at `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnlSnapshot {
    pub time: i64,
    pub total_pnl: f64,
    /// Mid of the last quote seen for each leg; 0 before the first one.
    pub mid_a: f64,
    pub mid_b: f64,
}

impl fmt::Display for PnlSnapshot {
    /// `<time>,PNL,<total>,<midB>,<midA>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},PNL,{},{},{}",
            self.time,
            format_price(self.total_pnl),
            format_price(self.mid_b),
            format_price(self.mid_a)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub events: u64,
    pub loop_ms: f64,
    pub events_per_sec: f64,
}

impl fmt::Display for TimingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timing Statistics")?;
        writeln!(f, "Events processed: {}", self.events)?;
        writeln!(f, "Loop time: {:.3} ms", self.loop_ms)?;
        write!(f, "Throughput: {:.0} events/sec", self.events_per_sec)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    pub snapshots: Vec<PnlSnapshot>,
    pub timing: TimingStats,
    pub merge_stats: MergeStats,
    /// Timestamp of the last event processed; 0 when there were none.
    pub last_time: i64,
    /// True when a halt ended the loop while unread events remained.
    pub stopped_early: bool,
}

/// Feed every merged event to `engine`, then close the day.
///
/// Stops pulling as soon as the engine halts. A source error aborts the
/// replay before the end-of-day close.
pub fn replay<A, B, S>(
    merger: &mut StreamMerger<A, B>,
    engine: &mut SimulationEngine<S>,
    opts: &ReplayOptions,
) -> Result<ReplayOutcome, SourceError>
where
    A: QuoteSource,
    B: QuoteSource,
    S: Strategy,
{
    let mut snapshots = Vec::new();
    let mut last_time = 0;
    let mut events = 0u64;
    let mut next_snapshot: Option<i64> = None;

    let start = Instant::now();
    while let Some(quote) = merger.next_event()? {
        last_time = quote.ts;
        engine.on_event(&quote);
        events += 1;

        if opts.snapshot_interval_ns > 0 {
            // The first event only arms the schedule.
            match next_snapshot {
                Some(due) if quote.ts < due => {}
                armed => {
                    if armed.is_some() {
                        snapshots.push(snapshot(engine, quote.ts));
                    }
                    next_snapshot = Some(quote.ts.saturating_add(opts.snapshot_interval_ns));
                }
            }
        }

        if engine.is_halted() {
            break;
        }
    }
    let elapsed = start.elapsed();

    let stopped_early = engine.is_halted()
        && match merger.has_more() {
            Ok(more) => more,
            Err(e) => {
                debug!(error = %e, "unreadable input after halt");
                true
            }
        };
    if events == 0 {
        warn!("replay saw no events");
    }
    engine.on_end_of_day(last_time);

    let secs = elapsed.as_secs_f64();
    Ok(ReplayOutcome {
        snapshots,
        timing: TimingStats {
            events,
            loop_ms: secs * 1_000.0,
            events_per_sec: if secs > 0.0 { events as f64 / secs } else { 0.0 },
        },
        merge_stats: merger.stats(),
        last_time,
        stopped_early,
    })
}

fn snapshot<S: Strategy>(engine: &SimulationEngine<S>, time: i64) -> PnlSnapshot {
    let mid = |instrument| engine.last_quote(instrument).map_or(0.0, Quote::mid);
    PnlSnapshot {
        time,
        total_pnl: engine.ledger().total_pnl(),
        mid_a: mid(Instrument::FutureA),
        mid_b: mid(Instrument::FutureB),
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub dataset_hash: String,
    pub generated_at: DateTime<Utc>,
    pub params: StrategyParams,
    /// Effective policy, with the derived seed when seeded.
    pub tie_break: TieBreak,
    pub summary: RunSummary,
    pub merge_stats: MergeStats,
    pub snapshots: Vec<PnlSnapshot>,
    pub timing: TimingStats,
    pub trade_log: String,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one simulation end to end from a config.
///
/// Data paths are resolved under `base_dir` and must not escape it.
pub fn run_simulation(config: &SimConfig, base_dir: &Path) -> Result<RunReport, RunError> {
    let params = config.strategy_params()?;
    let (path_a, path_b) = config.validated_data_paths(base_dir)?;
    let run_id = config.run_id()?;
    let dataset_hash = dataset_hash(&[path_a.as_path(), path_b.as_path()])?;
    let tie_break = config.replay.tie_break_for(&dataset_hash);

    let source_a = CsvQuoteSource::from_path(&path_a)?;
    let source_b = CsvQuoteSource::from_path(&path_b)?;
    let mut merger = StreamMerger::new(source_a, source_b, tie_break);
    let mut engine = SimulationEngine::with_log_capacity(
        ThresholdArbStrategy::new(params),
        config.replay.trade_log_capacity,
    );

    info!(
        run_id = %run_id,
        leg_a = %path_a.display(),
        leg_b = %path_b.display(),
        ?tie_break,
        "starting replay"
    );
    let opts = ReplayOptions::from_secs(config.replay.pnl_snapshot_interval_secs);
    let outcome = replay(&mut merger, &mut engine, &opts)?;
    let (trade_log, summary) = engine.finish();
    let (source_a, source_b) = merger.into_sources();
    info!(
        total_pnl = summary.total_pnl,
        trades = summary.trade_count,
        halted = summary.halted,
        events = outcome.timing.events,
        records_a = source_a.records_read(),
        records_b = source_b.records_read(),
        "replay finished"
    );

    Ok(RunReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash,
        generated_at: Utc::now(),
        params,
        tie_break,
        summary,
        merge_stats: outcome.merge_stats,
        snapshots: outcome.snapshots,
        timing: outcome.timing,
        trade_log: trade_log.into_string(),
    })
}
