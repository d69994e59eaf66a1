//! ArbSim CLI: replay and parameter sweep commands.
//!
//! Commands:
//! - `run`: replay two quote files through the arbitrage strategy
//! - `sweep`: replay a grid of strategy parameters in parallel and rank them
//!
//! Reports go to stdout; diagnostics go to stderr through `tracing`
//! (`RUST_LOG`, default `warn`).

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arbsim_runner::export::{export_snapshots_csv, export_sweep_csv};
use arbsim_runner::{
    dataset_hash, load_quotes, run_simulation, run_sweep, write_json, write_trade_log, ParamGrid,
    RunReport, SimConfig, SweepRow, TieBreakMode,
};

#[derive(Parser)]
#[command(
    name = "arbsim",
    about = "ArbSim CLI: two-leg futures arbitrage replay"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the quote files named in a config and print the trade log and summary.
    Run {
        /// Path to a `.toml` config (any other extension is read as `Key=Value`).
        #[arg(long)]
        config: PathBuf,

        /// Write the trade log to this file instead of stdout.
        #[arg(long)]
        trade_log: Option<PathBuf>,

        /// Write the full JSON report to this file.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write PnL snapshots as CSV to this file.
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Master seed for the tie-break. Implies `--tie-break seeded` unless given.
        #[arg(long)]
        seed: Option<u64>,

        /// Tie-break policy for equal timestamps (overrides the config).
        #[arg(long, value_enum)]
        tie_break: Option<TieBreakArg>,

        /// Directory data paths are resolved against. Defaults to the current directory.
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Only print the summary.
        #[arg(long, default_value_t = false)]
        quiet: bool,
    },
    /// Replay every combination of the given parameter lists and rank by total PnL.
    Sweep {
        /// Path to the config providing data paths and replay settings.
        #[arg(long)]
        config: PathBuf,

        /// Minimum edge thresholds (comma-separated).
        #[arg(long, value_delimiter = ',', required = true)]
        min_edge: Vec<f64>,

        /// Exposure caps in lots (comma-separated).
        #[arg(long, value_delimiter = ',', required = true)]
        max_exposure: Vec<i64>,

        /// Stop-loss floors (comma-separated, usually negative).
        #[arg(
            long,
            value_delimiter = ',',
            required = true,
            allow_negative_numbers = true
        )]
        stop_loss: Vec<f64>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write all ranked rows as CSV to this file.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Directory data paths are resolved against. Defaults to the current directory.
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    SourceAFirst,
    Seeded,
}

impl From<TieBreakArg> for TieBreakMode {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::SourceAFirst => TieBreakMode::SourceAFirst,
            TieBreakArg::Seeded => TieBreakMode::Seeded,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            trade_log,
            json,
            snapshots,
            seed,
            tie_break,
            base_dir,
            quiet,
        } => run_replay(RunArgs {
            config,
            trade_log,
            json,
            snapshots,
            seed,
            tie_break,
            base_dir,
            quiet,
        }),
        Commands::Sweep {
            config,
            min_edge,
            max_exposure,
            stop_loss,
            top,
            csv,
            base_dir,
        } => run_grid(
            &config,
            ParamGrid {
                min_edges: min_edge,
                max_exposures: max_exposure,
                stop_losses: stop_loss,
            },
            top,
            csv.as_deref(),
            base_dir,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn resolve_base_dir(base_dir: Option<PathBuf>) -> Result<PathBuf> {
    match base_dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("cannot determine current directory"),
    }
}

struct RunArgs {
    config: PathBuf,
    trade_log: Option<PathBuf>,
    json: Option<PathBuf>,
    snapshots: Option<PathBuf>,
    seed: Option<u64>,
    tie_break: Option<TieBreakArg>,
    base_dir: Option<PathBuf>,
    quiet: bool,
}

fn run_replay(args: RunArgs) -> Result<()> {
    let mut config = SimConfig::load(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.replay.seed = seed;
        config.replay.tie_break = TieBreakMode::Seeded;
    }
    if let Some(mode) = args.tie_break {
        config.replay.tie_break = mode.into();
    }
    let base_dir = resolve_base_dir(args.base_dir)?;
    info!(config = %args.config.display(), base_dir = %base_dir.display(), "running replay");

    let report = run_simulation(&config, &base_dir)?;

    if let Some(path) = &args.trade_log {
        write_trade_log(&report, path)?;
    }
    if let Some(path) = &args.json {
        write_json(&report, path)?;
    }
    if let Some(path) = &args.snapshots {
        let csv = export_snapshots_csv(&report.snapshots)?;
        std::fs::write(path, csv)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    print_report(&mut out, &report, args.quiet, args.trade_log.is_none())?;
    out.flush()?;
    Ok(())
}

fn print_report(
    out: &mut impl Write,
    report: &RunReport,
    quiet: bool,
    include_trade_log: bool,
) -> io::Result<()> {
    if !quiet {
        for snapshot in &report.snapshots {
            writeln!(out, "{snapshot}")?;
        }
        if include_trade_log {
            out.write_all(report.trade_log.as_bytes())?;
        }
    }
    writeln!(out, "{}", report.summary)?;
    if report.summary.halted {
        writeln!(out, "Halted by stop-loss")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", report.timing)?;
    writeln!(out, "Run id: {}", report.run_id)
}

fn run_grid(
    config_path: &Path,
    grid: ParamGrid,
    top: usize,
    csv: Option<&Path>,
    base_dir: Option<PathBuf>,
) -> Result<()> {
    let config = SimConfig::load(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let base_dir = resolve_base_dir(base_dir)?;
    let (path_a, path_b) = config.validated_data_paths(&base_dir)?;

    let quotes_a = load_quotes(&path_a)?;
    let quotes_b = load_quotes(&path_b)?;
    let hash = dataset_hash(&[path_a.as_path(), path_b.as_path()])?;
    let tie_break = config.replay.tie_break_for(&hash);

    info!(
        points = grid.size(),
        events = quotes_a.len() + quotes_b.len(),
        "running sweep"
    );
    let rows = run_sweep(&quotes_a, &quotes_b, &grid, tie_break)?;
    if let Some(path) = csv {
        std::fs::write(path, export_sweep_csv(&rows)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    print_sweep(&mut out, &rows, grid.size(), top)?;
    out.flush()?;
    Ok(())
}

fn print_sweep(out: &mut impl Write, rows: &[SweepRow], grid_size: usize, top: usize) -> io::Result<()> {
    writeln!(
        out,
        "Sweep: {} valid of {} combinations",
        rows.len(),
        grid_size
    )?;
    writeln!(
        out,
        "{:>4}  {:>10}  {:>8}  {:>12}  {:>14}  {:>14}  {:>8}  {:>6}",
        "rank", "min_edge", "max_exp", "stop_loss", "total_pnl", "worst_pnl", "lots", "halted"
    )?;
    for (i, row) in rows.iter().take(top).enumerate() {
        let p = &row.params;
        let s = &row.summary;
        writeln!(
            out,
            "{:>4}  {:>10}  {:>8}  {:>12}  {:>14.6}  {:>14.6}  {:>8}  {:>6}",
            i + 1,
            p.min_arbitrage_edge(),
            p.max_abs_exposure_lots(),
            p.stop_loss_pnl(),
            s.total_pnl,
            s.worst_pnl,
            s.traded_lots,
            if s.halted { "yes" } else { "no" }
        )?;
    }
    Ok(())
}
