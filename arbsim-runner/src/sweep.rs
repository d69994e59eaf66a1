//! Parameter sweep over a grid of strategy parameters.
//!
//! Every grid point replays the same in-memory quotes with its own engine and
//! merger; points run in parallel on the rayon pool and share nothing
//! mutable.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use arbsim_core::{
    Quote, RunSummary, SimulationEngine, SourceError, StrategyParams, StreamMerger,
    ThresholdArbStrategy, TieBreak, VecSource,
};

use crate::runner::{replay, ReplayOptions};

/// Sweeps only need the summary, so the log buffer starts small.
const SWEEP_LOG_CAPACITY: usize = 4096;

/// Candidate values per parameter; the grid is their cartesian product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub min_edges: Vec<f64>,
    pub max_exposures: Vec<i64>,
    pub stop_losses: Vec<f64>,
}

impl ParamGrid {
    /// Number of combinations before validation.
    pub fn size(&self) -> usize {
        self.min_edges.len() * self.max_exposures.len() * self.stop_losses.len()
    }

    /// Valid combinations in grid order (edge, then exposure, then stop).
    /// Invalid ones are skipped.
    pub fn points(&self) -> Vec<StrategyParams> {
        let mut points = Vec::with_capacity(self.size());
        for &edge in &self.min_edges {
            for &exposure in &self.max_exposures {
                for &stop in &self.stop_losses {
                    match StrategyParams::new(edge, exposure, stop) {
                        Ok(p) => points.push(p),
                        Err(e) => debug!(error = %e, "skipping grid point"),
                    }
                }
            }
        }
        points
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub params: StrategyParams,
    pub summary: RunSummary,
}

/// Replay every grid point and rank by total PnL, best first.
///
/// The sort is stable, so equal PnL keeps grid order. A seeded `tie_break`
/// is shared by all points: every point sees the same merged sequence.
pub fn run_sweep(
    quotes_a: &[Quote],
    quotes_b: &[Quote],
    grid: &ParamGrid,
    tie_break: TieBreak,
) -> Result<Vec<SweepRow>, SourceError> {
    let points = grid.points();
    info!(points = points.len(), grid_size = grid.size(), "starting sweep");

    let mut rows = points
        .par_iter()
        .map(|&params| -> Result<SweepRow, SourceError> {
            let mut merger = StreamMerger::new(
                VecSource::new(quotes_a.to_vec()),
                VecSource::new(quotes_b.to_vec()),
                tie_break,
            );
            let mut engine = SimulationEngine::with_log_capacity(
                ThresholdArbStrategy::new(params),
                SWEEP_LOG_CAPACITY,
            );
            replay(&mut merger, &mut engine, &ReplayOptions::without_snapshots())?;
            Ok(SweepRow {
                params,
                summary: engine.summary(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    rows.sort_by(|a, b| b.summary.total_pnl.total_cmp(&a.summary.total_pnl));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbsim_core::Instrument;

    fn legs() -> (Vec<Quote>, Vec<Quote>) {
        let a: Vec<Quote> = (0..200)
            .map(|i| Quote::new(i * 10, Instrument::FutureA, 5, 100.0, 100.5, 5))
            .collect();
        let b: Vec<Quote> = (0..200)
            .map(|i| {
                let shift = ((i % 6) as f64 - 3.0) * 0.5;
                Quote::new(i * 10, Instrument::FutureB, 5, 100.0 + shift, 100.5 + shift, 5)
            })
            .collect();
        (a, b)
    }

    #[test]
    fn points_skip_invalid_combinations() {
        let grid = ParamGrid {
            min_edges: vec![-1.0, 0.5],
            max_exposures: vec![0, 2],
            stop_losses: vec![5.0, -10.0],
        };
        assert_eq!(grid.size(), 8);
        let points = grid.points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].min_arbitrage_edge(), 0.5);
        assert_eq!(points[0].max_abs_exposure_lots(), 2);
    }

    #[test]
    fn sweep_ranks_by_pnl() {
        let (a, b) = legs();
        let grid = ParamGrid {
            min_edges: vec![0.25, 0.75, 5.0],
            max_exposures: vec![1, 3],
            stop_losses: vec![-100.0],
        };
        let rows = run_sweep(&a, &b, &grid, TieBreak::SourceAFirst).unwrap();
        assert_eq!(rows.len(), 6);
        for w in rows.windows(2) {
            assert!(w[0].summary.total_pnl >= w[1].summary.total_pnl);
        }
        // An unreachable threshold never trades.
        let idle: Vec<&SweepRow> = rows
            .iter()
            .filter(|r| r.params.min_arbitrage_edge() == 5.0)
            .collect();
        assert!(idle.iter().all(|r| r.summary.trade_count == 0));
    }

    #[test]
    fn sweep_matches_single_replay() {
        let (a, b) = legs();
        let params = StrategyParams::new(0.75, 3, -100.0).unwrap();
        let grid = ParamGrid {
            min_edges: vec![0.75],
            max_exposures: vec![3],
            stop_losses: vec![-100.0],
        };
        let rows = run_sweep(&a, &b, &grid, TieBreak::Seeded { seed: 3 }).unwrap();

        let mut merger = StreamMerger::new(
            VecSource::new(a),
            VecSource::new(b),
            TieBreak::Seeded { seed: 3 },
        );
        let mut engine = SimulationEngine::new(ThresholdArbStrategy::new(params));
        replay(&mut merger, &mut engine, &ReplayOptions::without_snapshots()).unwrap();
        assert_eq!(rows[0].summary, engine.summary());
    }

    #[test]
    fn empty_grid_is_empty_result() {
        let (a, b) = legs();
        let rows = run_sweep(&a, &b, &ParamGrid::default(), TieBreak::SourceAFirst).unwrap();
        assert!(rows.is_empty());
    }
}
