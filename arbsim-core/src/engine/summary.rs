//! End-of-run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_pnl: f64,
    pub best_pnl: f64,
    pub worst_pnl: f64,
    pub max_abs_exposure: i64,
    pub traded_lots: i64,
    pub dropped_buys: u64,
    pub dropped_sells: u64,
    pub final_position: i64,
    /// Lines written to the trade log, forced closes included.
    pub trade_count: usize,
    pub halted: bool,
}

impl RunSummary {
    pub fn total_dropped(&self) -> u64 {
        self.dropped_buys + self.dropped_sells
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation finished")?;
        writeln!(f, "Total PnL: {}", self.total_pnl)?;
        writeln!(f, "Best PnL: {}", self.best_pnl)?;
        writeln!(f, "Worst PnL: {}", self.worst_pnl)?;
        writeln!(f, "Max exposure: {}", self.max_abs_exposure)?;
        writeln!(f, "Traded lots: {}", self.traded_lots)?;
        writeln!(f, "Dropped buys: {}", self.dropped_buys)?;
        write!(f, "Dropped sells: {}", self.dropped_sells)
    }
}
