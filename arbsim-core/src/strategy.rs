//! Threshold arbitrage strategy.
//!
//! The strategy is a pure decision function over the two directional edges,
//! the current position and the current PnL. It holds only its validated
//! parameters, so one instance can be shared across runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack applied to the edge threshold so that an edge equal to the
/// threshold up to float representation error still triggers.
pub const EDGE_EPSILON: f64 = 1e-9;

/// Parameter validation errors. Any of them prevents a run from starting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("min_arbitrage_edge must be a finite value >= 0, got {0}")]
    MinEdge(f64),

    #[error("max_abs_exposure_lots must be >= 1, got {0}")]
    MaxExposure(i64),

    #[error("stop_loss_pnl must be a finite value <= 0 (it is a loss floor), got {0}")]
    StopLoss(f64),
}

/// Validated strategy parameters. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyParams {
    min_arbitrage_edge: f64,
    max_abs_exposure_lots: i64,
    stop_loss_pnl: f64,
}

impl StrategyParams {
    pub fn new(
        min_arbitrage_edge: f64,
        max_abs_exposure_lots: i64,
        stop_loss_pnl: f64,
    ) -> Result<Self, ParamsError> {
        if !min_arbitrage_edge.is_finite() || min_arbitrage_edge < 0.0 {
            return Err(ParamsError::MinEdge(min_arbitrage_edge));
        }
        if max_abs_exposure_lots < 1 {
            return Err(ParamsError::MaxExposure(max_abs_exposure_lots));
        }
        if !stop_loss_pnl.is_finite() || stop_loss_pnl > 0.0 {
            return Err(ParamsError::StopLoss(stop_loss_pnl));
        }
        Ok(Self {
            min_arbitrage_edge,
            max_abs_exposure_lots,
            stop_loss_pnl,
        })
    }

    pub fn min_arbitrage_edge(&self) -> f64 {
        self.min_arbitrage_edge
    }

    pub fn max_abs_exposure_lots(&self) -> i64 {
        self.max_abs_exposure_lots
    }

    pub fn stop_loss_pnl(&self) -> f64 {
        self.stop_loss_pnl
    }
}

/// Deserializes through [`StrategyParams::new`], so invalid values are
/// rejected at load time.
impl<'de> Deserialize<'de> for StrategyParams {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            min_arbitrage_edge: f64,
            max_abs_exposure_lots: i64,
            stop_loss_pnl: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        StrategyParams::new(
            raw.min_arbitrage_edge,
            raw.max_abs_exposure_lots,
            raw.stop_loss_pnl,
        )
        .map_err(serde::de::Error::custom)
    }
}

/// What the engine should do on this event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    None,
    BuyB,
    SellB,
    /// Close everything at mid and stop trading.
    Flatten,
}

/// Decision seam between the engine and a trading rule.
pub trait Strategy {
    fn params(&self) -> &StrategyParams;

    /// `sell_edge`: gain from selling B at its bid against A's ask.
    /// `buy_edge`: gain from buying B at its ask against A's bid.
    fn decide(&self, sell_edge: f64, buy_edge: f64, position: i64, current_pnl: f64) -> Action;
}

impl<S: Strategy + ?Sized> Strategy for &S {
    fn params(&self) -> &StrategyParams {
        (**self).params()
    }

    fn decide(&self, sell_edge: f64, buy_edge: f64, position: i64, current_pnl: f64) -> Action {
        (**self).decide(sell_edge, buy_edge, position, current_pnl)
    }
}

/// Trade one lot of B whenever an edge clears the threshold, within the
/// exposure cap; flatten once PnL falls through the stop-loss floor.
#[derive(Debug, Clone)]
pub struct ThresholdArbStrategy {
    params: StrategyParams,
}

impl ThresholdArbStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }
}

impl Strategy for ThresholdArbStrategy {
    fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn decide(&self, sell_edge: f64, buy_edge: f64, position: i64, current_pnl: f64) -> Action {
        let p = &self.params;
        if current_pnl < p.stop_loss_pnl {
            return Action::Flatten;
        }

        let trigger = p.min_arbitrage_edge - EDGE_EPSILON;
        let within_cap = |next: i64| next.abs() <= p.max_abs_exposure_lots;

        if sell_edge >= trigger && within_cap(position - 1) {
            Action::SellB
        } else if buy_edge >= trigger && within_cap(position + 1) {
            Action::BuyB
        } else {
            Action::None
        }
    }
}
