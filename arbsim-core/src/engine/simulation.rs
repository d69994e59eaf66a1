//! Event-by-event simulation: the heart of the replay.
//!
//! Per event:
//! 1. Record the quote for its leg
//! 2. Re-mark the ledger when the traded leg moved
//! 3. Wait until both legs have been seen
//! 4. Skip decisions once halted
//! 5. Compute edges, ask the strategy, execute or drop

use crate::domain::{CloseReason, Instrument, Quote, Side, Trade};
use crate::ledger::PositionLedger;
use crate::strategy::{Action, Strategy};
use tracing::{debug, info, warn};

use super::state::{EngineState, RunState};
use super::summary::RunSummary;
use super::trade_log::{TradeLog, DEFAULT_TRADE_LOG_CAPACITY};

/// Lots traded per strategy decision.
const TRADE_LOTS: i64 = 1;

pub struct SimulationEngine<S> {
    strategy: S,
    ledger: PositionLedger,
    state: EngineState,
    log: TradeLog,
}

impl<S: Strategy> SimulationEngine<S> {
    pub fn new(strategy: S) -> Self {
        Self::with_log_capacity(strategy, DEFAULT_TRADE_LOG_CAPACITY)
    }

    pub fn with_log_capacity(strategy: S, capacity: usize) -> Self {
        Self {
            strategy,
            ledger: PositionLedger::new(),
            state: EngineState::new(),
            log: TradeLog::with_capacity(capacity),
        }
    }

    pub fn on_event(&mut self, quote: &Quote) {
        self.state.record_quote(quote);
        if quote.instrument == Instrument::TRADED {
            self.ledger.on_quote(quote.mid());
        }

        let (Some(a), Some(b)) = (self.state.last_a, self.state.last_b) else {
            return;
        };
        if self.state.is_halted() {
            return;
        }

        let sell_edge = b.bid - a.ask;
        let buy_edge = a.bid - b.ask;
        let action = self.strategy.decide(
            sell_edge,
            buy_edge,
            self.ledger.position(),
            self.ledger.total_pnl(),
        );

        match action {
            Action::None => {}
            Action::Flatten => {
                info!(
                    time = quote.ts,
                    pnl = self.ledger.total_pnl(),
                    floor = self.strategy.params().stop_loss_pnl(),
                    "stop-loss breached; flattening and halting"
                );
                self.close_at_mid(quote.ts, CloseReason::StopLoss);
                self.state.halt();
            }
            Action::BuyB => {
                if b.ask_size < TRADE_LOTS {
                    self.state.dropped_buys += 1;
                    debug!(time = quote.ts, ask_size = b.ask_size, "buy dropped: no ask liquidity");
                    return;
                }
                self.execute(quote.ts, Side::Buy, b.ask, TRADE_LOTS, None);
            }
            Action::SellB => {
                if b.bid_size < TRADE_LOTS {
                    self.state.dropped_sells += 1;
                    debug!(time = quote.ts, bid_size = b.bid_size, "sell dropped: no bid liquidity");
                    return;
                }
                self.execute(quote.ts, Side::Sell, b.bid, TRADE_LOTS, None);
            }
        }
    }

    /// Close any open position at mid. No-op once halted.
    pub fn on_end_of_day(&mut self, time: i64) {
        if self.state.is_halted() {
            return;
        }
        self.close_at_mid(time, CloseReason::EndOfDay);
    }

    /// Force-close as a real trade so it is logged and counted.
    fn close_at_mid(&mut self, time: i64, reason: CloseReason) {
        let position = self.ledger.position();
        let Some(mid) = self.ledger.last_mid() else {
            return;
        };
        if position == 0 {
            return;
        }
        let side = if position > 0 { Side::Sell } else { Side::Buy };
        debug!(time, position, mid, reason = reason.tag(), "forced close");
        self.execute(time, side, mid, position.abs(), Some(reason));
    }

    fn execute(
        &mut self,
        time: i64,
        side: Side,
        price: f64,
        quantity: i64,
        reason: Option<CloseReason>,
    ) {
        if let Err(e) = self.ledger.apply_trade(side, price, quantity) {
            warn!(time, error = %e, "fill rejected by ledger");
            return;
        }
        self.log.append(&Trade {
            time,
            side,
            instrument: Instrument::TRADED,
            quantity,
            price,
            reason,
        });
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn state(&self) -> RunState {
        self.state.run_state
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    pub fn last_quote(&self, instrument: Instrument) -> Option<&Quote> {
        self.state.last_quote(instrument)
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.log
    }

    pub fn trade_count(&self) -> usize {
        self.log.len()
    }

    pub fn dropped_buys(&self) -> u64 {
        self.state.dropped_buys
    }

    pub fn dropped_sells(&self) -> u64 {
        self.state.dropped_sells
    }

    pub fn events_seen(&self) -> u64 {
        self.state.events_seen
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_pnl: self.ledger.total_pnl(),
            best_pnl: self.ledger.best_pnl(),
            worst_pnl: self.ledger.worst_pnl(),
            max_abs_exposure: self.ledger.max_abs_exposure(),
            traded_lots: self.ledger.traded_lots(),
            dropped_buys: self.state.dropped_buys,
            dropped_sells: self.state.dropped_sells,
            final_position: self.ledger.position(),
            trade_count: self.log.len(),
            halted: self.state.is_halted(),
        }
    }

    pub fn finish(self) -> (TradeLog, RunSummary) {
        let summary = self.summary();
        (self.log, summary)
    }
}
