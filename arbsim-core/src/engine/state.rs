//! Engine run state and per-run mutable state.

use crate::domain::{Instrument, Quote};
use serde::{Deserialize, Serialize};

/// Trading state. `Running -> Halted` happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Running,
    Halted,
}

/// Mutable state that evolves event-by-event during a run.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub run_state: RunState,
    /// Last quote seen per leg; `Some` doubles as the "seen at least once" flag.
    pub last_a: Option<Quote>,
    pub last_b: Option<Quote>,
    /// Strategy buys not executed because B's ask size was below one lot.
    pub dropped_buys: u64,
    /// Strategy sells not executed because B's bid size was below one lot.
    pub dropped_sells: u64,
    pub events_seen: u64,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_quote(&mut self, quote: &Quote) {
        self.events_seen += 1;
        match quote.instrument {
            Instrument::FutureA => self.last_a = Some(*quote),
            Instrument::FutureB => self.last_b = Some(*quote),
        }
    }

    pub fn last_quote(&self, instrument: Instrument) -> Option<&Quote> {
        match instrument {
            Instrument::FutureA => self.last_a.as_ref(),
            Instrument::FutureB => self.last_b.as_ref(),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.run_state == RunState::Halted
    }

    pub fn halt(&mut self) {
        self.run_state = RunState::Halted;
    }
}
