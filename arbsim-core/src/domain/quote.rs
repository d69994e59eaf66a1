//! Quote: the fundamental market data unit.

use super::instrument::Instrument;
use serde::{Deserialize, Serialize};

/// Top-of-book quote for one instrument at one instant.
///
/// `ask >= bid` is expected but not enforced here; the source that produces
/// quotes owns that check. Sizes are available lots on each side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Sending time in nanoseconds. May repeat across the two legs.
    pub ts: i64,
    pub instrument: Instrument,
    /// Feed event-type code. Carried through, never interpreted.
    pub event_type: i32,
    pub bid_size: i64,
    pub bid: f64,
    pub ask: f64,
    pub ask_size: i64,
}

impl Quote {
    pub fn new(
        ts: i64,
        instrument: Instrument,
        bid_size: i64,
        bid: f64,
        ask: f64,
        ask_size: i64,
    ) -> Self {
        Self {
            ts,
            instrument,
            event_type: 0,
            bid_size,
            bid,
            ask,
            ask_size,
        }
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) * 0.5
    }
}
