//! Instrument tags and trade sides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the two legs of the pair.
///
/// `FutureA` is the reference leg; `FutureB` is the leg the engine trades
/// and marks to market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    FutureA,
    FutureB,
}

impl Instrument {
    /// The leg that positions are held in.
    pub const TRADED: Instrument = Instrument::FutureB;

    /// Wire tag used in input files and trade log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::FutureA => "FutureA",
            Instrument::FutureB => "FutureB",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown instrument tag '{0}'")]
pub struct UnknownInstrument(pub String);

impl FromStr for Instrument {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FutureA" => Ok(Instrument::FutureA),
            "FutureB" => Ok(Instrument::FutureB),
            other => Err(UnknownInstrument(other.to_string())),
        }
    }
}

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Signed lot multiplier: +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
