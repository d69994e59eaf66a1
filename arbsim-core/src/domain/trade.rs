//! Trade: one executed fill against the traded leg.

use super::instrument::{Instrument, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was force-closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    StopLoss,
    EndOfDay,
}

impl CloseReason {
    pub fn tag(self) -> &'static str {
        match self {
            CloseReason::StopLoss => "STOP_LOSS_CLOSE",
            CloseReason::EndOfDay => "EOD_CLOSE",
        }
    }
}

/// An executed trade. Applied to the ledger, written to the log, then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub time: i64,
    pub side: Side,
    pub instrument: Instrument,
    pub quantity: i64,
    pub price: f64,
    /// Set only for forced closes.
    pub reason: Option<CloseReason>,
}

impl fmt::Display for Trade {
    /// `<time>,<SIDE>,<instrument>,<quantity>,<price>[,<reasonTag>]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.time,
            self.side,
            self.instrument,
            self.quantity,
            format_price(self.price)
        )?;
        if let Some(reason) = self.reason {
            write!(f, ",{}", reason.tag())?;
        }
        Ok(())
    }
}

/// Significant digits in rendered prices.
const PRICE_DIGITS: i32 = 10;

/// Render a price like C's `%.10g`: at most 10 significant digits, trailing
/// zeros dropped, exponent form below 1e-4 or from 1e10 up.
///
/// `102.0` renders as `102`, `100.25` as `100.25`, `12345678900.0` as
/// `1.23456789e+10`.
pub fn format_price(price: f64) -> String {
    if price.is_nan() {
        return "nan".to_string();
    }
    if price.is_infinite() {
        return if price > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Round to the target digits first; rounding can bump the exponent.
    let sci = format!("{:.*e}", (PRICE_DIGITS - 1) as usize, price);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRICE_DIGITS {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_zeros(mantissa), exp.abs())
    } else {
        let decimals = (PRICE_DIGITS - 1 - exp) as usize;
        strip_zeros(&format!("{price:.decimals$}")).to_string()
    }
}

fn strip_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}
