//! Domain types for ArbSim

pub mod instrument;
pub mod quote;
pub mod trade;

pub use instrument::{Instrument, Side, UnknownInstrument};
pub use quote::Quote;
pub use trade::{format_price, CloseReason, Trade};
