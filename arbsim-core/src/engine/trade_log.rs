//! Append-only trade log buffer.

use crate::domain::Trade;
use std::fmt::Write;

/// Default buffer size: 1 MiB.
pub const DEFAULT_TRADE_LOG_CAPACITY: usize = 1 << 20;

/// One line per executed trade, newline-terminated.
///
/// The buffer is sized up front so the hot loop does not reallocate for
/// typical runs.
#[derive(Debug, Clone)]
pub struct TradeLog {
    buf: String,
    lines: usize,
}

impl TradeLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            lines: 0,
        }
    }

    pub fn append(&mut self, trade: &Trade) {
        // Writing into a String cannot fail.
        let _ = writeln!(self.buf, "{trade}");
        self.lines += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.buf.lines()
    }

    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for TradeLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRADE_LOG_CAPACITY)
    }
}
