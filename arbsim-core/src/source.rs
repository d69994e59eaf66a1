//! Quote sources: the pull-based input seam of the engine.
//!
//! A `QuoteSource` yields the quotes of one leg in time order and reports
//! end-of-stream with `Ok(None)`. Parsing, file handling and validation of
//! the on-disk format live behind this trait (see `arbsim-runner`); the core
//! only ever pulls.

use crate::domain::Quote;
use std::collections::VecDeque;
use thiserror::Error;

/// Errors a quote source can report. Any of them ends the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {source_name}: {reason}")]
    Io { source_name: String, reason: String },

    #[error("{source_name}:{line}: {reason}")]
    Malformed {
        source_name: String,
        line: u64,
        reason: String,
    },
}

/// One leg's ordered quote stream.
pub trait QuoteSource {
    /// Next quote, or `Ok(None)` once the stream is exhausted.
    fn next_quote(&mut self) -> Result<Option<Quote>, SourceError>;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str {
        "quotes"
    }
}

impl<S: QuoteSource + ?Sized> QuoteSource for Box<S> {
    fn next_quote(&mut self) -> Result<Option<Quote>, SourceError> {
        (**self).next_quote()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: QuoteSource + ?Sized> QuoteSource for &mut S {
    fn next_quote(&mut self) -> Result<Option<Quote>, SourceError> {
        (**self).next_quote()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// In-memory source over pre-loaded quotes.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    quotes: VecDeque<Quote>,
    reads: usize,
}

impl VecSource {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self {
            quotes: quotes.into(),
            reads: 0,
        }
    }

    /// Number of successful `next_quote` calls so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl From<Vec<Quote>> for VecSource {
    fn from(quotes: Vec<Quote>) -> Self {
        Self::new(quotes)
    }
}

impl QuoteSource for VecSource {
    fn next_quote(&mut self) -> Result<Option<Quote>, SourceError> {
        let next = self.quotes.pop_front();
        if next.is_some() {
            self.reads += 1;
        }
        Ok(next)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
