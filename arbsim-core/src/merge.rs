//! Two-way stream merger.
//!
//! Pulls from two [`QuoteSource`]s and yields one sequence non-decreasing in
//! timestamp. Each source is read lazily: at most one record per source is
//! held in a pending slot, and a slot is refilled only after its record has
//! been emitted. Equal timestamps are resolved by the configured
//! [`TieBreak`] policy, which is deterministic for a given configuration.

use crate::domain::Quote;
use crate::source::{QuoteSource, SourceError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Resolution policy for records with equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TieBreak {
    /// Source A always goes first.
    #[default]
    SourceAFirst,
    /// A fair coin from a `StdRng` seeded with `seed`, flipped once per tie.
    Seeded { seed: u64 },
}

/// Owns the tie-break state for one merger.
#[derive(Debug, Clone)]
enum TieBreaker {
    SourceAFirst,
    Seeded(StdRng),
}

impl TieBreaker {
    fn new(policy: TieBreak) -> Self {
        match policy {
            TieBreak::SourceAFirst => TieBreaker::SourceAFirst,
            TieBreak::Seeded { seed } => TieBreaker::Seeded(StdRng::seed_from_u64(seed)),
        }
    }

    fn a_first(&mut self) -> bool {
        match self {
            TieBreaker::SourceAFirst => true,
            TieBreaker::Seeded(rng) => rng.gen_bool(0.5),
        }
    }
}

/// Which input a merged record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    A,
    B,
}

/// Counters describing a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub emitted_a: u64,
    pub emitted_b: u64,
    /// Times both pending records carried the same timestamp.
    pub ties: u64,
}

impl MergeStats {
    pub fn total(&self) -> u64 {
        self.emitted_a + self.emitted_b
    }
}

/// One pending slot plus the source behind it.
struct Lane<S> {
    source: S,
    pending: Option<Quote>,
    exhausted: bool,
}

impl<S: QuoteSource> Lane<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            pending: None,
            exhausted: false,
        }
    }

    fn refill(&mut self) -> Result<(), SourceError> {
        if self.pending.is_some() || self.exhausted {
            return Ok(());
        }
        match self.source.next_quote()? {
            Some(q) => self.pending = Some(q),
            None => self.exhausted = true,
        }
        Ok(())
    }
}

pub struct StreamMerger<A, B> {
    a: Lane<A>,
    b: Lane<B>,
    tie_breaker: TieBreaker,
    stats: MergeStats,
}

impl<A: QuoteSource, B: QuoteSource> StreamMerger<A, B> {
    pub fn new(source_a: A, source_b: B, tie_break: TieBreak) -> Self {
        Self {
            a: Lane::new(source_a),
            b: Lane::new(source_b),
            tie_breaker: TieBreaker::new(tie_break),
            stats: MergeStats::default(),
        }
    }

    /// Next merged quote, or `Ok(None)` once both sources are exhausted.
    pub fn next_event(&mut self) -> Result<Option<Quote>, SourceError> {
        Ok(self.next_with_origin()?.map(|(q, _)| q))
    }

    /// Like [`next_event`](Self::next_event), also reporting which source the
    /// quote came from.
    pub fn next_with_origin(&mut self) -> Result<Option<(Quote, Origin)>, SourceError> {
        self.a.refill()?;
        self.b.refill()?;

        let origin = match (&self.a.pending, &self.b.pending) {
            (None, None) => return Ok(None),
            (Some(_), None) => Origin::A,
            (None, Some(_)) => Origin::B,
            (Some(qa), Some(qb)) => {
                if qa.ts < qb.ts {
                    Origin::A
                } else if qb.ts < qa.ts {
                    Origin::B
                } else {
                    self.stats.ties += 1;
                    if self.tie_breaker.a_first() {
                        Origin::A
                    } else {
                        Origin::B
                    }
                }
            }
        };

        let quote = match origin {
            Origin::A => {
                self.stats.emitted_a += 1;
                self.a.pending.take()
            }
            Origin::B => {
                self.stats.emitted_b += 1;
                self.b.pending.take()
            }
        };
        Ok(quote.map(|q| (q, origin)))
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// True once both sources have reported end-of-stream and nothing is pending.
    pub fn is_drained(&self) -> bool {
        self.a.exhausted && self.b.exhausted && self.a.pending.is_none() && self.b.pending.is_none()
    }

    /// Whether another quote is available. Reads at most one record ahead per
    /// source, which the next call to [`next_event`](Self::next_event) then
    /// emits.
    pub fn has_more(&mut self) -> Result<bool, SourceError> {
        self.a.refill()?;
        self.b.refill()?;
        Ok(self.a.pending.is_some() || self.b.pending.is_some())
    }

    pub fn into_sources(self) -> (A, B) {
        (self.a.source, self.b.source)
    }
}

impl<A: QuoteSource, B: QuoteSource> Iterator for StreamMerger<A, B> {
    type Item = Result<Quote, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
