//! Criterion benchmarks for ArbSim hot paths.
//!
//! Benchmarks:
//! 1. Merge + engine loop (full replay of two synthetic legs)
//! 2. Stream merger alone, both tie-break policies
//! 3. Ledger mark-to-market

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use arbsim_core::{
    Instrument, PositionLedger, Quote, Side, SimulationEngine, StrategyParams, StreamMerger,
    ThresholdArbStrategy, TieBreak, VecSource,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_legs(n: usize) -> (Vec<Quote>, Vec<Quote>) {
    let a = (0..n)
        .map(|i| {
            let px = 100.0 + (i as f64 * 0.01).sin();
            Quote::new(i as i64 * 2, Instrument::FutureA, 5, px, px + 0.25, 5)
        })
        .collect();
    let b = (0..n)
        .map(|i| {
            let px = 100.0 + (i as f64 * 0.013).cos();
            Quote::new(i as i64 * 2 + (i % 2) as i64, Instrument::FutureB, 5, px, px + 0.25, 5)
        })
        .collect();
    (a, b)
}

fn params() -> StrategyParams {
    StrategyParams::new(0.5, 10, -1_000.0).unwrap()
}

// ── 1. Full replay ───────────────────────────────────────────────────

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    for &n in &[10_000usize, 100_000] {
        let (qa, qb) = make_legs(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |bench, _| {
            bench.iter(|| {
                let mut merger = StreamMerger::new(
                    VecSource::new(qa.clone()),
                    VecSource::new(qb.clone()),
                    TieBreak::SourceAFirst,
                );
                let mut engine = SimulationEngine::new(ThresholdArbStrategy::new(params()));
                let mut last = 0;
                while let Ok(Some(q)) = merger.next_event() {
                    last = q.ts;
                    engine.on_event(&q);
                }
                engine.on_end_of_day(last);
                black_box(engine.ledger().total_pnl())
            })
        });
    }
    group.finish();
}

// ── 2. Merge only ────────────────────────────────────────────────────

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    let (qa, qb) = make_legs(100_000);
    for (name, tie) in [
        ("source_a_first", TieBreak::SourceAFirst),
        ("seeded", TieBreak::Seeded { seed: 7 }),
    ] {
        group.bench_function(name, |bench| {
            bench.iter(|| {
                let merger =
                    StreamMerger::new(VecSource::new(qa.clone()), VecSource::new(qb.clone()), tie);
                black_box(merger.filter_map(Result::ok).count())
            })
        });
    }
    group.finish();
}

// ── 3. Ledger ────────────────────────────────────────────────────────

fn bench_ledger(c: &mut Criterion) {
    c.bench_function("ledger_mark_to_market_100k", |bench| {
        bench.iter(|| {
            let mut ledger = PositionLedger::new();
            ledger.on_quote(100.0);
            ledger.apply_trade(Side::Buy, 100.25, 3).unwrap();
            for i in 0..100_000 {
                ledger.on_quote(black_box(100.0 + (i % 13) as f64 * 0.05));
            }
            black_box(ledger.total_pnl())
        })
    });
}

criterion_group!(benches, bench_replay, bench_merge, bench_ledger);
criterion_main!(benches);
