//! Benchmarks for the move generator, make/unmake and the search.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use basalt::board::Position;
use basalt::search::{search, SearchLimits, SearchSettings};
use basalt::tt::TranspositionTable;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");

    let mut startpos = Position::new();
    for depth in 1..=4 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| startpos.perft(black_box(depth)))
        });
    }

    let mut kiwipete = Position::from_fen(KIWIPETE).unwrap();
    for depth in 1..=3 {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| kiwipete.perft(black_box(depth)))
        });
    }

    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("movegen");

    let startpos = Position::new();
    group.bench_function("startpos", |b| b.iter(|| black_box(startpos.legal_moves())));

    let kiwipete = Position::from_fen(KIWIPETE).unwrap();
    group.bench_function("kiwipete", |b| b.iter(|| black_box(kiwipete.legal_moves())));

    group.finish();
}

fn bench_make_unmake(c: &mut Criterion) {
    let mut position = Position::from_fen(KIWIPETE).unwrap();
    let moves = position.legal_moves();

    c.bench_function("make_unmake_all", |b| {
        b.iter(|| {
            for &mv in &moves {
                position.make_move(mv);
                position.unmake_move(mv);
            }
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    let position = Position::from_fen(KIWIPETE).unwrap();
    for depth in [4u32, 6] {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| {
                let tt = Arc::new(TranspositionTable::new(16));
                let stop = Arc::new(AtomicBool::new(false));
                search(
                    &position,
                    &tt,
                    &SearchLimits::depth(depth),
                    &SearchSettings::default(),
                    &stop,
                    None,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_perft,
    bench_movegen,
    bench_make_unmake,
    bench_search
);
criterion_main!(benches);
