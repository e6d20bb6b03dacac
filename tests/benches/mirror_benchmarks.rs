//! # Chain-Mirror Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | Entity mirror | Include a block, evict a height |
//! | Reconciliation | Scan window construction |
//! | Accounts | Ledger delta between two snapshots |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use std::collections::BTreeMap;

use mirror_sync::algorithms::{compute_delta, ScanWindow};
use mirror_sync::domain::{BlockHeaderRecord, DecodedBlock, DecodedTransaction, EntityMirror};
use shared_types::{AccountSnapshot, ChainSummary, CurrencyId};

fn block(height: u64, tx_count: usize) -> DecodedBlock {
    let mut rng = rand::thread_rng();
    DecodedBlock {
        hash: rng.gen(),
        kernel_hash: rng.gen(),
        height,
        timestamp: 1_600_000_000 + height,
        transactions: (0..tx_count)
            .map(|_| DecodedTransaction {
                hash: rng.gen(),
                raw: vec![0u8; 256],
            })
            .collect(),
    }
}

fn bench_mirror_include_and_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity-mirror");

    for tx_count in [0usize, 10, 100, 1_000] {
        group.throughput(Throughput::Elements(tx_count as u64 + 1));
        group.bench_with_input(
            BenchmarkId::new("include_then_evict", tx_count),
            &tx_count,
            |b, &tx_count| {
                let mut mirror = EntityMirror::new();
                mirror.set_summary(ChainSummary {
                    tip_height: 100,
                    ..ChainSummary::default()
                });
                b.iter_batched(
                    || block(50, tx_count),
                    |decoded| {
                        let hash = decoded.hash;
                        mirror.put_header(BlockHeaderRecord::new(50, hash, [0u8; 32]));
                        mirror.include_block(decoded, true);
                        black_box(mirror.evict_height(50))
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_scan_window(c: &mut Criterion) {
    c.bench_function("scan_window_descending", |b| {
        b.iter(|| {
            let window = ScanWindow::new(black_box(0), black_box(1_000_000), black_box(30));
            window.descending().sum::<u64>()
        })
    });
}

fn snapshot(currencies: usize) -> AccountSnapshot {
    let mut rng = rand::thread_rng();
    let balances: BTreeMap<CurrencyId, u64> = (0..currencies)
        .map(|_| (CurrencyId(rng.gen()), rng.gen_range(1..1_000_000)))
        .collect();
    AccountSnapshot {
        balances,
        nonce: rng.gen_range(0..1_000),
        delegate: None,
    }
}

fn bench_ledger_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger-delta");

    for currencies in [1usize, 16, 256] {
        let prev = snapshot(currencies);
        let next = snapshot(currencies);
        group.bench_with_input(
            BenchmarkId::new("compute_delta", currencies),
            &(prev, next),
            |b, (prev, next)| b.iter(|| black_box(compute_delta(prev, next))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mirror_include_and_evict,
    bench_scan_window,
    bench_ledger_delta
);
criterion_main!(benches);
