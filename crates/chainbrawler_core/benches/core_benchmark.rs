//! Benchmarks for the pure hot paths of the core.
//!
//! Run with: cargo bench --package chainbrawler_core --bench core_benchmark

use std::time::SystemTime;

use alloy_primitives::{Address, U256};
use chainbrawler_core::codes;
use chainbrawler_core::config::PoolsConfig;
use chainbrawler_core::merkle::{leaf_hash, verify_proof, EpochRewardTree};
use chainbrawler_core::pools::{build_snapshot, format_ether};
use chainbrawler_core::{ErrorClassifier, LedgerError};
use chainbrawler_shared::PoolBalances;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn benchmark_classification(c: &mut Criterion) {
    let failures = [
        LedgerError::Code(1201),
        LedgerError::nested(1704, "execution reverted"),
        LedgerError::message("VM Exception: revert, error code: 1718"),
        LedgerError::message("connection reset"),
    ];

    let mut group = c.benchmark_group("classification");
    group.throughput(Throughput::Elements(failures.len() as u64));
    group.bench_function("extract_code", |b| {
        b.iter(|| {
            for failure in &failures {
                black_box(codes::extract_code(black_box(failure)));
            }
        });
    });
    group.bench_function("build", |b| {
        b.iter(|| {
            for failure in &failures {
                black_box(ErrorClassifier::build(Some(failure.clone()), &[]));
            }
        });
    });
    group.finish();
}

fn benchmark_pools(c: &mut Criterion) {
    let balances = PoolBalances {
        prize: U256::from(40_123_456_789_000_000_000u128),
        equipment: U256::from(30_000_000_000_000_000_000u128),
        gas_refund: U256::from(10_000_000_000_000_000_000u128),
        developer: U256::from(9_999_999_999_999_999_999u128),
        next_epoch: U256::from(5_000_000_000_000_000_001u128),
        emergency: U256::from(5u64),
    };
    let config = PoolsConfig::default();

    c.bench_function("pools_build_snapshot", |b| {
        b.iter(|| build_snapshot(black_box(&balances), &config, SystemTime::UNIX_EPOCH));
    });
    c.bench_function("format_ether", |b| {
        b.iter(|| format_ether(black_box(balances.prize), &config));
    });
}

fn benchmark_merkle(c: &mut Criterion) {
    let allocations: Vec<_> = (0..1024u64)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[12..].copy_from_slice(&i.to_be_bytes());
            (Address::from(bytes), U256::from(i * 1_000))
        })
        .collect();
    let batch = EpochRewardTree::from_allocations(7, &allocations).expect("non-empty batch");
    let account = allocations[517].0;
    let claim = batch.proof_for(account).expect("allocated account");
    let root = batch.root();

    c.bench_function("merkle_verify_1024", |b| {
        b.iter(|| {
            let leaf = leaf_hash(7, claim.index, black_box(account), claim.amount);
            verify_proof(root, leaf, black_box(&claim.proof))
        });
    });
    c.bench_function("merkle_build_1024", |b| {
        b.iter(|| EpochRewardTree::from_allocations(7, black_box(&allocations)));
    });
}

criterion_group!(
    benches,
    benchmark_classification,
    benchmark_pools,
    benchmark_merkle
);
criterion_main!(benches);
