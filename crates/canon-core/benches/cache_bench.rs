//! # Cache Benchmarks
//!
//! Performance benchmarks for canon-core caching and reconciliation.
//!
//! Run with: `cargo bench -p canon-core`

use canon_core::{
    CacheConfig, Cookie, Entity, EntityCache, EntitySet, EntityState, Key, MergePolicy, Query,
    Scalar, Shared, key_from_bytes, key_to_bytes, merge,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

#[derive(Debug, Clone, PartialEq)]
struct Record {
    id: u64,
    bucket: u64,
    revision: u64,
}

impl EntityState for Record {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn is_update_required(&self, source: &Self) -> bool {
        self != source
    }
}

/// Snapshot of `size` records, every tenth slot empty.
fn snapshot(size: u64, revision: u64) -> Vec<Option<Shared<Record>>> {
    (0..size)
        .map(|id| {
            (id % 10 != 9).then(|| {
                Entity::shared(Record {
                    id,
                    bucket: id % 8,
                    revision,
                })
            })
        })
        .collect()
}

fn by_bucket(bucket: u64) -> Query<Record> {
    Query::<Record>::new("records")
        .and_then(|q| q.param("bucket", bucket))
        .expect("valid query")
        .matching(|r, p| p.get("bucket").and_then(Scalar::as_u64) == Some(r.bucket))
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_cache_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_object");

    for size in [100u64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let cache: EntityCache<Record> =
                    EntityCache::new(CacheConfig::default()).expect("config");
                let held: Vec<_> = (0..size)
                    .map(|id| {
                        cache
                            .cache_state(Record {
                                id,
                                bucket: id % 8,
                                revision: 0,
                            })
                            .expect("cache")
                    })
                    .collect();
                black_box(held)
            });
        });
    }

    group.finish();
}

fn bench_match_notification(c: &mut Criterion) {
    let cache: EntityCache<Record> = EntityCache::new(CacheConfig::default()).expect("config");
    let cookie = Cookie::new();
    for bucket in 0..8 {
        cache.add_cached_query(&by_bucket(bucket), EntitySet::new(), Some(&cookie));
    }
    let held: Vec<_> = (0..1000)
        .map(|id| {
            cache
                .cache_state(Record {
                    id,
                    bucket: id % 8,
                    revision: 0,
                })
                .expect("cache")
        })
        .collect();

    let mut revision = 0;
    c.bench_function("recache_with_8_queries", |b| {
        b.iter(|| {
            revision += 1;
            let id = revision % 1000;
            let canonical = cache
                .cache_state(Record {
                    id,
                    bucket: id % 8,
                    revision,
                })
                .expect("cache");
            black_box(canonical)
        });
    });
    drop(held);
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_all");

    for size in [100u64, 1000, 10000].iter() {
        let incoming = snapshot(*size, 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut existing = snapshot(size, 0);
                let report = merge(&mut existing, &incoming, MergePolicy::all()).expect("merge");
                black_box(report)
            });
        });
    }

    group.finish();
}

fn bench_key_encoding(c: &mut Criterion) {
    let key = Key::root("tenant")
        .child("records")
        .child(42u64)
        .child(Scalar::Bytes(vec![0xAB; 16]));

    c.bench_function("key_encode_decode", |b| {
        b.iter(|| {
            let bytes = key_to_bytes(black_box(&key)).expect("encode");
            black_box(key_from_bytes(&bytes).expect("decode"))
        });
    });
}

criterion_group!(
    benches,
    bench_cache_object,
    bench_match_notification,
    bench_merge,
    bench_key_encoding
);
criterion_main!(benches);
