//! Benchmarks for the FIFO lock manager and admission controller.
//!
//! Benchmarks cover:
//! - In-memory coordination store primitives
//! - Uncontended and contended `run_exclusive`
//! - End-to-end admission into a course

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use prometheus_admission::builders::build_in_memory;
use prometheus_admission::config::{LockConfig, ServiceConfig};
use prometheus_admission::core::{CoordinationStore, FifoLockManager, LockError, LockManager};
use prometheus_admission::infra::InMemoryCoordinationStore;

use tokio::runtime::Runtime;

// ============================================================================
// Helper Functions
// ============================================================================

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn bench_config() -> ServiceConfig {
    ServiceConfig {
        lock: LockConfig {
            retry_delay_ms: 1,
            ..LockConfig::default()
        },
        ..ServiceConfig::default()
    }
}

// ============================================================================
// Store Benchmarks
// ============================================================================

fn bench_store_queue_roundtrip(c: &mut Criterion) {
    let rt = runtime();
    let store = InMemoryCoordinationStore::new();

    c.bench_function("store_append_head_remove", |b| {
        b.to_async(&rt).iter(|| async {
            store.append("queue:bench", "ticket").await.unwrap();
            black_box(store.range("queue:bench", 0, 0).await.unwrap());
            store.remove_one("queue:bench", "ticket").await.unwrap();
        });
    });

    c.bench_function("store_lease_set_delete", |b| {
        b.to_async(&rt).iter(|| async {
            let took = store
                .set_if_absent("lock:bench", "ticket", Duration::from_secs(30))
                .await
                .unwrap();
            black_box(took);
            store.delete("lock:bench").await.unwrap();
        });
    });
}

// ============================================================================
// Lock Benchmarks
// ============================================================================

fn bench_lock_uncontended(c: &mut Criterion) {
    let rt = runtime();
    let locks = FifoLockManager::new(
        Arc::new(InMemoryCoordinationStore::new()),
        bench_config().lock,
    );

    c.bench_function("lock_uncontended", |b| {
        b.to_async(&rt).iter(|| async {
            let v = locks
                .run_exclusive("course-bench", || async { Ok::<_, LockError>(1u32) })
                .await
                .unwrap();
            black_box(v);
        });
    });
}

fn bench_lock_contended(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("lock_contended");

    for callers in [4u64, 16, 64] {
        group.throughput(Throughput::Elements(callers));
        group.bench_with_input(BenchmarkId::from_parameter(callers), &callers, |b, &callers| {
            b.to_async(&rt).iter(|| async move {
                let locks = Arc::new(FifoLockManager::new(
                    Arc::new(InMemoryCoordinationStore::new()),
                    bench_config().lock,
                ));
                let handles: Vec<_> = (0..callers)
                    .map(|_| {
                        let locks = Arc::clone(&locks);
                        tokio::spawn(async move {
                            locks
                                .run_exclusive("course-bench", || async { Ok::<_, LockError>(()) })
                                .await
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.await.unwrap().unwrap();
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Admission Benchmarks
// ============================================================================

fn bench_admission_fill_course(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("admission_fill_course");

    for seats in [10u32, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(seats), &seats, |b, &seats| {
            b.to_async(&rt).iter(|| async move {
                let (controller, _store, _records) = build_in_memory(&bench_config()).unwrap();
                let controller = Arc::new(controller);
                let handles: Vec<_> = (0..seats * 2)
                    .map(|i| {
                        let controller = Arc::clone(&controller);
                        tokio::spawn(async move {
                            controller.admit("course-bench", &format!("user-{i}"), seats).await
                        })
                    })
                    .collect();
                let mut admitted = 0;
                for handle in handles {
                    if handle.await.unwrap().is_ok() {
                        admitted += 1;
                    }
                }
                black_box(admitted);
            });
        });
    }
    group.finish();
}

criterion_group!(store_benches, bench_store_queue_roundtrip);

criterion_group!(lock_benches, bench_lock_uncontended, bench_lock_contended);

criterion_group!(admission_benches, bench_admission_fill_course);

criterion_main!(store_benches, lock_benches, admission_benches);
