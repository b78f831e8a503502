use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use shadowchat::clock::ManualClock;
use shadowchat::config::Config;
use shadowchat::engine::Engine;
use shadowchat::security::ContentFilter;
use shadowchat::state::UserId;
use shadowchat::store::{MemoryStore, SharedStore};
use std::sync::Arc;
use tokio::runtime::Runtime;

// Pairs per iteration: each iteration searches 2 * PAIRS fresh users.
const PAIRS: i64 = 100;

fn engine() -> Engine {
    let config = Config::from_toml("[listen]\naddress = \"127.0.0.1:0\"\n").unwrap();
    let clock = Arc::new(ManualClock::default());
    let store: SharedStore = Arc::new(MemoryStore::new(clock.clone()));
    Engine::new(store, clock, &config)
}

fn matching_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("matching");
    group.throughput(Throughput::Elements(PAIRS as u64));

    group.bench_function("search_pairs", |b| {
        b.to_async(&rt).iter(|| async {
            let engine = engine();
            for id in 0..PAIRS * 2 {
                engine.search(UserId(id), None).await.unwrap();
            }
        })
    });

    group.finish();
}

fn filter_benchmark(c: &mut Criterion) {
    let filter = ContentFilter::default();
    let text = "halo apa kabar b4ngs4t kamu lagi ngapain hari ini";
    let mut group = c.benchmark_group("filter");
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("censor", |b| b.iter(|| filter.censor(text)));

    group.finish();
}

criterion_group!(benches, matching_benchmark, filter_benchmark);
criterion_main!(benches);
