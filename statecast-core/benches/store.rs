use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use statecast_core::{StateStore, StoreState};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Tick {
    value: u64,
}

impl StoreState for Tick {
    type Tag = ();

    fn tag(&self) -> Self::Tag {}
}

fn bench_commit(c: &mut Criterion) {
    let store = StateStore::with_identifier(Tick { value: 0 }, "bench-commit");
    let mut value = 0u64;

    c.bench_function("store_set", |b| {
        b.iter(|| {
            value += 1;
            store.set(black_box(Tick { value }));
        });
    });
    store.flush();
}

fn bench_commit_with_subscriber(c: &mut Criterion) {
    let store = StateStore::with_identifier(Tick { value: 0 }, "bench-subscribed");
    let _token = store.subscribe(|state| {
        black_box(state.value);
    });
    let mut value = 0u64;

    c.bench_function("store_set_subscribed", |b| {
        b.iter(|| {
            value += 1;
            store.set(black_box(Tick { value }));
        });
    });
    store.flush();
}

fn bench_get(c: &mut Criterion) {
    let store = StateStore::with_identifier(Tick { value: 42 }, "bench-get");

    c.bench_function("store_get", |b| {
        b.iter(|| black_box(store.get()));
    });
}

criterion_group!(
    benches,
    bench_commit,
    bench_commit_with_subscriber,
    bench_get
);
criterion_main!(benches);
