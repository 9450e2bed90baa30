//! Performance benchmarks for the session store and board rules

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;
use tictactoe_hub::game::rules;
use tictactoe_hub::hub::{SessionStore, StateSynchronizer};
use tictactoe_hub::metrics::MetricsCollector;
use tictactoe_hub::types::{Cell, GameState, GameStatus};

fn populated_store(sessions: usize) -> SessionStore {
    let store = SessionStore::new();
    for i in 0..sessions {
        let session_id = store
            .create(&format!("x-{}", i), &format!("o-{}", i))
            .unwrap();
        if i % 2 == 0 {
            let state = store.get(&session_id).unwrap().unwrap();
            state.write().unwrap().status = GameStatus::InProgress;
        }
    }
    store
}

fn bench_store_create(c: &mut Criterion) {
    let store = SessionStore::new();

    c.bench_function("store_create", |b| {
        b.iter(|| black_box(store.create("alice", "bob").unwrap()))
    });
}

fn bench_store_snapshot(c: &mut Criterion) {
    let store = populated_store(1_000);

    c.bench_function("store_snapshot_1000", |b| {
        b.iter(|| black_box(store.snapshot().unwrap()))
    });
}

fn bench_synchronizer_tick(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = populated_store(1_000);
    let (sync, mut snapshots) = StateSynchronizer::new(
        store,
        Duration::from_secs(5),
        1,
        Arc::new(MetricsCollector::default()),
    );

    c.bench_function("synchronizer_tick_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(sync.tick().await.unwrap());
                black_box(snapshots.recv().await.unwrap());
            })
        })
    });
}

fn bench_full_game(c: &mut Criterion) {
    // X wins on the diagonal after five moves
    let script = [(Cell::X, 0u8), (Cell::O, 1), (Cell::X, 4), (Cell::O, 2), (Cell::X, 8)];

    c.bench_function("apply_move_full_game", |b| {
        b.iter(|| {
            let mut state = GameState::new("x".to_string(), "o".to_string());
            for (mark, position) in script {
                black_box(rules::apply_move(&mut state, mark, position).unwrap());
            }
            state
        })
    });
}

criterion_group!(
    benches,
    bench_store_create,
    bench_store_snapshot,
    bench_synchronizer_tick,
    bench_full_game
);
criterion_main!(benches);
