use criterion::{criterion_group, criterion_main, Criterion};
use pet_core::GameState;

fn busy_pet() -> GameState {
    let mut s = GameState::new("Bench", 0);
    s.upgrades.auto_gather = 4;
    s.upgrades.resilience = 2;
    s
}

fn bench_tick(c: &mut Criterion) {
    let s = busy_pet();
    c.bench_function("live_tick", |b| {
        b.iter(|| pet_runtime::tick(&s, 120_000));
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let s = busy_pet();
    c.bench_function("reconcile_one_week", |b| {
        b.iter(|| pet_runtime::reconcile(s.clone(), 7 * 24 * 3_600_000));
    });
}

criterion_group!(benches, bench_tick, bench_reconcile);
criterion_main!(benches);
