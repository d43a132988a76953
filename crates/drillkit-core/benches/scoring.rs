use std::time::Duration;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drillkit_core::item::{Item, ItemId, ItemKind, Operator};
use drillkit_core::model::{AnswerEvent, Variant};
use drillkit_core::presets;
use drillkit_core::scoring::ScoreState;

fn event(value: &str, timed_out: bool) -> AnswerEvent {
    AnswerEvent {
        item_id: ItemId(1),
        value: value.into(),
        timed_out,
        elapsed: Duration::from_millis(1200),
        timestamp: Utc::now(),
    }
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let policy = presets::config(Variant::Arithmetic).scoring;
    let item = Item::new(ItemKind::Arithmetic {
        lhs: 7,
        op: Operator::Add,
        rhs: 5,
    });
    let correct = event("12", false);
    let wrong = event("13", false);
    let timeout = event("", true);

    group.bench_function("apply_correct", |b| {
        let state = ScoreState::new(1);
        b.iter(|| policy.apply(black_box(&state), black_box(&correct), &item))
    });

    group.bench_function("apply_timeout", |b| {
        let state = ScoreState::new(1);
        b.iter(|| policy.apply(black_box(&state), black_box(&timeout), &item))
    });

    group.bench_function("session_of_50", |b| {
        b.iter(|| {
            let mut state = ScoreState::new(1);
            for n in 0..50 {
                let answer = if n % 7 == 6 { &wrong } else { &correct };
                state = policy.apply(&state, answer, &item).state;
            }
            black_box(state)
        })
    });

    group.bench_function("sudoku_group_bonus", |b| {
        let policy = presets::config(Variant::Sudoku).scoring;
        let mut state = ScoreState::new(3);
        state.group_mistakes = 4;
        b.iter(|| policy.complete_group(black_box(&state)))
    });

    group.finish();
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
