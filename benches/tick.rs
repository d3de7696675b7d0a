//! Tick throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lane_runner::game::input::InputCommand;
use lane_runner::game::session::RunSession;
use lane_runner::game::state::RunState;
use lane_runner::game::tick::{tick, RunConfig};

fn bench_tick(c: &mut Criterion) {
    let config = RunConfig::default();

    // Warm state with a populated track
    let mut warm = RunState::new(12345, 0);
    for t in 0..600u32 {
        let inputs = [InputCommand::MoveLane((t % 3) as u8), InputCommand::SetJumping(t % 2 == 0)];
        tick(&mut warm, &inputs, &config);
        if !warm.alive {
            warm = RunState::new(12345 + t as u64, 0);
        }
    }

    c.bench_function("tick", |b| {
        b.iter_batched(
            || warm.clone(),
            |mut state| {
                tick(&mut state, black_box(&[InputCommand::SetJumping(true)]), &config);
                state
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("session_step_600", |b| {
        b.iter(|| {
            let mut session = RunSession::new(config.clone(), black_box(99)).unwrap();
            session.start_game(None);
            for _ in 0..600 {
                if session.step().is_none() {
                    session.start_game(None);
                }
            }
            session.run().compute_hash()
        })
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
