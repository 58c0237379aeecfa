use std::ops::ControlFlow;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use monty_sim::{
    BatchRunner, DeterministicRng, HostModel, Preset, Seed, SimulationConfig, compute_statistics,
    run_batch,
};

const TRIALS: u64 = 10_000;

fn bench_host_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch.host_model");
    group.throughput(Throughput::Elements(TRIALS));

    for host_model in HostModel::ALL {
        let config = match host_model {
            HostModel::Biased | HostModel::SometimesSilent => SimulationConfig {
                door_count: 3,
                ..Preset::Advanced.plan().simulation
            },
            _ => SimulationConfig::default(),
        };
        let config = SimulationConfig {
            host_model,
            ..config
        };

        group.bench_with_input(
            BenchmarkId::new("run_batch", host_model),
            &config,
            |b, config| {
                b.iter(|| {
                    let mut rng = DeterministicRng::new(Seed::from("bench"));
                    let results = run_batch(config, &mut rng, TRIALS).expect("valid");
                    black_box(compute_statistics(&results))
                });
            },
        );
    }

    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch.chunk_size");
    group.throughput(Throughput::Elements(TRIALS));
    let config = SimulationConfig::default();

    for chunk_size in [100_usize, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut rng = DeterministicRng::new(Seed::from("bench"));
                    let runner =
                        BatchRunner::new(config.clone(), &mut rng, TRIALS).expect("valid");
                    black_box(
                        runner
                            .run_to_completion(chunk_size, |_, _| ControlFlow::Continue(()))
                            .expect("run"),
                    )
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_host_models, bench_chunking);
criterion_main!(benches);
