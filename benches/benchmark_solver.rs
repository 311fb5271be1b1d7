use criterion::{criterion_group, criterion_main, Criterion};
use halo_comm::LocalUniverse;
use jacobi_cfd::{ExchangeMode, RunConfig, Solver};

const WORKERS: [usize; 3] = [1, 2, 4];

pub fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("Solver");
    group.significance_level(0.1).sample_size(10);
    for workers in WORKERS.iter() {
        for exchange in [ExchangeMode::Paired, ExchangeMode::NonBlocking] {
            let config = RunConfig {
                scale_factor: 4,
                iterations: 100,
                print_interval: usize::MAX,
                workers: *workers,
                exchange,
                ..RunConfig::default()
            };
            let name = format!("128 x 128, 100 iterations, {} worker(s), {:?}", workers, exchange);
            group.bench_function(&name, |b| {
                b.iter(|| {
                    LocalUniverse::new(config.workers)
                        .unwrap()
                        .run(|comm| Solver::new(comm, &config)?.run().map(|o| o.iterations))
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_solver);
criterion_main!(benches);
