use criterion::{criterion_group, criterion_main, Criterion};
use jacobi_cfd::{BoundaryInitializer, Field, Geometry, Partition, StencilKernel, Sweep};

const SCALES: [usize; 4] = [1, 4, 8, 16];

pub fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sweep");
    group.significance_level(0.1).sample_size(10);
    for scale in SCALES.iter() {
        let g = Geometry::default().scaled(*scale).unwrap();
        let p = Partition::new(g.m, g.n, 1, 0).unwrap();
        let mut cur = Field::for_partition(&p);
        BoundaryInitializer::new(g).unwrap().apply(&mut cur, &p).unwrap();
        let mut next = cur.clone();

        let name = format!("Size: {} x {} (serial)", g.m, g.n);
        let kernel = StencilKernel::new(Sweep::Serial);
        group.bench_function(&name, |b| b.iter(|| kernel.apply(&cur, &mut next)));

        let name = format!("Size: {} x {} (parallel)", g.m, g.n);
        let kernel = StencilKernel::new(Sweep::Parallel);
        group.bench_function(&name, |b| b.iter(|| kernel.apply(&cur, &mut next)));
    }
    group.finish();
}

criterion_group!(benches, bench_sweep);
criterion_main!(benches);
