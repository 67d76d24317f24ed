use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use octree_gravity::{
    BarnesHut, DenseBarnesHut, DirectSummation, Execution, Parameters, Simulation, Solver,
};
use rand::{rngs::StdRng, SeedableRng};

fn seeded<S: Solver>(n: usize, solver: S, execution: Execution) -> Simulation<S> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut sim =
        Simulation::new(Parameters::default().with_body_count(n), solver).with_execution(execution);
    sim.seed(&mut rng).unwrap();
    sim
}

fn solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("solvers");
    for n in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("adaptive", n), &n, |b, &n| {
            b.iter_batched_ref(
                || seeded(n, BarnesHut::new(), Execution::SingleThreaded),
                |sim| sim.step(0.01).unwrap(),
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("dense", n), &n, |b, &n| {
            b.iter_batched_ref(
                || seeded(n, DenseBarnesHut::new(), Execution::SingleThreaded),
                |sim| sim.step(0.01).unwrap(),
                BatchSize::SmallInput,
            )
        });

        #[cfg(feature = "rayon")]
        {
            group.bench_with_input(BenchmarkId::new("adaptive rayon", n), &n, |b, &n| {
                b.iter_batched_ref(
                    || seeded(n, BarnesHut::new(), Execution::RayonIter),
                    |sim| sim.step(0.01).unwrap(),
                    BatchSize::SmallInput,
                )
            });

            group.bench_with_input(BenchmarkId::new("dense rayon", n), &n, |b, &n| {
                b.iter_batched_ref(
                    || seeded(n, DenseBarnesHut::new(), Execution::RayonIter),
                    |sim| sim.step(0.01).unwrap(),
                    BatchSize::SmallInput,
                )
            });
        }

        if n <= 1_000 {
            group.bench_with_input(BenchmarkId::new("direct", n), &n, |b, &n| {
                b.iter_batched_ref(
                    || seeded(n, DirectSummation::new(), Execution::SingleThreaded),
                    |sim| sim.step(0.01).unwrap(),
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

criterion_group!(benches, solvers);
criterion_main!(benches);
