use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gb_inference::bootstrap::{BootstrapConfig, weighted_error, weighted_error_par};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::hint::black_box;

fn sample(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(42);
    let v = Normal::new(220.0, 30.0).unwrap();
    let s = Normal::new(5.0, 1.0).unwrap();
    let values = (0..n).map(|_| v.sample(&mut rng)).collect();
    let sigmas = (0..n).map(|_| s.sample(&mut rng).abs() + 0.1).collect();
    (values, sigmas)
}

fn bench_bootstrap(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted_error");
    for n in [10usize, 100, 1000] {
        let (values, sigmas) = sample(n);
        group.bench_with_input(BenchmarkId::new("serial", n), &n, |b, _| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(7);
                black_box(weighted_error(&values, &sigmas, 1000, &mut rng).unwrap())
            })
        });
        let cfg = BootstrapConfig { seed: 7, ..Default::default() };
        group.bench_with_input(BenchmarkId::new("rayon", n), &n, |b, _| {
            b.iter(|| black_box(weighted_error_par(&values, &sigmas, &cfg).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bootstrap);
criterion_main!(benches);
