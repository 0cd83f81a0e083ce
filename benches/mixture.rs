use criterion::black_box;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use emix::prelude::*;
use nalgebra::{DMatrix, DVector};

fn mixture(dims: usize, k: usize, df: f64) -> Mixture {
    let cpnts = (0..k)
        .map(|ix| {
            let mean = DVector::from_element(dims, ix as f64);
            Component::new(1.0, mean, DMatrix::identity(dims, dims)).unwrap()
        })
        .collect();
    Mixture::new(cpnts, df).unwrap()
}

fn points(mm: &Mixture, n: usize) -> DMatrix<f64> {
    let mut rng = rand::thread_rng();
    let mut xs = DMatrix::zeros(n, mm.ndims());
    mm.draw_into(&mut rng, &mut xs).unwrap();
    xs
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mixture evaluate, 1000 points, k = 4");
    for dims in [1, 3, 10] {
        for (name, df) in [("gaussian", f64::INFINITY), ("t", 4.0)] {
            let mm = mixture(dims, 4, df);
            let xs = points(&mm, 1000);
            let mut fx = DVector::zeros(1000);
            group.bench_function(format!("{} {} dims", name, dims), |b| {
                b.iter(|| black_box(mm.evaluate(&xs, &mut fx)))
            });
        }
    }
}

fn bench_draw_into(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mixture draw_into, k = 4");
    for n in [1, 100, 1000] {
        let mm = mixture(3, 4, 4.0);
        group.bench_with_input(n.to_string(), &n, |b, &n| {
            b.iter_batched_ref(
                || (rand::thread_rng(), DMatrix::zeros(n, 3)),
                |(rng, xs)| black_box(mm.draw_into(rng, xs)),
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_update_em(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mixture update_em, 1000 points");
    for k in [2, 8] {
        let mm = mixture(3, k, f64::INFINITY);
        let xs = points(&mm, 1000);
        group.bench_with_input(format!("k = {}", k), &k, |b, _| {
            b.iter_batched_ref(
                || mm.clone(),
                |fit| black_box(fit.update_em_unweighted(&xs, Damping::default())),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(
    mixture_benches,
    bench_evaluate,
    bench_draw_into,
    bench_update_em
);
criterion_main!(mixture_benches);
