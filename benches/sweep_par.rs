use bqreg::regression::GibbsQuantile;
use bqreg::{LatentScale, QuantileTarget};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use statrs::distribution::Normal;

fn median_model(n: usize, k: usize, threads: usize) -> GibbsQuantile {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x = Array2::from_shape_fn((n, k), |(_, j)| {
        if j == 0 { 1.0 } else { rng.sample(Normal::standard()) }
    });
    let y = Array1::from_shape_fn(n, |i| x.row(i).sum() + rng.sample(Normal::standard()));
    let mut model = GibbsQuantile::from_data(y, x).unwrap();
    model
        .set_prior_params(Array1::zeros(k), Array2::eye(k) * 1000.0, 3.0, 3.0)
        .unwrap();
    model.set_seed_value(1111);
    model.set_thread_count(threads).unwrap();
    model
}

fn bench_sweeps_single_thread(c: &mut Criterion) {
    let mut model = median_model(20_000, 4, 1);
    c.bench_function("gibbs_10_sweeps_1_thread", |bencher| {
        bencher.iter(|| {
            let draws = model.fit(0.5, 0, 10, 0).unwrap();
            black_box(draws.len());
        });
    });
}

fn bench_sweeps_all_threads(c: &mut Criterion) {
    let mut model = median_model(20_000, 4, rayon::current_num_threads());
    c.bench_function("gibbs_10_sweeps_all_threads", |bencher| {
        bencher.iter(|| {
            let draws = model.fit(0.5, 0, 10, 0).unwrap();
            black_box(draws.len());
        });
    });
}

fn bench_latent_draws(c: &mut Criterion) {
    let n = 100_000;
    let latent = LatentScale::new(&QuantileTarget::new(0.25).unwrap(), 1.0).unwrap();
    let residuals: Vec<f64> = (0..n).map(|i| (i as f64 / n as f64) - 0.5).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    c.bench_function("draw_vec", |bencher| {
        bencher.iter(|| black_box(latent.draw_vec(&mut rng, &residuals)));
    });
    c.bench_function("draw_vec_par_deterministic", |bencher| {
        bencher.iter(|| black_box(latent.draw_vec_par_deterministic(&mut rng, &residuals)));
    });
}

criterion_group!(
    benches,
    bench_sweeps_single_thread,
    bench_sweeps_all_threads,
    bench_latent_draws
);
criterion_main!(benches);
