use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cometfit::kepler::{solve_barker, solve_kepler_elliptic, solve_kepler_hyperbolic, KEPLER_EPS};

/// Uniform random in [-π, π)
#[inline]
fn rand_mean_anomaly(rng: &mut StdRng) -> f64 {
    (rng.random::<f64>() - 0.5) * std::f64::consts::TAU
}

/// Typical regime: e ∈ [0.0, 0.7]
fn bench_typical(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let samples = 10_000usize;

    c.bench_function("solve_kepler_equation/typical_e<=0.7", |b| {
        b.iter_batched(
            || {
                // Pre-generate inputs to avoid RNG cost in the timed section
                (0..samples)
                    .map(|_| (rand_mean_anomaly(&mut rng), rng.random_range(0.0..=0.7)))
                    .collect::<Vec<_>>()
            },
            |cases| {
                for (m, e) in cases {
                    let ecc_anom =
                        solve_kepler_elliptic(black_box(m), black_box(e), KEPLER_EPS).unwrap();
                    black_box(ecc_anom);
                }
            },
            BatchSize::LargeInput,
        )
    });
}

/// Comet-like regime: e ∈ [0.9, 0.999]
fn bench_high_e(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xBADF00D);
    let samples = 10_000usize;

    c.bench_function("solve_kepler_equation/high_e_0.9..0.999", |b| {
        b.iter_batched(
            || {
                (0..samples)
                    .map(|_| (rand_mean_anomaly(&mut rng), rng.random_range(0.9..0.999)))
                    .collect::<Vec<_>>()
            },
            |cases| {
                for (m, e) in cases {
                    let _ = black_box(solve_kepler_elliptic(black_box(m), black_box(e), KEPLER_EPS));
                }
            },
            BatchSize::LargeInput,
        )
    });
}

/// Open orbits: hyperbolic e ∈ [1.01, 3] and the parabolic Barker equation.
fn bench_open_orbits(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xFEEDFACE);
    let samples = 10_000usize;

    c.bench_function("solve_kepler_equation/hyperbolic_e_1.01..3", |b| {
        b.iter_batched(
            || {
                (0..samples)
                    .map(|_| (rng.random_range(-50.0..50.0), rng.random_range(1.01..3.0)))
                    .collect::<Vec<(f64, f64)>>()
            },
            |cases| {
                for (m, e) in cases {
                    let _ =
                        black_box(solve_kepler_hyperbolic(black_box(m), black_box(e), KEPLER_EPS));
                }
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("solve_kepler_equation/barker", |b| {
        b.iter(|| black_box(solve_barker(black_box(3.7))))
    });
}

/// Fixed stress case: near-parabolic ellipse close to pericenter.
fn bench_fixed_stress(c: &mut Criterion) {
    let e = 0.999_5_f64;
    let m = 1.0e-4_f64;

    c.bench_function("solve_kepler_equation/fixed_stress_case", |b| {
        b.iter(|| {
            let f = solve_kepler_elliptic(black_box(m), black_box(e), KEPLER_EPS);
            black_box(f.ok());
        })
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_typical, bench_high_e, bench_open_orbits, bench_fixed_stress
);
criterion_main!(benches);
