use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use optimize_rs::{
    test_models::{NormalModel, ScaleModel},
    FitSettings, NewtonStep, NoInits, NoInterrupt, NullWriter, Optimizer, Step, Writers,
};

fn fit_normal(mu: &[f64]) -> f64 {
    let mut model = NormalModel::new(mu.to_vec());
    let settings = FitSettings {
        seed: 42,
        ..Default::default()
    };
    let (mut message, mut init, mut parameter) = (NullWriter, NullWriter, NullWriter);
    let outcome = Optimizer::new(&mut model, NewtonStep::default(), settings)
        .run(
            &NoInits,
            &mut NoInterrupt,
            Writers {
                message: &mut message,
                init: &mut init,
                parameter: &mut parameter,
            },
        )
        .unwrap();
    outcome.log_density
}

fn criterion_benchmark(c: &mut Criterion) {
    let mu = vec![3.; 10];
    c.bench_function("fit normal 10", |b| b.iter(|| fit_normal(black_box(&mu))));

    let mu = vec![3.; 100];
    c.bench_function("fit normal 100", |b| b.iter(|| fit_normal(black_box(&mu))));

    let mut model = ScaleModel::new(1.);
    let mut step = NewtonStep::default();
    c.bench_function("newton step scale", |b| {
        b.iter_batched(
            || vec![2., 1.5],
            |mut position| {
                step.step(&mut model, &mut position, &mut NullWriter)
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });

    let mut model = NormalModel::new(vec![3.; 50]);
    let mut step = NewtonStep::default();
    c.bench_function("newton step normal 50", |b| {
        b.iter_batched(
            || vec![0.; 50],
            |mut position| {
                step.step(&mut model, &mut position, &mut NullWriter)
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
