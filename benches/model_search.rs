use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use congestion_forecast::optimizer::{GridSearchCV, ParamGrid, SearchConfig};
use congestion_forecast::training::{Regressor, XGBoostConfig, XGBoostRegressor};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_regression_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);
    let y = x
        .rows()
        .into_iter()
        .map(|row| row.sum() + rng.gen::<f64>() * 0.1)
        .collect();
    (x, y)
}

fn bench_xgboost_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("xgboost");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let (x, y) = create_regression_data(*n_rows, 7);
        group.bench_with_input(BenchmarkId::new("fit", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                let mut model = XGBoostRegressor::new(XGBoostConfig::default().with_n_estimators(20));
                model.fit(black_box(x), black_box(y)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let (x, y) = create_regression_data(1000, 7);
    let grid = ParamGrid::new()
        .add("learning_rate", [0.01, 0.1, 0.3])
        .add("n_estimators", [10i64, 20])
        .add("max_depth", [3i64, 5]);

    for n_jobs in [1usize, 4].iter() {
        group.bench_with_input(BenchmarkId::new("n_jobs", n_jobs), n_jobs, |b, &n_jobs| {
            b.iter(|| {
                let search = GridSearchCV::with_config(
                    XGBoostRegressor::default(),
                    grid.clone(),
                    SearchConfig::default().with_n_jobs(n_jobs),
                );
                search.fit(black_box(&x), black_box(&y)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_xgboost_fit, bench_grid_search);
criterion_main!(benches);
