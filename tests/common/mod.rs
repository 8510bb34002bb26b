//! Common test utilities for evhist integration tests.
#![allow(dead_code)]

use approx::assert_relative_eq;
use evhist::*;
use ndarray::{Array1, ArrayD};
use rand::prelude::*;
use std::sync::Arc;

/// Sample with one uniformly distributed column per `(name, lo, hi)`.
pub fn uniform_sample(n_events: usize, columns: &[(&str, f64, f64)], seed: u64) -> Sample {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample = Sample::new(n_events);
    for &(name, lo, hi) in columns {
        let values: Array1<f64> = (0..n_events).map(|_| rng.gen_range(lo..hi)).collect();
        sample.set_column(name, values).unwrap();
    }
    sample
}

/// Positive random weights.
pub fn random_weights(n_events: usize, seed: u64) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_events).map(|_| rng.gen_range(0.1..2.0)).collect()
}

/// `n_bins` linear bins over `[0, 10]` on dimension `x`.
pub fn linear_binning(n_bins: usize) -> MultiDimBinning {
    MultiDimBinning::one_dim(Dimension::linear("x", 0.0, 10.0, n_bins).unwrap())
}

/// 4 x 3 binning over `x` in `[0, 10]` and log-spaced `e` in `[1, 100]`.
pub fn binning_2d() -> MultiDimBinning {
    MultiDimBinning::new(vec![
        Dimension::linear("x", 0.0, 10.0, 4).unwrap(),
        Dimension::logarithmic("e", 1.0, 100.0, 3).unwrap(),
    ])
    .unwrap()
}

/// One engine per backend/storage combination.
pub fn engines() -> Vec<Arc<Engine>> {
    let configs = vec![
        EngineConfigBuilder::new()
            .backend(Backend::Sequential)
            .transform_storage(TransformStorage::Dense)
            .build()
            .unwrap(),
        EngineConfigBuilder::new()
            .backend(Backend::Parallel)
            .block_size(64)
            .transform_storage(TransformStorage::Sparse)
            .build()
            .unwrap(),
        EngineConfigBuilder::new()
            .backend(Backend::Parallel)
            .num_threads(3)
            .block_size(7)
            .transform_storage(TransformStorage::Auto)
            .build()
            .unwrap(),
    ];
    configs
        .into_iter()
        .map(|config| Arc::new(Engine::new(config).unwrap()))
        .collect()
}

/// Bin-by-bin comparison within a relative tolerance.
pub fn assert_hist_close(actual: &ArrayD<f64>, expected: &ArrayD<f64>, max_relative: f64) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_relative_eq!(*a, *e, epsilon = 1e-12, max_relative = max_relative);
    }
}
