//! The engine facade.
//!
//! [`Engine`] binds a configured [`HistogramBackend`] to a shared
//! [`TransformCache`]. Callers accumulate directly, or build a transform
//! once and re-histogram many weight vectors through it.

use crate::binning::MultiDimBinning;
use crate::config::EngineConfig;
use crate::core::error::{HistError, Result};
use crate::core::types::{Backend, BinIndex, Hist};
use crate::dataset::{Container, Sample};
use crate::histogram::{
    CacheStatistics, HistogramBackend, ParallelBackend, SequentialBackend, Transform,
    TransformCache, TransformKey, TransformKind,
};
use crate::histogrammer::{CalcMode, Histogrammer};
use ndarray::{ArrayD, ArrayView1};
use std::sync::{Arc, Mutex, MutexGuard};

/// Configured backend plus transform cache.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    backend: Arc<dyn HistogramBackend>,
    transforms: Mutex<TransformCache>,
}

static_assertions::assert_impl_all!(Engine: Send, Sync);
static_assertions::assert_impl_all!(Transform: Send, Sync);
static_assertions::assert_impl_all!(TransformCache: Send, Sync);
static_assertions::assert_impl_all!(SequentialBackend: Send, Sync);
static_assertions::assert_impl_all!(ParallelBackend: Send, Sync);

impl Engine {
    /// Validate `config` and construct its backend.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let backend: Arc<dyn HistogramBackend> = match config.backend {
            Backend::Sequential => Arc::new(
                SequentialBackend::new().with_dropped_warn_fraction(config.dropped_warn_fraction),
            ),
            Backend::Parallel if config.num_threads > 0 => Arc::new(
                ParallelBackend::with_threads(config.block_size, config.num_threads)?
                    .with_dropped_warn_fraction(config.dropped_warn_fraction),
            ),
            Backend::Parallel => Arc::new(
                ParallelBackend::new(config.block_size)?
                    .with_dropped_warn_fraction(config.dropped_warn_fraction),
            ),
        };
        log::info!(
            "evhist engine: {} backend, {} threads, block size {}, {:?} transforms",
            backend.name(),
            config.effective_num_threads(),
            config.block_size,
            config.transform_storage
        );
        Ok(Self::with_backend(config, backend))
    }

    /// Use a caller-supplied backend; `config.backend` is ignored.
    pub fn with_backend(config: EngineConfig, backend: Arc<dyn HistogramBackend>) -> Self {
        let transforms = TransformCache::new(config.cache_depth, config.cache_lru);
        Engine {
            config,
            backend,
            transforms: Mutex::new(transforms),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn HistogramBackend {
        self.backend.as_ref()
    }

    /// Wrap `sample` in a container served by this engine.
    pub fn new_container<S: Into<String>>(self: &Arc<Self>, name: S, sample: Sample) -> Container {
        Container::new(name, sample, Arc::clone(self))
    }

    /// Histogram of `weights` (unit weights when `None`) shaped per
    /// `binning`. Out-of-range events are dropped.
    pub fn accumulate(
        &self,
        sample: &Sample,
        weights: Option<ArrayView1<'_, f64>>,
        binning: &MultiDimBinning,
    ) -> Result<ArrayD<Hist>> {
        self.backend.accumulate(sample, weights, binning)
    }

    /// Histogram and sumw2 of `weights`.
    pub fn accumulate_with_variance(
        &self,
        sample: &Sample,
        weights: ArrayView1<'_, f64>,
        binning: &MultiDimBinning,
    ) -> Result<(ArrayD<Hist>, ArrayD<Hist>)> {
        self.backend.accumulate_with_variance(sample, weights, binning)
    }

    /// Flat bin index per event (`OUT_OF_RANGE` when dropped).
    pub fn bin_indices(&self, sample: &Sample, binning: &MultiDimBinning) -> Result<Vec<BinIndex>> {
        self.backend.bin_indices(sample, binning)
    }

    /// Build an uncached one-hot transform for the current state of `sample`.
    pub fn build_transform(&self, sample: &Sample, binning: &MultiDimBinning) -> Result<Transform> {
        let indices = self.backend.bin_indices(sample, binning)?;
        Transform::from_bin_indices(
            &indices,
            binning,
            sample.key(),
            self.config.transform_storage,
            self.config.dense_transform_limit,
        )
    }

    /// Build an uncached combined transform: per calc bin, the number of
    /// events falling in each apply bin. The two binnings must not share a
    /// dimension name.
    pub fn build_combined_transform(
        &self,
        sample: &Sample,
        calc: &MultiDimBinning,
        apply: &MultiDimBinning,
    ) -> Result<Transform> {
        let combined = calc.combine(apply)?;
        let counts = self.backend.count_flat(sample, &combined)?;
        Transform::from_combined_counts(
            &counts,
            calc,
            apply,
            sample.key(),
            self.config.transform_storage,
            self.config.dense_transform_limit,
        )
    }

    /// Cached [`Engine::build_transform`].
    pub fn transform(&self, sample: &Sample, binning: &MultiDimBinning) -> Result<Arc<Transform>> {
        let key = (sample.key(), TransformKind::one_hot(binning));
        self.cached(key, || self.build_transform(sample, binning))
    }

    /// Cached [`Engine::build_combined_transform`].
    pub fn combined_transform(
        &self,
        sample: &Sample,
        calc: &MultiDimBinning,
        apply: &MultiDimBinning,
    ) -> Result<Arc<Transform>> {
        let key = (sample.key(), TransformKind::combined(calc, apply));
        self.cached(key, || self.build_combined_transform(sample, calc, apply))
    }

    /// Histogramming step with this engine's configured error method.
    pub fn histogrammer(
        &self,
        calc_mode: CalcMode,
        apply_binning: MultiDimBinning,
    ) -> Result<Histogrammer> {
        Histogrammer::new(calc_mode, apply_binning, self.config.error_method)
    }

    /// `weights · transform`, shaped per the transform's binning.
    pub fn apply_transform(
        &self,
        transform: &Transform,
        weights: ArrayView1<'_, f64>,
    ) -> Result<ArrayD<Hist>> {
        transform.apply(weights)
    }

    /// Histogram and sumw2 through a transform.
    pub fn apply_transform_with_variance(
        &self,
        transform: &Transform,
        weights: ArrayView1<'_, f64>,
    ) -> Result<(ArrayD<Hist>, ArrayD<Hist>)> {
        transform.apply_with_variance(weights)
    }

    /// Histogram through the cached transform of `sample` and `binning`,
    /// building it on first use. Equal to [`Engine::accumulate`] within
    /// float tolerance.
    pub fn histogram(
        &self,
        sample: &Sample,
        weights: ArrayView1<'_, f64>,
        binning: &MultiDimBinning,
    ) -> Result<ArrayD<Hist>> {
        sample.check_weights(&weights)?;
        let transform = self.transform(sample, binning)?;
        transform.apply_checked(sample.key(), binning, weights)
    }

    /// Drop every cached transform of sample `id`.
    pub fn invalidate_sample(&self, id: u64) -> Result<()> {
        self.lock_transforms()?.invalidate_sample(id);
        Ok(())
    }

    /// Drop every cached transform.
    pub fn clear_cache(&self) -> Result<()> {
        self.lock_transforms()?.clear();
        Ok(())
    }

    /// Number of cached transforms.
    pub fn cached_transforms(&self) -> Result<usize> {
        Ok(self.lock_transforms()?.len())
    }

    /// Transform cache hit/miss counters.
    pub fn cache_statistics(&self) -> Result<CacheStatistics> {
        Ok(self.lock_transforms()?.statistics())
    }

    /// Look up `key`, building on a miss. The cache lock is released while
    /// building; concurrent builders of one key each build and the last
    /// insert wins.
    fn cached<F>(&self, key: TransformKey, build: F) -> Result<Arc<Transform>>
    where
        F: FnOnce() -> Result<Transform>,
    {
        let hit = self.lock_transforms()?.lookup(&key);
        if let Some(transform) = hit {
            return Ok(transform);
        }
        let transform = Arc::new(build()?);
        self.lock_transforms()?.insert(Arc::clone(&transform));
        Ok(transform)
    }

    fn lock_transforms(&self) -> Result<MutexGuard<'_, TransformCache>> {
        self.transforms
            .lock()
            .map_err(|_| HistError::internal("transform cache lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::Dimension;
    use crate::config::EngineConfigBuilder;
    use crate::core::types::{ErrorMethod, TransformStorage};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn binning() -> MultiDimBinning {
        MultiDimBinning::one_dim(Dimension::new("x", vec![0.0, 1.0, 2.0, 3.0]).unwrap())
    }

    fn sequential() -> Engine {
        let config = EngineConfigBuilder::new()
            .backend(Backend::Sequential)
            .build()
            .unwrap();
        Engine::new(config).unwrap()
    }

    #[test]
    fn test_histogram_matches_accumulate() {
        let engine = sequential();
        let sample = Sample::from_columns(vec![("x", array![0.1, 1.1, 2.9, 3.0, -1.0])]).unwrap();
        let weights = array![0.5, 1.5, 2.0, 4.0, 9.0];
        let direct = engine.accumulate(&sample, Some(weights.view()), &binning()).unwrap();
        let cached = engine.histogram(&sample, weights.view(), &binning()).unwrap();
        for (a, b) in direct.iter().zip(cached.iter()) {
            assert_relative_eq!(a, b);
        }
        assert_eq!(direct.as_slice().unwrap(), &[0.5, 1.5, 6.0]);
    }

    #[test]
    fn test_cache_hits_and_invalidation() {
        let engine = sequential();
        let mut sample = Sample::from_columns(vec![("x", array![0.5, 1.5])]).unwrap();
        let w = array![1.0, 1.0];
        engine.histogram(&sample, w.view(), &binning()).unwrap();
        engine.histogram(&sample, w.view(), &binning()).unwrap();
        let stats = engine.cache_statistics().unwrap();
        assert_eq!((stats.hits, stats.misses), (1, 1));

        sample.set_column("x", array![2.5, 2.5]).unwrap();
        let hist = engine.histogram(&sample, w.view(), &binning()).unwrap();
        assert_eq!(hist.as_slice().unwrap(), &[0.0, 0.0, 2.0]);
        // the entry of the old generation was replaced
        assert_eq!(engine.cached_transforms().unwrap(), 1);
        assert_eq!(engine.cache_statistics().unwrap().misses, 2);
    }

    #[test]
    fn test_zero_depth_cache_still_works() {
        let config = EngineConfigBuilder::new().cache(0, true).build().unwrap();
        let engine = Engine::new(config).unwrap();
        let sample = Sample::from_columns(vec![("x", array![0.5, 1.5])]).unwrap();
        let hist = engine.histogram(&sample, array![2.0, 3.0].view(), &binning()).unwrap();
        assert_eq!(hist.as_slice().unwrap(), &[2.0, 3.0, 0.0]);
        assert_eq!(engine.cached_transforms().unwrap(), 0);
    }

    #[test]
    fn test_stale_transform_rejected() {
        let engine = sequential();
        let mut sample = Sample::from_columns(vec![("x", array![0.5, 1.5])]).unwrap();
        let transform = engine.build_transform(&sample, &binning()).unwrap();
        sample.set_column("x", array![0.5, 0.5]).unwrap();
        assert!(matches!(
            transform.apply_checked(sample.key(), &binning(), array![1.0, 1.0].view()),
            Err(HistError::StaleTransform { .. })
        ));
    }

    #[test]
    fn test_combined_transform_requires_disjoint_binnings() {
        let engine = sequential();
        let sample = Sample::from_columns(vec![("x", array![0.5])]).unwrap();
        assert!(matches!(
            engine.build_combined_transform(&sample, &binning(), &binning()),
            Err(HistError::Configuration { .. })
        ));
    }

    fn calc_and_apply() -> (MultiDimBinning, MultiDimBinning, Sample) {
        let calc = MultiDimBinning::one_dim(Dimension::new("c", vec![0.0, 1.0, 2.0]).unwrap());
        let apply = MultiDimBinning::one_dim(Dimension::new("a", vec![0.0, 1.0, 2.0]).unwrap());
        let sample = Sample::from_columns(vec![
            ("c", array![0.5, 0.5, 1.5, 1.5]),
            ("a", array![0.5, 1.5, 1.5, 1.5]),
        ])
        .unwrap();
        (calc, apply, sample)
    }

    #[test]
    fn test_one_hot_then_combined_on_same_bins() {
        let engine = sequential();
        let (calc, apply, sample) = calc_and_apply();
        let combined = calc.combine(&apply).unwrap();

        let one_hot = engine.transform(&sample, &combined).unwrap();
        assert_eq!((one_hot.rows(), one_hot.cols()), (4, 4));
        let counts = engine.combined_transform(&sample, &calc, &apply).unwrap();
        assert_eq!((counts.rows(), counts.cols()), (2, 2));
        assert!(counts.row_binning().is_some());
        let hist = counts.apply_flat(array![1.0, 10.0].view()).unwrap();
        assert_eq!(hist, array![1.0, 21.0]);
        assert_eq!(engine.cached_transforms().unwrap(), 2);
    }

    #[test]
    fn test_combined_then_one_hot_on_same_bins() {
        let engine = sequential();
        let (calc, apply, sample) = calc_and_apply();
        let combined = calc.combine(&apply).unwrap();

        engine.combined_transform(&sample, &calc, &apply).unwrap();
        let hist = engine
            .histogram(&sample, array![1.0, 2.0, 3.0, 4.0].view(), &combined)
            .unwrap();
        assert_eq!(hist.shape(), &[2, 2]);
        assert_eq!(hist.as_slice().unwrap(), &[1.0, 2.0, 0.0, 7.0]);

        // both are served from the cache afterwards
        engine.combined_transform(&sample, &calc, &apply).unwrap();
        engine.transform(&sample, &combined).unwrap();
        assert_eq!(engine.cache_statistics().unwrap().hits, 2);
    }

    #[test]
    fn test_histogrammer_uses_configured_error_method() {
        let (_, apply, _) = calc_and_apply();
        let default = sequential().histogrammer(CalcMode::Events, apply.clone()).unwrap();
        assert_eq!(default.error_method(), ErrorMethod::None);

        let config = EngineConfigBuilder::new()
            .error_method(ErrorMethod::Sumw2)
            .build()
            .unwrap();
        let engine = Engine::new(config).unwrap();
        let step = engine.histogrammer(CalcMode::Events, apply).unwrap();
        assert_eq!(step.error_method(), ErrorMethod::Sumw2);
    }

    #[test]
    fn test_sparse_engine() {
        let config = EngineConfigBuilder::new()
            .transform_storage(TransformStorage::Sparse)
            .num_threads(2)
            .build()
            .unwrap();
        let engine = Engine::new(config).unwrap();
        let sample = Sample::from_columns(vec![("x", array![0.5, 1.5, 1.7])]).unwrap();
        let transform = engine.build_transform(&sample, &binning()).unwrap();
        assert!(!transform.is_dense());
        let (hist, sumw2) = engine
            .apply_transform_with_variance(&transform, array![1.0, 2.0, 3.0].view())
            .unwrap();
        assert_eq!(hist.as_slice().unwrap(), &[1.0, 5.0, 0.0]);
        assert_eq!(sumw2.as_slice().unwrap(), &[1.0, 13.0, 0.0]);
    }
}
