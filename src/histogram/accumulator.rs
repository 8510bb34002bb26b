//! Weighted accumulation backends.
//!
//! [`HistogramBackend`] is the single contract callers program against;
//! [`SequentialBackend`] is the reference implementation and
//! [`ParallelBackend`] the block/lane parallel one. Both start every pass
//! from a zeroed histogram and silently drop out-of-range events.

use crate::binning::MultiDimBinning;
use crate::core::constants::{DEFAULT_BLOCK_SIZE, DEFAULT_DROPPED_WARN_FRACTION};
use crate::core::error::{HistError, Result};
use crate::core::types::{BinIndex, Hist};
use crate::dataset::Sample;
use crate::histogram::indexer::BinIndexer;
use crate::histogram::parallel::ParallelHistogrammer;
use ndarray::{Array1, ArrayD, ArrayView1, IxDyn};
use rayon::ThreadPool;
use std::fmt::Debug;
use std::sync::Arc;

/// Reshape a flat histogram to the binning's per-dimension shape.
pub fn reshape(flat: Array1<Hist>, binning: &MultiDimBinning) -> Result<ArrayD<Hist>> {
    flat.into_shape_with_order(IxDyn(&binning.shape()))
        .map_err(|e| HistError::internal(format!("histogram reshape failed: {}", e)))
}

/// Accumulation backend.
pub trait HistogramBackend: Send + Sync + Debug {
    /// Short backend name for logging.
    fn name(&self) -> &'static str;

    /// Flat bin index per event, `OUT_OF_RANGE` for dropped events.
    fn bin_indices(&self, sample: &Sample, binning: &MultiDimBinning) -> Result<Vec<BinIndex>>;

    /// Flat histogram of `weights` (unit weights when `None`).
    fn accumulate_flat(
        &self,
        sample: &Sample,
        weights: Option<ArrayView1<'_, f64>>,
        binning: &MultiDimBinning,
    ) -> Result<Array1<Hist>>;

    /// Histogram shaped per `binning`.
    fn accumulate(
        &self,
        sample: &Sample,
        weights: Option<ArrayView1<'_, f64>>,
        binning: &MultiDimBinning,
    ) -> Result<ArrayD<Hist>> {
        reshape(self.accumulate_flat(sample, weights, binning)?, binning)
    }

    /// Histogram of `weights` and of `weights²` (sumw2).
    fn accumulate_with_variance(
        &self,
        sample: &Sample,
        weights: ArrayView1<'_, f64>,
        binning: &MultiDimBinning,
    ) -> Result<(ArrayD<Hist>, ArrayD<Hist>)> {
        let hist = self.accumulate(sample, Some(weights.view()), binning)?;
        let squared = weights.mapv(|w| w * w);
        let sumw2 = self.accumulate(sample, Some(squared.view()), binning)?;
        Ok((hist, sumw2))
    }

    /// Unweighted event count per flat bin.
    fn count_flat(&self, sample: &Sample, binning: &MultiDimBinning) -> Result<Array1<Hist>> {
        self.accumulate_flat(sample, None, binning)
    }
}

fn report_dropped(backend: &str, n_events: usize, in_range: usize, warn_fraction: f64) {
    let dropped = n_events - in_range;
    if n_events > 0 && dropped as f64 / n_events as f64 > warn_fraction {
        log::warn!(
            "{} backend dropped {} of {} events outside the binning",
            backend,
            dropped,
            n_events
        );
    } else {
        log::trace!("{} backend: {} of {} events in range", backend, in_range, n_events);
    }
}

/// Single-threaded reference accumulator.
#[derive(Debug, Clone)]
pub struct SequentialBackend {
    dropped_warn_fraction: f64,
}

impl SequentialBackend {
    /// Create a sequential backend.
    pub fn new() -> Self {
        SequentialBackend {
            dropped_warn_fraction: DEFAULT_DROPPED_WARN_FRACTION,
        }
    }

    /// Fraction of dropped events above which a warning is logged.
    pub fn with_dropped_warn_fraction(mut self, fraction: f64) -> Self {
        self.dropped_warn_fraction = fraction;
        self
    }
}

impl Default for SequentialBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramBackend for SequentialBackend {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn bin_indices(&self, sample: &Sample, binning: &MultiDimBinning) -> Result<Vec<BinIndex>> {
        Ok(BinIndexer::new(sample, binning)?.indices())
    }

    fn accumulate_flat(
        &self,
        sample: &Sample,
        weights: Option<ArrayView1<'_, f64>>,
        binning: &MultiDimBinning,
    ) -> Result<Array1<Hist>> {
        if let Some(w) = &weights {
            sample.check_weights(w)?;
        }
        let indexer = BinIndexer::new(sample, binning)?;
        let mut hist = Array1::<Hist>::zeros(binning.total_bins());
        let mut in_range = 0;
        for event in 0..indexer.n_events() {
            if let Some(bin) = indexer.bin_of(event) {
                hist[bin] += weights.as_ref().map_or(1.0, |w| w[event]);
                in_range += 1;
            }
        }
        report_dropped(self.name(), indexer.n_events(), in_range, self.dropped_warn_fraction);
        Ok(hist)
    }
}

/// Parallel accumulator: one [`ParallelHistogrammer`] pass per call.
#[derive(Debug, Clone)]
pub struct ParallelBackend {
    block_size: usize,
    pool: Option<Arc<ThreadPool>>,
    dropped_warn_fraction: f64,
}

impl ParallelBackend {
    /// Parallel backend on the global rayon pool.
    pub fn new(block_size: usize) -> Result<Self> {
        crate::ensure!(
            block_size > 0,
            HistError::invalid_parameter("block_size", "0", "must be at least 1")
        );
        Ok(ParallelBackend {
            block_size,
            pool: None,
            dropped_warn_fraction: DEFAULT_DROPPED_WARN_FRACTION,
        })
    }

    /// Parallel backend on a dedicated pool of `num_threads` threads.
    pub fn with_threads(block_size: usize, num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("evhist-worker-{}", i))
            .build()
            .map_err(|e| HistError::internal(format!("failed to build thread pool: {}", e)))?;
        let mut backend = Self::new(block_size)?;
        backend.pool = Some(Arc::new(pool));
        Ok(backend)
    }

    /// Fraction of dropped events above which a warning is logged.
    pub fn with_dropped_warn_fraction(mut self, fraction: f64) -> Self {
        self.dropped_warn_fraction = fraction;
        self
    }

    /// Lanes per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl Default for ParallelBackend {
    fn default() -> Self {
        ParallelBackend {
            block_size: DEFAULT_BLOCK_SIZE,
            pool: None,
            dropped_warn_fraction: DEFAULT_DROPPED_WARN_FRACTION,
        }
    }
}

impl HistogramBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn bin_indices(&self, sample: &Sample, binning: &MultiDimBinning) -> Result<Vec<BinIndex>> {
        let indexer = BinIndexer::new(sample, binning)?;
        Ok(match &self.pool {
            Some(pool) => pool.install(|| indexer.par_indices()),
            None => indexer.par_indices(),
        })
    }

    fn accumulate_flat(
        &self,
        sample: &Sample,
        weights: Option<ArrayView1<'_, f64>>,
        binning: &MultiDimBinning,
    ) -> Result<Array1<Hist>> {
        let mut histogrammer = ParallelHistogrammer::new(binning, self.block_size)?;
        if let Some(pool) = &self.pool {
            histogrammer = histogrammer.with_pool(Arc::clone(pool));
        }
        let hist = histogrammer.get_hist_flat(sample, weights)?;
        report_dropped(
            self.name(),
            sample.n_events(),
            histogrammer.last_in_range(),
            self.dropped_warn_fraction,
        );
        Ok(hist)
    }
}
