//! Block/lane parallel histogramming with a resident atomic buffer.
//!
//! Events are split into a grid of `ceil(n_events / block_size)` blocks;
//! each lane of a block handles exactly one event and adds its weight into
//! the shared buffer with an atomic fetch-add. The buffer and the edge
//! arrays are owned by the histogrammer and reused across calls.

use crate::binning::{locate, MultiDimBinning};
use crate::core::error::{HistError, Result};
use crate::core::types::Hist;
use crate::dataset::Sample;
use crate::histogram::atomic::AtomicHistogram;
use ndarray::{Array1, ArrayD, ArrayView1, IxDyn};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Resident histogram buffer for one binning.
#[derive(Debug)]
pub struct ParallelHistogrammer {
    binning: MultiDimBinning,
    /// all dimensions' edges back to back
    edges: Vec<f64>,
    /// start of each dimension's edges in `edges`
    offsets: Vec<usize>,
    hist: AtomicHistogram,
    block_size: usize,
    pool: Option<Arc<ThreadPool>>,
    last_in_range: usize,
}

impl ParallelHistogrammer {
    /// Allocate the buffer and copy the edges of `binning`.
    pub fn new(binning: &MultiDimBinning, block_size: usize) -> Result<Self> {
        crate::ensure!(
            block_size > 0,
            HistError::invalid_parameter("block_size", "0", "must be at least 1")
        );
        let mut edges = Vec::new();
        let mut offsets = Vec::with_capacity(binning.num_dims());
        for dim in binning.dimensions() {
            offsets.push(edges.len());
            edges.extend_from_slice(dim.edges());
        }
        Ok(ParallelHistogrammer {
            binning: binning.clone(),
            edges,
            offsets,
            hist: AtomicHistogram::new(binning.total_bins()),
            block_size,
            pool: None,
            last_in_range: 0,
        })
    }

    /// Run blocks on a dedicated thread pool instead of the global one.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Binning the buffer is shaped for.
    pub fn binning(&self) -> &MultiDimBinning {
        &self.binning
    }

    /// Lanes per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks launched for `n_events` events.
    pub fn grid_size(&self, n_events: usize) -> usize {
        n_events.div_ceil(self.block_size)
    }

    /// Number of events that landed in range during the last pass.
    pub fn last_in_range(&self) -> usize {
        self.last_in_range
    }

    /// Zero the resident buffer.
    pub fn clear(&self) {
        self.hist.clear();
    }

    /// Histogram `sample` (unit weights when `weights` is `None`), shaped
    /// per the binning. The buffer is cleared first.
    pub fn get_hist(
        &mut self,
        sample: &Sample,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<ArrayD<Hist>> {
        let flat = self.get_hist_flat(sample, weights)?;
        flat.into_shape_with_order(IxDyn(&self.binning.shape()))
            .map_err(|e| HistError::internal(format!("histogram reshape failed: {}", e)))
    }

    /// [`ParallelHistogrammer::get_hist`] without the reshape.
    pub fn get_hist_flat(
        &mut self,
        sample: &Sample,
        weights: Option<ArrayView1<'_, f64>>,
    ) -> Result<Array1<Hist>> {
        if let Some(w) = &weights {
            sample.check_weights(w)?;
        }
        let columns = sample.coordinates(&self.binning)?;
        let n_events = sample.n_events();

        self.clear();
        let in_range = AtomicUsize::new(0);
        let launch = || {
            (0..self.grid_size(n_events)).into_par_iter().for_each(|block| {
                let start = block * self.block_size;
                let end = (start + self.block_size).min(n_events);
                let mut block_in_range = 0;
                for event in start..end {
                    if let Some(bin) = self.bin_of(&columns, event) {
                        let w = weights.as_ref().map_or(1.0, |w| w[event]);
                        self.hist.add(bin, w);
                        block_in_range += 1;
                    }
                }
                in_range.fetch_add(block_in_range, Ordering::Relaxed);
            })
        };
        match &self.pool {
            Some(pool) => pool.install(launch),
            None => launch(),
        }

        self.last_in_range = in_range.into_inner();
        Ok(self.hist.to_array())
    }

    #[inline]
    fn bin_of(&self, columns: &[ArrayView1<'_, f64>], event: usize) -> Option<usize> {
        let mut flat = 0;
        for (d, (dim, &stride)) in self
            .binning
            .dimensions()
            .iter()
            .zip(self.binning.strides())
            .enumerate()
        {
            let start = self.offsets[d];
            let edges = &self.edges[start..start + dim.num_bins() + 1];
            flat += locate(columns[d][event], edges)? * stride;
        }
        Some(flat)
    }
}
