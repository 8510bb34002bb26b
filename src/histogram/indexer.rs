//! Per-event flat bin index computation.

use crate::binning::MultiDimBinning;
use crate::core::constants::OUT_OF_RANGE;
use crate::core::error::Result;
use crate::core::types::BinIndex;
use crate::dataset::Sample;
use ndarray::ArrayView1;
use rayon::prelude::*;

/// Maps events of one sample onto the flat bins of one binning.
///
/// Cost is O(log num_bins) per dimension per event.
#[derive(Debug)]
pub struct BinIndexer<'a> {
    binning: &'a MultiDimBinning,
    columns: Vec<ArrayView1<'a, f64>>,
    n_events: usize,
}

impl<'a> BinIndexer<'a> {
    /// Bind the sample columns named by `binning`'s dimensions.
    pub fn new(sample: &'a Sample, binning: &'a MultiDimBinning) -> Result<Self> {
        let columns = sample.coordinates(binning)?;
        Ok(BinIndexer {
            binning,
            columns,
            n_events: sample.n_events(),
        })
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Binning the indices refer to.
    pub fn binning(&self) -> &MultiDimBinning {
        self.binning
    }

    /// Flat bin of event `event`, `None` if it is outside any dimension.
    #[inline]
    pub fn bin_of(&self, event: usize) -> Option<BinIndex> {
        let mut flat = 0;
        for ((column, dim), &stride) in self
            .columns
            .iter()
            .zip(self.binning.dimensions())
            .zip(self.binning.strides())
        {
            flat += dim.locate(column[event])? * stride;
        }
        Some(flat)
    }

    /// Flat bins of all events, [`OUT_OF_RANGE`] for dropped events.
    pub fn indices(&self) -> Vec<BinIndex> {
        (0..self.n_events)
            .map(|e| self.bin_of(e).unwrap_or(OUT_OF_RANGE))
            .collect()
    }

    /// [`BinIndexer::indices`] computed with rayon.
    pub fn par_indices(&self) -> Vec<BinIndex> {
        (0..self.n_events)
            .into_par_iter()
            .map(|e| self.bin_of(e).unwrap_or(OUT_OF_RANGE))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::Dimension;
    use ndarray::array;

    #[test]
    fn test_indices_one_dim() {
        let sample = Sample::from_columns(vec![("x", array![0.0, 1.0, 2.0, 3.0, -0.5])]).unwrap();
        let binning = MultiDimBinning::one_dim(Dimension::new("x", vec![0.0, 1.0, 2.0, 3.0]).unwrap());
        let indexer = BinIndexer::new(&sample, &binning).unwrap();
        assert_eq!(indexer.indices(), vec![0, 1, 2, 2, OUT_OF_RANGE]);
        assert_eq!(indexer.par_indices(), indexer.indices());
    }

    #[test]
    fn test_indices_two_dim_any_dimension_drops() {
        let sample = Sample::from_columns(vec![
            ("x", array![2.0, 0.5, 0.5]),
            ("y", array![2.0, 1.5, 5.0]),
        ])
        .unwrap();
        let binning = MultiDimBinning::new(vec![
            Dimension::new("x", vec![0.0, 1.0, 2.0]).unwrap(),
            Dimension::new("y", vec![0.0, 1.0, 2.0]).unwrap(),
        ])
        .unwrap();
        let indexer = BinIndexer::new(&sample, &binning).unwrap();
        assert_eq!(indexer.bin_of(0), binning.flat_index(&[1, 1]));
        assert_eq!(indexer.bin_of(1), Some(1));
        assert_eq!(indexer.bin_of(2), None);
    }
}
