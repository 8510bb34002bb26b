//! Lock-free `f64` histogram buffer.

use crate::core::types::Hist;
use ndarray::Array1;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dense histogram whose bins can be incremented concurrently.
///
/// Each bin holds the bit pattern of an `f64`; [`AtomicHistogram::add`] is
/// a compare-and-swap loop, so concurrent additions to one bin never lose
/// an update.
#[derive(Debug)]
pub struct AtomicHistogram {
    bins: Vec<AtomicU64>,
}

impl AtomicHistogram {
    /// Zeroed buffer of `len` bins.
    pub fn new(len: usize) -> Self {
        AtomicHistogram {
            bins: (0..len).map(|_| AtomicU64::new(0.0_f64.to_bits())).collect(),
        }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the buffer has no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Reset every bin to zero.
    pub fn clear(&self) {
        for bin in &self.bins {
            bin.store(0.0_f64.to_bits(), Ordering::Relaxed);
        }
    }

    /// Atomically add `value` to bin `bin`.
    #[inline]
    pub fn add(&self, bin: usize, value: Hist) {
        // the closure always returns Some, so fetch_update cannot fail
        let _ = self.bins[bin].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + value).to_bits())
        });
    }

    /// Current value of one bin.
    pub fn load(&self, bin: usize) -> Hist {
        f64::from_bits(self.bins[bin].load(Ordering::Acquire))
    }

    /// Copy the buffer out.
    pub fn to_array(&self) -> Array1<Hist> {
        self.bins
            .iter()
            .map(|bin| f64::from_bits(bin.load(Ordering::Acquire)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_add_and_clear() {
        let hist = AtomicHistogram::new(3);
        hist.add(1, 2.5);
        hist.add(1, 0.5);
        assert_eq!(hist.load(1), 3.0);
        assert_eq!(hist.to_array().to_vec(), vec![0.0, 3.0, 0.0]);
        hist.clear();
        assert_eq!(hist.to_array().sum(), 0.0);
    }

    #[test]
    fn test_concurrent_adds_not_lost() {
        let hist = AtomicHistogram::new(2);
        (0..100_000).into_par_iter().for_each(|i| hist.add(i % 2, 1.0));
        assert_eq!(hist.load(0), 50_000.0);
        assert_eq!(hist.load(1), 50_000.0);
    }
}
