//! Histogram accumulation and cached transforms.
//!
//! - [`indexer`]: per-event flat bin indices
//! - [`atomic`]: lock-free `f64` buffer used by the parallel path
//! - [`parallel`]: block/lane parallel histogrammer with a resident buffer
//! - [`accumulator`]: the [`HistogramBackend`] contract and its two variants
//! - [`transform`]: one-hot events-to-bins matrices for fast re-weighting
//! - [`cache`]: bounded cache of built transforms

pub mod accumulator;
pub mod atomic;
pub mod cache;
pub mod indexer;
pub mod parallel;
pub mod transform;

pub use accumulator::{reshape, HistogramBackend, ParallelBackend, SequentialBackend};
pub use atomic::AtomicHistogram;
pub use cache::{CacheStatistics, MemoryCache, TransformCache, TransformKey};
pub use indexer::BinIndexer;
pub use parallel::ParallelHistogrammer;
pub use transform::{Transform, TransformKind, TransformMatrix};
