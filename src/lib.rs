//! # evhist
//!
//! A binning and histogram-transform engine for re-weighting large event
//! samples during iterative fits.
//!
//! ## Features
//!
//! - **Exact bin boundaries**: every bin is closed-low/open-high except the
//!   last, which also contains the upper edge of its dimension. Events
//!   outside the binning are dropped, never reported as errors.
//! - **Race-free parallel accumulation**: the parallel backend splits events
//!   into blocks of lanes over Rayon and adds every weight with an atomic
//!   compare-and-swap, so no update is lost.
//! - **Cached transforms**: the one-hot events-to-bins matrix of a sample is
//!   built once and reused, turning each re-histogramming of new weights
//!   into a single vector-matrix product. Transforms are keyed by sample
//!   state and binning and refuse to run against anything else.
//! - **Representation switching**: containers track, per attribute, whether
//!   the per-event or a binned view is current and translate lazily.
//!
//! ## Quick Start
//!
//! ```rust
//! use evhist::{Dimension, Engine, EngineConfig, MultiDimBinning, Sample};
//! use ndarray::array;
//!
//! # fn main() -> evhist::Result<()> {
//! let binning = MultiDimBinning::one_dim(Dimension::new("x", vec![0.0, 1.0, 2.0, 3.0])?);
//! let sample = Sample::from_columns(vec![("x", array![0.0, 1.0, 2.0, 3.0])])?;
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! let hist = engine.accumulate(&sample, None, &binning)?;
//! assert_eq!(hist.as_slice(), Some(&[1.0, 1.0, 2.0][..]));
//!
//! // build once, re-weight many times
//! let transform = engine.build_transform(&sample, &binning)?;
//! let reweighted = engine.apply_transform(&transform, array![0.5, 1.0, 2.0, 4.0].view())?;
//! assert_eq!(reweighted.as_slice(), Some(&[0.5, 1.0, 6.0][..]));
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Core infrastructure
pub mod core;

// Configuration management
pub mod config;

// Bin edges
pub mod binning;

// Samples, containers and representations
pub mod dataset;

// Accumulation backends and transforms
pub mod histogram;

pub mod engine;
pub mod histogrammer;

// Re-export core functionality for convenience
pub use core::{
    constants::*,
    error::{HistError, Result},
    types::*,
};

pub use binning::{locate, Dimension, MultiDimBinning};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use dataset::{Container, Representation, Sample, SampleKey};
pub use engine::Engine;
pub use histogram::{
    HistogramBackend, ParallelBackend, ParallelHistogrammer, SequentialBackend, Transform,
    TransformCache, TransformKind,
};
pub use histogrammer::{CalcMode, Histogrammer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging (`RUST_LOG`, default `info`).
///
/// Idempotent; a logger already installed by the host application wins.
///
/// ```rust
/// fn main() -> evhist::Result<()> {
///     evhist::init()?;
///     evhist::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    core::initialize_core()
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    core::is_core_initialized()
}

/// Features available in this build.
pub fn capabilities() -> core::CoreCapabilities {
    core::CoreCapabilities::current()
}
