//! Engine constants and configuration defaults.

use crate::core::types::BinIndex;

/// Sentinel stored in bin-index arrays for events outside the binning.
pub const OUT_OF_RANGE: BinIndex = BinIndex::MAX;

/// Lanes per block in the parallel accumulator.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Default number of threads for parallel processing.
/// 0 means use all available cores.
pub const DEFAULT_NUM_THREADS: usize = 0;

/// Largest dense transform (rows x bins cells) `TransformStorage::Auto`
/// still materializes densely.
pub const DEFAULT_DENSE_TRANSFORM_LIMIT: usize = 1 << 22;

/// Default number of transforms kept by a `TransformCache`.
pub const DEFAULT_CACHE_DEPTH: usize = 16;

/// Fraction of dropped (out-of-range) events above which accumulation
/// logs a warning.
pub const DEFAULT_DROPPED_WARN_FRACTION: f64 = 0.5;

/// Attribute name holding per-event weights in a container.
pub const WEIGHTS_KEY: &str = "weights";

/// Attribute name holding per-bin errors in a container.
pub const ERRORS_KEY: &str = "errors";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "EVHIST_";
