//! Engine configuration.
//!
//! [`EngineConfig`] selects the accumulation backend, the transform storage
//! and cache policy, and the error estimate. It can be built fluently with
//! [`EngineConfigBuilder`], read from `.json`/`.toml` files and overridden
//! by `EVHIST_*` environment variables.

pub mod core;

pub use self::core::{EngineConfig, EngineConfigBuilder};

/// Default engine configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "evhist.toml";
