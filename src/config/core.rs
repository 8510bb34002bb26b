//! Engine configuration structure, builder and file/environment loading.

use crate::core::constants::*;
use crate::core::error::{HistError, Result};
use crate::core::types::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of an [`crate::Engine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Accumulation backend
    pub backend: Backend,
    /// Worker threads of the parallel backend (0 = global pool, all cores)
    pub num_threads: usize,
    /// Lanes per block of the parallel backend
    pub block_size: usize,
    /// Storage of built transforms
    pub transform_storage: TransformStorage,
    /// Largest dense transform (cells) `TransformStorage::Auto` keeps dense
    pub dense_transform_limit: usize,
    /// Error estimate of histogramming steps made by `Engine::histogrammer`
    pub error_method: ErrorMethod,
    /// Number of cached transforms (0 disables caching)
    pub cache_depth: usize,
    /// Evict least recently used transforms instead of oldest
    pub cache_lru: bool,
    /// Dropped-event fraction above which accumulation warns
    pub dropped_warn_fraction: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            backend: Backend::default(),
            num_threads: DEFAULT_NUM_THREADS,
            block_size: DEFAULT_BLOCK_SIZE,
            transform_storage: TransformStorage::default(),
            dense_transform_limit: DEFAULT_DENSE_TRANSFORM_LIMIT,
            error_method: ErrorMethod::default(),
            cache_depth: DEFAULT_CACHE_DEPTH,
            cache_lru: true,
            dropped_warn_fraction: DEFAULT_DROPPED_WARN_FRACTION,
        }
    }
}

fn env_key(name: &str) -> String {
    format!("{}{}", ENV_PREFIX, name)
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HistError::configuration(format!("Invalid {}: '{}'", env_key(name), value)))
}

impl EngineConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(HistError::invalid_parameter(
                "block_size",
                self.block_size.to_string(),
                "must be at least 1",
            ));
        }

        if !(0.0..=1.0).contains(&self.dropped_warn_fraction) {
            return Err(HistError::invalid_parameter(
                "dropped_warn_fraction",
                self.dropped_warn_fraction.to_string(),
                "must be in range [0.0, 1.0]",
            ));
        }

        if self.backend == Backend::Sequential && self.num_threads > 1 {
            log::warn!(
                "num_threads = {} has no effect with the sequential backend",
                self.num_threads
            );
        }

        Ok(())
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: EngineConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(HistError::configuration(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        log::debug!("loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self).map_err(|e| {
                HistError::configuration(format!("Failed to serialize to TOML: {}", e))
            })?,
            _ => {
                return Err(HistError::configuration(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overridden by the `EVHIST_*` environment variables
    pub fn load_from_environment() -> Result<Self> {
        let mut config = EngineConfig::default();
        config.apply_environment_overrides()?;
        Ok(config)
    }

    /// Override fields named by `EVHIST_*` environment variables
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(env_key(name)).ok())
    }

    /// Override fields from a lookup of unprefixed variable names
    /// (`BACKEND`, `NUM_THREADS`, `BLOCK_SIZE`, `TRANSFORM_STORAGE`,
    /// `ERROR_METHOD`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("BACKEND") {
            self.backend = parse_env("BACKEND", &val)?;
        }
        if let Some(val) = lookup("NUM_THREADS") {
            self.num_threads = parse_env("NUM_THREADS", &val)?;
        }
        if let Some(val) = lookup("BLOCK_SIZE") {
            self.block_size = parse_env("BLOCK_SIZE", &val)?;
        }
        if let Some(val) = lookup("TRANSFORM_STORAGE") {
            self.transform_storage = parse_env("TRANSFORM_STORAGE", &val)?;
        }
        if let Some(val) = lookup("ERROR_METHOD") {
            self.error_method = parse_env("ERROR_METHOD", &val)?;
        }

        self.validate()
    }

    /// Get the effective number of threads (0 means use all available cores)
    pub fn effective_num_threads(&self) -> usize {
        match (self.backend, self.num_threads) {
            (Backend::Sequential, _) => 1,
            (Backend::Parallel, 0) => num_cpus::get(),
            (Backend::Parallel, n) => n,
        }
    }
}

/// Configuration builder for fluent configuration creation
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
    validation_errors: Vec<String>,
}

impl EngineConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        EngineConfigBuilder {
            config: EngineConfig::default(),
            validation_errors: Vec::new(),
        }
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Set the lanes per parallel block
    pub fn block_size(mut self, block_size: usize) -> Self {
        if block_size == 0 {
            self.validation_errors
                .push("block_size must be at least 1".to_string());
        }
        self.config.block_size = block_size;
        self
    }

    pub fn transform_storage(mut self, storage: TransformStorage) -> Self {
        self.config.transform_storage = storage;
        self
    }

    pub fn dense_transform_limit(mut self, cells: usize) -> Self {
        self.config.dense_transform_limit = cells;
        self
    }

    pub fn error_method(mut self, method: ErrorMethod) -> Self {
        self.config.error_method = method;
        self
    }

    /// Set the transform cache depth and eviction policy
    pub fn cache(mut self, depth: usize, lru: bool) -> Self {
        self.config.cache_depth = depth;
        self.config.cache_lru = lru;
        self
    }

    /// Set the dropped-event warning threshold
    pub fn dropped_warn_fraction(mut self, fraction: f64) -> Self {
        if !(0.0..=1.0).contains(&fraction) {
            self.validation_errors
                .push("dropped_warn_fraction must be in range [0.0, 1.0]".to_string());
        }
        self.config.dropped_warn_fraction = fraction;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        if !self.validation_errors.is_empty() {
            return Err(HistError::configuration(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
