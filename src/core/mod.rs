//! Core infrastructure module for evhist.
//!
//! This module provides the foundational pieces shared by the binning,
//! histogram and representation modules:
//!
//! - [`types`]: Fundamental data types and enumerations
//! - [`constants`]: Sentinels and configuration defaults
//! - [`error`]: Error handling and error types
//!
//! ```rust
//! use evhist::core::{
//!     constants::OUT_OF_RANGE,
//!     error::{HistError, Result},
//!     types::{Backend, Hist},
//! };
//!
//! let backend = Backend::Sequential;
//! let zero: Hist = 0.0;
//! assert_eq!(OUT_OF_RANGE, usize::MAX);
//! # let _ = (backend, zero);
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::{HistError, Result};
pub use types::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

/// Version information for the core module
pub const CORE_MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Features available in this build of the engine.
#[derive(Debug, Clone)]
pub struct CoreCapabilities {
    /// Number of worker threads rayon will use by default
    pub available_threads: usize,
    /// Atomic float accumulation in the parallel backend
    pub atomic_accumulation: bool,
    /// CSR storage for transforms
    pub sparse_transforms: bool,
}

impl Default for CoreCapabilities {
    fn default() -> Self {
        CoreCapabilities {
            available_threads: num_cpus::get(),
            atomic_accumulation: true,
            sparse_transforms: true,
        }
    }
}

impl CoreCapabilities {
    /// Get current core capabilities
    pub fn current() -> Self {
        Self::default()
    }

    /// Get a summary of available capabilities
    pub fn summary(&self) -> String {
        let mut features = vec![format!("{} threads", self.available_threads)];
        if self.atomic_accumulation {
            features.push("atomic accumulation".to_string());
        }
        if self.sparse_transforms {
            features.push("sparse transforms".to_string());
        }
        format!("Core capabilities: {}", features.join(", "))
    }
}

static CORE_INIT: Once = Once::new();
static CORE_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize logging. Safe to call any number of times.
pub fn initialize_core() -> Result<()> {
    CORE_INIT.call_once(|| {
        // env_logger may already be installed by the host application
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .try_init();
        CORE_INITIALIZED.store(true, Ordering::SeqCst);
        log::debug!("{}", CoreCapabilities::current().summary());
    });
    Ok(())
}

/// Check if the core module is initialized
pub fn is_core_initialized() -> bool {
    CORE_INITIALIZED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_capabilities() {
        let caps = CoreCapabilities::current();
        assert!(caps.available_threads >= 1);
        assert!(caps.atomic_accumulation);
        assert!(caps.summary().contains("Core capabilities"));
    }

    #[test]
    fn test_global_initialization() {
        assert!(initialize_core().is_ok());
        assert!(initialize_core().is_ok());
        assert!(is_core_initialized());
    }

    #[test]
    fn test_version_constants() {
        assert!(!CORE_MODULE_VERSION.is_empty());
    }
}
