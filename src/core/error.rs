//! Error handling and error types for evhist.
//!
//! Setup-time problems (bad edges, duplicate dimension names, mismatched
//! array lengths, stale transforms) are fatal and surface as [`HistError`].
//! Events falling outside the binning are not errors: they are dropped from
//! the histogram.

use std::io;
use thiserror::Error;

/// Main error type for the evhist engine.
#[derive(Error, Debug)]
pub enum HistError {
    /// Non-increasing edges, duplicate dimension names, overlapping
    /// calc/apply binnings and other invalid definitions
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Sample, weight or transform sizes disagree
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A transform was applied against a sample or binning other than the
    /// one it was built from
    #[error("Stale transform: {message}")]
    StaleTransform { message: String },

    /// Binned data cannot be turned back into per-event data
    #[error("Unsupported representation transition for '{attribute}': {from} -> {to}")]
    UnsupportedRepresentationTransition {
        attribute: String,
        from: String,
        to: String,
    },

    /// Attribute or dimension not present in a container or sample
    #[error("Missing attribute: {name}")]
    MissingAttribute { name: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// File I/O errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// TOML parsing errors
    #[error("TOML error: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using HistError
pub type Result<T> = std::result::Result<T, HistError>;

impl HistError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        HistError::Configuration {
            message: message.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch<S: Into<String>>(context: S, expected: usize, actual: usize) -> Self {
        HistError::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a stale transform error
    pub fn stale_transform<S: Into<String>>(message: S) -> Self {
        HistError::StaleTransform {
            message: message.into(),
        }
    }

    /// Create an unsupported representation transition error
    pub fn unsupported_transition<A, F, T>(attribute: A, from: F, to: T) -> Self
    where
        A: Into<String>,
        F: ToString,
        T: ToString,
    {
        HistError::UnsupportedRepresentationTransition {
            attribute: attribute.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a missing attribute error
    pub fn missing_attribute<S: Into<String>>(name: S) -> Self {
        HistError::MissingAttribute { name: name.into() }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        HistError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        HistError::Internal {
            message: message.into(),
        }
    }

    /// Whether the caller can reasonably retry with different inputs
    /// without rebuilding the binning or the sample.
    pub fn is_recoverable(&self) -> bool {
        match self {
            HistError::Configuration { .. } => false,
            HistError::ShapeMismatch { .. } => true,
            HistError::StaleTransform { .. } => false,
            HistError::UnsupportedRepresentationTransition { .. } => false,
            HistError::MissingAttribute { .. } => true,
            HistError::InvalidParameter { .. } => false,
            HistError::Io { .. } => false,
            HistError::Json { .. } => false,
            HistError::Toml { .. } => false,
            HistError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            HistError::Configuration { .. } => "configuration",
            HistError::ShapeMismatch { .. } => "shape_mismatch",
            HistError::StaleTransform { .. } => "stale_transform",
            HistError::UnsupportedRepresentationTransition { .. } => {
                "unsupported_representation_transition"
            }
            HistError::MissingAttribute { .. } => "missing_attribute",
            HistError::InvalidParameter { .. } => "invalid_parameter",
            HistError::Io { .. } => "io",
            HistError::Json { .. } => "json",
            HistError::Toml { .. } => "toml",
            HistError::Internal { .. } => "internal",
        }
    }
}

/// Convenience macro for configuration errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::HistError::configuration($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::HistError::configuration(format!($fmt, $($arg)*))
    };
}

/// Return early with the given error when the condition does not hold
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
