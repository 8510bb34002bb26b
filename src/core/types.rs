//! Core data types shared across the binning and histogram modules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Histogram accumulation type.
/// 64-bit float; every bin value and every weight is carried at this width.
pub type Hist = f64;

/// Flat (row-major) bin index into a multi-dimensional binning.
pub type BinIndex = usize;

/// Accumulation backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Single-threaded reference implementation
    Sequential,
    /// Block/lane parallel implementation with atomic accumulation
    Parallel,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Parallel
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sequential => write!(f, "sequential"),
            Backend::Parallel => write!(f, "parallel"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "cpu" => Ok(Backend::Sequential),
            "parallel" => Ok(Backend::Parallel),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// How a built transform is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformStorage {
    /// Dense `rows x bins` matrix
    Dense,
    /// Compressed sparse rows
    Sparse,
    /// Dense while the matrix stays under the configured cell limit
    Auto,
}

impl Default for TransformStorage {
    fn default() -> Self {
        TransformStorage::Auto
    }
}

impl fmt::Display for TransformStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformStorage::Dense => write!(f, "dense"),
            TransformStorage::Sparse => write!(f, "sparse"),
            TransformStorage::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for TransformStorage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense" => Ok(TransformStorage::Dense),
            "sparse" => Ok(TransformStorage::Sparse),
            "auto" => Ok(TransformStorage::Auto),
            other => Err(format!("unknown transform storage '{}'", other)),
        }
    }
}

/// Per-bin error estimate produced alongside histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMethod {
    /// No error estimate
    None,
    /// Sum of squared weights per bin
    Sumw2,
}

impl Default for ErrorMethod {
    fn default() -> Self {
        ErrorMethod::None
    }
}

impl fmt::Display for ErrorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMethod::None => write!(f, "none"),
            ErrorMethod::Sumw2 => write!(f, "sumw2"),
        }
    }
}

impl std::str::FromStr for ErrorMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ErrorMethod::None),
            "sumw2" => Ok(ErrorMethod::Sumw2),
            other => Err(format!("unknown error method '{}'", other)),
        }
    }
}

/// How per-event values are reduced into a bin when translating an
/// attribute from events to a binned view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// Sum of values per bin
    Sum,
    /// Sum of values per bin divided by the event count in that bin
    Average,
}

impl Default for TranslationMode {
    fn default() -> Self {
        TranslationMode::Sum
    }
}
