//! Multi-dimensional binning with row-major flat indexing.

use crate::binning::dimension::Dimension;
use crate::core::error::{HistError, Result};
use crate::core::types::BinIndex;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Ordered set of dimensions with unique names.
///
/// The flat index of a bin is the row-major (last dimension fastest)
/// composition of its per-dimension indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Dimension>", into = "Vec<Dimension>")]
pub struct MultiDimBinning {
    dimensions: Vec<Dimension>,
    strides: Vec<usize>,
}

impl TryFrom<Vec<Dimension>> for MultiDimBinning {
    type Error = HistError;

    fn try_from(dimensions: Vec<Dimension>) -> Result<Self> {
        MultiDimBinning::new(dimensions)
    }
}

impl From<MultiDimBinning> for Vec<Dimension> {
    fn from(binning: MultiDimBinning) -> Self {
        binning.dimensions
    }
}

impl MultiDimBinning {
    /// Create a binning; dimension names must be unique.
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(HistError::configuration(
                "a binning needs at least one dimension",
            ));
        }
        let mut seen = HashSet::with_capacity(dimensions.len());
        for dim in &dimensions {
            if !seen.insert(dim.name()) {
                return Err(HistError::configuration(format!(
                    "dimension '{}' appears more than once in binning",
                    dim.name()
                )));
            }
        }

        let mut strides = vec![1usize; dimensions.len()];
        for d in (0..dimensions.len().saturating_sub(1)).rev() {
            strides[d] = strides[d + 1]
                .checked_mul(dimensions[d + 1].num_bins())
                .ok_or_else(|| HistError::configuration("total number of bins overflows usize"))?;
        }
        strides[0]
            .checked_mul(dimensions[0].num_bins())
            .ok_or_else(|| HistError::configuration("total number of bins overflows usize"))?;

        Ok(MultiDimBinning {
            dimensions,
            strides,
        })
    }

    /// Single-dimension binning.
    pub fn one_dim(dimension: Dimension) -> Self {
        MultiDimBinning {
            dimensions: vec![dimension],
            strides: vec![1],
        }
    }

    /// Dimensions in order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Dimension names in order.
    pub fn names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.name()).collect()
    }

    /// Look up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name() == name)
    }

    /// Number of dimensions.
    pub fn num_dims(&self) -> usize {
        self.dimensions.len()
    }

    /// Bins per dimension.
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|d| d.num_bins()).collect()
    }

    /// Product of bins over all dimensions.
    pub fn total_bins(&self) -> usize {
        self.strides[0] * self.dimensions[0].num_bins()
    }

    /// Row-major strides; `strides()[d]` is the product of bins of the
    /// dimensions after `d`.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Flat index of a per-dimension index tuple, `None` if any index is
    /// out of bounds or the tuple has the wrong arity.
    pub fn flat_index(&self, indices: &[usize]) -> Option<BinIndex> {
        if indices.len() != self.dimensions.len() {
            return None;
        }
        let mut flat = 0;
        for ((&idx, dim), &stride) in indices.iter().zip(&self.dimensions).zip(&self.strides) {
            if idx >= dim.num_bins() {
                return None;
            }
            flat += idx * stride;
        }
        Some(flat)
    }

    /// Per-dimension indices of a flat index.
    pub fn unravel(&self, flat: BinIndex) -> Option<Vec<usize>> {
        if flat >= self.total_bins() {
            return None;
        }
        let mut rest = flat;
        Some(
            self.strides
                .iter()
                .map(|&stride| {
                    let idx = rest / stride;
                    rest %= stride;
                    idx
                })
                .collect(),
        )
    }

    /// Flat bin of one event given its coordinates in dimension order.
    /// An event outside any dimension, or a coordinate tuple of the wrong
    /// arity, is out of range.
    #[inline]
    pub fn locate(&self, coords: &[f64]) -> Option<BinIndex> {
        if coords.len() != self.dimensions.len() {
            return None;
        }
        let mut flat = 0;
        for ((&x, dim), &stride) in coords.iter().zip(&self.dimensions).zip(&self.strides) {
            flat += dim.locate(x)? * stride;
        }
        Some(flat)
    }

    /// Concatenate the dimensions of `self` and `other`.
    ///
    /// Used to span a "calculation" binning and an "apply" binning with one
    /// transform; the two must not share a dimension name.
    pub fn combine(&self, other: &MultiDimBinning) -> Result<MultiDimBinning> {
        let shared: Vec<&str> = self
            .names()
            .into_iter()
            .filter(|name| other.dimension(name).is_some())
            .collect();
        if !shared.is_empty() {
            return Err(HistError::configuration(format!(
                "binnings to combine must be disjoint, shared dimensions: {}",
                shared.join(", ")
            )));
        }
        let mut dimensions = self.dimensions.clone();
        dimensions.extend(other.dimensions.iter().cloned());
        MultiDimBinning::new(dimensions)
    }

    /// Hash of names, edges and log tags; identical definitions produce
    /// identical fingerprints within a process.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for dim in &self.dimensions {
            dim.name().hash(&mut hasher);
            dim.is_log().hash(&mut hasher);
            for edge in dim.edges() {
                edge.to_bits().hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

impl From<Dimension> for MultiDimBinning {
    fn from(dimension: Dimension) -> Self {
        MultiDimBinning::one_dim(dimension)
    }
}

impl fmt::Display for MultiDimBinning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| format!("{}({})", d.name(), d.num_bins()))
            .collect();
        write!(f, "binned[{}]", parts.join(", "))
    }
}
