//! Per-event coordinate columns with an identity used for cache
//! invalidation.

use crate::binning::MultiDimBinning;
use crate::core::error::{HistError, Result};
use ndarray::{Array1, ArrayView1};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SAMPLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a sample's coordinates at one point in time.
///
/// Two keys compare equal only if they refer to the same sample object with
/// no coordinate mutation in between. Transforms record the key they were
/// built from and refuse to run against any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleKey {
    /// Process-unique sample id
    pub id: u64,
    /// Bumped on every coordinate mutation
    pub generation: u64,
}

/// Named coordinate columns, all of length `n_events`.
#[derive(Debug)]
pub struct Sample {
    id: u64,
    generation: u64,
    n_events: usize,
    columns: HashMap<String, Array1<f64>>,
}

impl Sample {
    /// Empty sample of `n_events` events.
    pub fn new(n_events: usize) -> Self {
        Sample {
            id: NEXT_SAMPLE_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            n_events,
            columns: HashMap::new(),
        }
    }

    /// Build a sample from `(name, values)` pairs of equal length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Array1<f64>)>,
        S: Into<String>,
    {
        let mut iter = columns.into_iter().peekable();
        let n_events = iter.peek().map(|(_, values)| values.len()).unwrap_or(0);
        let mut sample = Sample::new(n_events);
        for (name, values) in iter {
            sample.set_column(name, values)?;
        }
        Ok(sample)
    }

    /// Builder-style [`Sample::set_column`].
    pub fn with_column<S: Into<String>>(mut self, name: S, values: Array1<f64>) -> Result<Self> {
        self.set_column(name, values)?;
        Ok(self)
    }

    /// Insert or replace a coordinate column. Invalidates every transform
    /// built from this sample.
    pub fn set_column<S: Into<String>>(&mut self, name: S, values: Array1<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.n_events {
            return Err(HistError::shape_mismatch(
                format!("sample column '{}'", name),
                self.n_events,
                values.len(),
            ));
        }
        self.columns.insert(name, values);
        self.generation += 1;
        Ok(())
    }

    /// Remove a coordinate column.
    pub fn remove_column(&mut self, name: &str) -> Option<Array1<f64>> {
        let removed = self.columns.remove(name);
        if removed.is_some() {
            self.generation += 1;
        }
        removed
    }

    /// View of one column.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.columns.get(name).map(|c| c.view())
    }

    /// Whether the sample has a column of that name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names, sorted.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Current identity.
    pub fn key(&self) -> SampleKey {
        SampleKey {
            id: self.id,
            generation: self.generation,
        }
    }

    /// Columns for each dimension of `binning`, in dimension order.
    pub fn coordinates(&self, binning: &MultiDimBinning) -> Result<Vec<ArrayView1<'_, f64>>> {
        binning
            .dimensions()
            .iter()
            .map(|dim| {
                self.column(dim.name())
                    .ok_or_else(|| HistError::missing_attribute(dim.name()))
            })
            .collect()
    }

    /// Check that a weight vector matches the number of events.
    pub fn check_weights(&self, weights: &ArrayView1<'_, f64>) -> Result<()> {
        if weights.len() != self.n_events {
            return Err(HistError::shape_mismatch(
                "weights",
                self.n_events,
                weights.len(),
            ));
        }
        Ok(())
    }
}

impl Clone for Sample {
    /// A clone is a new sample: it gets its own id so that mutating it
    /// never aliases the original's transforms.
    fn clone(&self) -> Self {
        Sample {
            id: NEXT_SAMPLE_ID.fetch_add(1, Ordering::Relaxed),
            generation: self.generation,
            n_events: self.n_events,
            columns: self.columns.clone(),
        }
    }
}
