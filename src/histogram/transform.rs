//! Cached events-to-bins transforms.
//!
//! A [`Transform`] is a `rows x bins` matrix built once for a fixed sample
//! and binning. For a plain transform each row is one event and holds a
//! single 1 in the column of its bin (nothing for dropped events), so that
//! re-histogramming a new weight vector is the product `weights · T`. A
//! combined transform instead has one row per bin of a "calculation"
//! binning holding the event counts per (calc bin, apply bin).

use crate::binning::MultiDimBinning;
use crate::core::constants::OUT_OF_RANGE;
use crate::core::error::{HistError, Result};
use crate::core::types::{BinIndex, Hist, TransformStorage};
use crate::dataset::SampleKey;
use crate::histogram::accumulator::reshape;
use crate::histogram::cache::TransformKey;
use ndarray::{Array1, Array2, ArrayD, ArrayView1};
use sprs::CsMat;

/// Matrix backing a transform.
#[derive(Debug, Clone)]
pub enum TransformMatrix {
    /// Dense `rows x bins`
    Dense(Array2<f64>),
    /// CSR `rows x bins`
    Sparse(CsMat<f64>),
}

impl TransformMatrix {
    fn rows(&self) -> usize {
        match self {
            TransformMatrix::Dense(m) => m.nrows(),
            TransformMatrix::Sparse(m) => m.rows(),
        }
    }

    fn cols(&self) -> usize {
        match self {
            TransformMatrix::Dense(m) => m.ncols(),
            TransformMatrix::Sparse(m) => m.cols(),
        }
    }

    /// `weights · M`
    fn contract(&self, weights: &ArrayView1<'_, f64>) -> Array1<Hist> {
        match self {
            TransformMatrix::Dense(m) => weights.dot(m),
            TransformMatrix::Sparse(m) => {
                let mut out = Array1::<Hist>::zeros(m.cols());
                for (row, vec) in m.outer_iterator().enumerate() {
                    let w = weights[row];
                    for (col, &value) in vec.iter() {
                        out[col] += w * value;
                    }
                }
                out
            }
        }
    }
}

/// What a transform maps, by binning fingerprint.
///
/// A one-hot transform over `calc.combine(apply)` and the combined
/// transform of `calc` and `apply` span the same bins but are different
/// matrices, so the kind is part of every cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    /// Events to the bins of one binning
    OneHot { binning: u64 },
    /// Calc bins to apply bins
    Combined { calc: u64, apply: u64 },
}

impl TransformKind {
    pub fn one_hot(binning: &MultiDimBinning) -> Self {
        TransformKind::OneHot {
            binning: binning.fingerprint(),
        }
    }

    pub fn combined(calc: &MultiDimBinning, apply: &MultiDimBinning) -> Self {
        TransformKind::Combined {
            calc: calc.fingerprint(),
            apply: apply.fingerprint(),
        }
    }
}

/// Cached assignment of rows (events, or calc bins) to output bins.
#[derive(Debug, Clone)]
pub struct Transform {
    matrix: TransformMatrix,
    binning: MultiDimBinning,
    row_binning: Option<MultiDimBinning>,
    sample_key: SampleKey,
    kind: TransformKind,
}

fn choose_dense(storage: TransformStorage, cells: usize, dense_limit: usize) -> bool {
    match storage {
        TransformStorage::Dense => true,
        TransformStorage::Sparse => false,
        TransformStorage::Auto => cells <= dense_limit,
    }
}

impl Transform {
    /// One-hot transform from per-event flat bin indices
    /// ([`OUT_OF_RANGE`] rows stay empty).
    pub fn from_bin_indices(
        indices: &[BinIndex],
        binning: &MultiDimBinning,
        sample_key: SampleKey,
        storage: TransformStorage,
        dense_limit: usize,
    ) -> Result<Self> {
        let n_bins = binning.total_bins();
        if let Some(&bad) = indices
            .iter()
            .find(|&&b| b != OUT_OF_RANGE && b >= n_bins)
        {
            return Err(HistError::internal(format!(
                "bin index {} out of bounds for {} bins",
                bad, n_bins
            )));
        }
        let n_rows = indices.len();

        let matrix = if choose_dense(storage, n_rows.saturating_mul(n_bins), dense_limit) {
            let mut dense = Array2::<f64>::zeros((n_rows, n_bins));
            for (row, &bin) in indices.iter().enumerate() {
                if bin != OUT_OF_RANGE {
                    dense[[row, bin]] = 1.0;
                }
            }
            TransformMatrix::Dense(dense)
        } else {
            let mut indptr = Vec::with_capacity(n_rows + 1);
            let mut cols = Vec::with_capacity(n_rows);
            indptr.push(0);
            for &bin in indices {
                if bin != OUT_OF_RANGE {
                    cols.push(bin);
                }
                indptr.push(cols.len());
            }
            let data = vec![1.0; cols.len()];
            TransformMatrix::Sparse(CsMat::new((n_rows, n_bins), indptr, cols, data))
        };

        Ok(Transform {
            matrix,
            kind: TransformKind::one_hot(binning),
            binning: binning.clone(),
            row_binning: None,
            sample_key,
        })
    }

    /// Combined transform from event counts over `calc.combine(apply)`
    /// (flat, calc dimensions first). Row `c` holds the number of events
    /// per apply bin among the events of calc bin `c`.
    pub fn from_combined_counts(
        counts: &Array1<Hist>,
        calc: &MultiDimBinning,
        apply: &MultiDimBinning,
        sample_key: SampleKey,
        storage: TransformStorage,
        dense_limit: usize,
    ) -> Result<Self> {
        calc.combine(apply)?;
        let (n_rows, n_cols) = (calc.total_bins(), apply.total_bins());
        if counts.len() != n_rows * n_cols {
            return Err(HistError::shape_mismatch(
                "combined transform counts",
                n_rows * n_cols,
                counts.len(),
            ));
        }
        let dense = counts
            .view()
            .into_shape_with_order((n_rows, n_cols))
            .map_err(|e| HistError::internal(format!("transform reshape failed: {}", e)))?
            .to_owned();

        let matrix = if choose_dense(storage, n_rows * n_cols, dense_limit) {
            TransformMatrix::Dense(dense)
        } else {
            let mut indptr = Vec::with_capacity(n_rows + 1);
            let mut cols = Vec::new();
            let mut data = Vec::new();
            indptr.push(0);
            for row in dense.rows() {
                for (col, &value) in row.iter().enumerate() {
                    if value != 0.0 {
                        cols.push(col);
                        data.push(value);
                    }
                }
                indptr.push(cols.len());
            }
            TransformMatrix::Sparse(CsMat::new((n_rows, n_cols), indptr, cols, data))
        };

        Ok(Transform {
            matrix,
            kind: TransformKind::combined(calc, apply),
            binning: apply.clone(),
            row_binning: Some(calc.clone()),
            sample_key,
        })
    }

    /// Number of rows: events, or calc bins for a combined transform.
    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }

    /// Number of output bins.
    pub fn cols(&self) -> usize {
        self.matrix.cols()
    }

    /// Number of stored non-zero cells.
    pub fn nnz(&self) -> usize {
        match &self.matrix {
            TransformMatrix::Dense(m) => m.iter().filter(|&&v| v != 0.0).count(),
            TransformMatrix::Sparse(m) => m.nnz(),
        }
    }

    /// Whether the matrix is stored densely.
    pub fn is_dense(&self) -> bool {
        matches!(self.matrix, TransformMatrix::Dense(_))
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &TransformMatrix {
        &self.matrix
    }

    /// Output binning.
    pub fn binning(&self) -> &MultiDimBinning {
        &self.binning
    }

    /// Calc binning of a combined transform.
    pub fn row_binning(&self) -> Option<&MultiDimBinning> {
        self.row_binning.as_ref()
    }

    /// Sample state the transform was built from.
    pub fn sample_key(&self) -> SampleKey {
        self.sample_key
    }

    /// Cache key: sample state and transform kind.
    pub fn key(&self) -> TransformKey {
        (self.sample_key, self.kind)
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    /// Fail with [`HistError::StaleTransform`] unless the transform was
    /// built from exactly this sample state and binning.
    pub fn check_fresh(&self, sample_key: SampleKey, binning: &MultiDimBinning) -> Result<()> {
        if sample_key != self.sample_key {
            return Err(HistError::stale_transform(format!(
                "built from sample {} generation {}, now at sample {} generation {}",
                self.sample_key.id, self.sample_key.generation, sample_key.id, sample_key.generation
            )));
        }
        let expected = match &self.row_binning {
            Some(calc) => TransformKind::combined(calc, binning),
            None => TransformKind::one_hot(binning),
        };
        if expected != self.kind {
            return Err(HistError::stale_transform(format!(
                "built for a different binning than {}",
                binning
            )));
        }
        Ok(())
    }

    /// Flat `weights · T`.
    pub fn apply_flat(&self, weights: ArrayView1<'_, f64>) -> Result<Array1<Hist>> {
        if weights.len() != self.rows() {
            return Err(HistError::shape_mismatch(
                "transform weights",
                self.rows(),
                weights.len(),
            ));
        }
        Ok(self.matrix.contract(&weights))
    }

    /// Histogram of `weights`, shaped per the output binning.
    pub fn apply(&self, weights: ArrayView1<'_, f64>) -> Result<ArrayD<Hist>> {
        reshape(self.apply_flat(weights)?, &self.binning)
    }

    /// Histogram of `weights` and sumw2 `(weights²) · T`.
    pub fn apply_with_variance(
        &self,
        weights: ArrayView1<'_, f64>,
    ) -> Result<(ArrayD<Hist>, ArrayD<Hist>)> {
        let hist = self.apply(weights.view())?;
        let squared = weights.mapv(|w| w * w);
        let sumw2 = self.apply(squared.view())?;
        Ok((hist, sumw2))
    }

    /// [`Transform::apply`] after [`Transform::check_fresh`].
    pub fn apply_checked(
        &self,
        sample_key: SampleKey,
        binning: &MultiDimBinning,
        weights: ArrayView1<'_, f64>,
    ) -> Result<ArrayD<Hist>> {
        self.check_fresh(sample_key, binning)?;
        self.apply(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::Dimension;
    use crate::dataset::Sample;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn one_dim() -> MultiDimBinning {
        MultiDimBinning::one_dim(Dimension::new("x", vec![0.0, 1.0, 2.0, 3.0]).unwrap())
    }

    fn key() -> SampleKey {
        Sample::new(0).key()
    }

    #[test]
    fn test_dense_and_sparse_agree() {
        let indices = vec![0, 1, 2, 2, OUT_OF_RANGE];
        let weights = array![1.0, 2.0, 3.0, 4.0, 100.0];
        let dense =
            Transform::from_bin_indices(&indices, &one_dim(), key(), TransformStorage::Dense, 0)
                .unwrap();
        let sparse =
            Transform::from_bin_indices(&indices, &one_dim(), key(), TransformStorage::Sparse, 0)
                .unwrap();
        assert!(dense.is_dense());
        assert!(!sparse.is_dense());
        assert_eq!(dense.nnz(), 4);
        assert_eq!(sparse.nnz(), 4);
        let a = dense.apply_flat(weights.view()).unwrap();
        let b = sparse.apply_flat(weights.view()).unwrap();
        assert_eq!(a, array![1.0, 2.0, 7.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_auto_storage_threshold() {
        let indices = vec![0, 1];
        let small =
            Transform::from_bin_indices(&indices, &one_dim(), key(), TransformStorage::Auto, 6)
                .unwrap();
        let large =
            Transform::from_bin_indices(&indices, &one_dim(), key(), TransformStorage::Auto, 5)
                .unwrap();
        assert!(small.is_dense());
        assert!(!large.is_dense());
    }

    #[test]
    fn test_variance() {
        let t = Transform::from_bin_indices(&[0, 0, 2], &one_dim(), key(), TransformStorage::Sparse, 0)
            .unwrap();
        let (hist, sumw2) = t.apply_with_variance(array![1.0, 2.0, 3.0].view()).unwrap();
        assert_relative_eq!(hist[[0]], 3.0);
        assert_relative_eq!(sumw2[[0]], 5.0);
        assert_relative_eq!(sumw2[[2]], 9.0);
    }

    #[test]
    fn test_weight_length_mismatch() {
        let t = Transform::from_bin_indices(&[0, 1], &one_dim(), key(), TransformStorage::Dense, 0)
            .unwrap();
        assert!(matches!(
            t.apply(array![1.0].view()),
            Err(HistError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_stale_detection() {
        let mut sample = Sample::from_columns(vec![("x", array![0.5, 1.5])]).unwrap();
        let t = Transform::from_bin_indices(&[0, 1], &one_dim(), sample.key(), TransformStorage::Dense, 0)
            .unwrap();
        assert!(t.check_fresh(sample.key(), &one_dim()).is_ok());

        let other = MultiDimBinning::one_dim(Dimension::new("x", vec![0.0, 2.0, 3.0]).unwrap());
        assert!(matches!(
            t.check_fresh(sample.key(), &other),
            Err(HistError::StaleTransform { .. })
        ));

        sample.set_column("x", array![2.5, 1.5]).unwrap();
        assert!(matches!(
            t.apply_checked(sample.key(), &one_dim(), array![1.0, 1.0].view()),
            Err(HistError::StaleTransform { .. })
        ));
    }

    #[test]
    fn test_combined_counts() {
        let calc = MultiDimBinning::one_dim(Dimension::new("c", vec![0.0, 1.0, 2.0]).unwrap());
        let apply = MultiDimBinning::one_dim(Dimension::new("a", vec![0.0, 1.0, 2.0, 3.0]).unwrap());
        // calc bin 0 -> apply bins {0: 2 events, 2: 1 event}; calc bin 1 -> apply bin 1
        let counts = array![2.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let sample_key = key();
        for storage in [TransformStorage::Dense, TransformStorage::Sparse] {
            let t = Transform::from_combined_counts(&counts, &calc, &apply, sample_key, storage, 0)
                .unwrap();
            assert_eq!((t.rows(), t.cols()), (2, 3));
            assert!(t.row_binning().is_some());
            let hist = t.apply_flat(array![0.5, 4.0].view()).unwrap();
            assert_eq!(hist, array![1.0, 4.0, 0.5]);
            assert!(t.check_fresh(sample_key, &apply).is_ok());
            assert_eq!(t.kind(), TransformKind::combined(&calc, &apply));
        }
    }

    #[test]
    fn test_one_hot_over_combined_binning_is_a_different_kind() {
        let calc = MultiDimBinning::one_dim(Dimension::new("c", vec![0.0, 1.0, 2.0]).unwrap());
        let apply = MultiDimBinning::one_dim(Dimension::new("a", vec![0.0, 1.0, 2.0]).unwrap());
        let combined = calc.combine(&apply).unwrap();
        let sample_key = key();
        let one_hot =
            Transform::from_bin_indices(&[0, 3], &combined, sample_key, TransformStorage::Dense, 0)
                .unwrap();
        let counts = array![1.0, 0.0, 0.0, 1.0];
        let calc_to_apply = Transform::from_combined_counts(
            &counts,
            &calc,
            &apply,
            sample_key,
            TransformStorage::Dense,
            0,
        )
        .unwrap();
        assert_ne!(one_hot.key(), calc_to_apply.key());
        assert!(one_hot.check_fresh(sample_key, &combined).is_ok());
        assert!(matches!(
            calc_to_apply.check_fresh(sample_key, &combined),
            Err(HistError::StaleTransform { .. })
        ));
    }
}
