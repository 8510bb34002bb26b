//! One-dimensional binning: named, strictly increasing edges and the
//! edge search that maps a coordinate to its bin.

use crate::core::error::{HistError, Result};
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Locate the bin containing `x` in a strictly increasing edge array.
///
/// Bins are closed on the left and open on the right, except the last bin
/// which is closed on both ends: `x == edges[num_bins]` lands in
/// `num_bins - 1`. Values outside `[edges[0], edges[num_bins]]` and NaN
/// return `None`.
///
/// ```rust
/// use evhist::binning::locate;
///
/// let edges = [0.0, 1.0, 2.0, 3.0];
/// assert_eq!(locate(1.0, &edges), Some(1));
/// assert_eq!(locate(3.0, &edges), Some(2));
/// assert_eq!(locate(-0.5, &edges), None);
/// ```
#[inline]
pub fn locate<F: Float>(x: F, edges: &[F]) -> Option<usize> {
    let num_bins = edges.len().checked_sub(1)?;
    if num_bins == 0 {
        return None;
    }
    // written so that NaN fails the range check
    if !(x >= edges[0] && x <= edges[num_bins]) {
        return None;
    }
    // number of edges <= x; at least 1 because edges[0] <= x
    let upper = edges.partition_point(|&e| e <= x);
    Some((upper - 1).min(num_bins - 1))
}

/// A named axis with `num_bins + 1` strictly increasing edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDimension")]
pub struct Dimension {
    name: String,
    edges: Vec<f64>,
    is_log: bool,
}

#[derive(Deserialize)]
struct RawDimension {
    name: String,
    edges: Vec<f64>,
    #[serde(default)]
    is_log: bool,
}

impl TryFrom<RawDimension> for Dimension {
    type Error = HistError;

    fn try_from(raw: RawDimension) -> Result<Self> {
        let mut dim = Dimension::new(raw.name, raw.edges)?;
        dim.is_log = raw.is_log;
        Ok(dim)
    }
}

impl Dimension {
    /// Create a dimension from explicit edges.
    pub fn new<S: Into<String>>(name: S, edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(HistError::configuration("dimension name must not be empty"));
        }
        if edges.len() < 2 {
            return Err(HistError::configuration(format!(
                "dimension '{}' needs at least 2 edges, got {}",
                name,
                edges.len()
            )));
        }
        if let Some(pos) = edges.windows(2).position(|w| !(w[0] < w[1])) {
            return Err(HistError::configuration(format!(
                "edges of dimension '{}' must be strictly increasing: edges[{}] = {} >= edges[{}] = {}",
                name,
                pos,
                edges[pos],
                pos + 1,
                edges[pos + 1]
            )));
        }
        Ok(Dimension {
            name,
            edges,
            is_log: false,
        })
    }

    /// `num_bins` equal-width bins spanning `[lo, hi]`.
    pub fn linear<S: Into<String>>(name: S, lo: f64, hi: f64, num_bins: usize) -> Result<Self> {
        let name = name.into();
        check_range(&name, lo, hi, num_bins)?;
        let step = (hi - lo) / num_bins as f64;
        let mut edges: Vec<f64> = (0..=num_bins).map(|i| lo + step * i as f64).collect();
        edges[num_bins] = hi;
        Dimension::new(name, edges)
    }

    /// `num_bins` bins of equal width in `ln(x)` spanning `[lo, hi]`.
    pub fn logarithmic<S: Into<String>>(
        name: S,
        lo: f64,
        hi: f64,
        num_bins: usize,
    ) -> Result<Self> {
        let name = name.into();
        check_range(&name, lo, hi, num_bins)?;
        if lo <= 0.0 {
            return Err(HistError::configuration(format!(
                "logarithmic dimension '{}' needs a positive lower bound, got {}",
                name, lo
            )));
        }
        let (ln_lo, ln_hi) = (lo.ln(), hi.ln());
        let step = (ln_hi - ln_lo) / num_bins as f64;
        let mut edges: Vec<f64> = (0..=num_bins)
            .map(|i| (ln_lo + step * i as f64).exp())
            .collect();
        edges[0] = lo;
        edges[num_bins] = hi;
        let mut dim = Dimension::new(name, edges)?;
        dim.is_log = true;
        Ok(dim)
    }

    /// Dimension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bin edges, length `num_bins() + 1`.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Whether the edges were generated on a log scale.
    pub fn is_log(&self) -> bool {
        self.is_log
    }

    /// Number of bins.
    pub fn num_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// `(edges[0], edges[num_bins])`.
    pub fn domain(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.num_bins()])
    }

    /// Bin midpoints; geometric for log dimensions.
    pub fn bin_centers(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|w| {
                if self.is_log {
                    (w[0] * w[1]).sqrt()
                } else {
                    0.5 * (w[0] + w[1])
                }
            })
            .collect()
    }

    /// Bin widths.
    pub fn bin_widths(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Bin containing `x`, see [`locate`].
    #[inline]
    pub fn locate(&self, x: f64) -> Option<usize> {
        locate(x, &self.edges)
    }
}

fn check_range(name: &str, lo: f64, hi: f64, num_bins: usize) -> Result<()> {
    if num_bins == 0 {
        return Err(HistError::invalid_parameter(
            "num_bins",
            "0",
            format!("dimension '{}' needs at least one bin", name),
        ));
    }
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        return Err(HistError::configuration(format!(
            "dimension '{}' needs finite bounds with lo < hi, got [{}, {}]",
            name, lo, hi
        )));
    }
    Ok(())
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = self.domain();
        write!(
            f,
            "{}[{} {} bins in [{}, {}]]",
            self.name,
            if self.is_log { "log" } else { "lin" },
            self.num_bins(),
            lo,
            hi
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_interior_edges_open_high() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(locate(0.0, &edges), Some(0));
        assert_eq!(locate(0.999, &edges), Some(0));
        assert_eq!(locate(1.0, &edges), Some(1));
        assert_eq!(locate(2.0, &edges), Some(2));
        assert_eq!(locate(2.5, &edges), Some(2));
    }

    #[test]
    fn test_locate_last_edge_closed() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(locate(3.0, &edges), Some(2));
        assert_eq!(locate(3.0 + 1e-12, &edges), None);
    }

    #[test]
    fn test_locate_out_of_range_and_nan() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(locate(-0.5, &edges), None);
        assert_eq!(locate(f64::NAN, &edges), None);
        assert_eq!(locate(f64::INFINITY, &edges), None);
        assert_eq!(locate(0.5, &[1.0_f64]), None);
        assert_eq!(locate(0.5, &[] as &[f64]), None);
    }

    #[test]
    fn test_locate_single_bin() {
        let edges = [-1.0, 1.0];
        assert_eq!(locate(-1.0, &edges), Some(0));
        assert_eq!(locate(1.0, &edges), Some(0));
    }

    #[test]
    fn test_locate_f32() {
        let edges = [0.0_f32, 0.5, 1.0];
        assert_eq!(locate(0.5_f32, &edges), Some(1));
        assert_eq!(locate(1.0_f32, &edges), Some(1));
    }

    #[test]
    fn test_new_rejects_bad_edges() {
        assert!(Dimension::new("x", vec![0.0]).is_err());
        assert!(Dimension::new("x", vec![0.0, 0.0]).is_err());
        assert!(Dimension::new("x", vec![0.0, 2.0, 1.0]).is_err());
        assert!(Dimension::new("x", vec![0.0, f64::NAN]).is_err());
        assert!(Dimension::new("", vec![0.0, 1.0]).is_err());
        assert!(Dimension::new("x", vec![f64::NEG_INFINITY, 0.0, f64::INFINITY]).is_ok());
    }

    #[test]
    fn test_linear() {
        let dim = Dimension::linear("x", 0.0, 1.0, 4).unwrap();
        assert_eq!(dim.num_bins(), 4);
        assert_eq!(dim.edges(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(dim.bin_centers(), vec![0.125, 0.375, 0.625, 0.875]);
        assert!(!dim.is_log());
        assert!(Dimension::linear("x", 1.0, 0.0, 4).is_err());
        assert!(Dimension::linear("x", 0.0, 1.0, 0).is_err());
    }

    #[test]
    fn test_logarithmic() {
        let dim = Dimension::logarithmic("energy", 1.0, 100.0, 2).unwrap();
        assert!(dim.is_log());
        assert_eq!(dim.domain(), (1.0, 100.0));
        assert!((dim.edges()[1] - 10.0).abs() < 1e-9);
        let centers = dim.bin_centers();
        assert!((centers[0] - 10.0_f64.sqrt()).abs() < 1e-9);
        assert!(Dimension::logarithmic("energy", 0.0, 100.0, 2).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let json = r#"{"name":"x","edges":[0.0,1.0,2.0],"is_log":false}"#;
        let dim: Dimension = serde_json::from_str(json).unwrap();
        assert_eq!(dim.num_bins(), 2);

        let bad = r#"{"name":"x","edges":[2.0,1.0]}"#;
        assert!(serde_json::from_str::<Dimension>(bad).is_err());
    }
}
