//! Property tests for bin location, weight conservation and transform
//! equivalence.

use evhist::*;
use ndarray::Array1;
use proptest::prelude::*;

mod common;
use common::*;

/// Strictly increasing edges built from positive increments.
fn edges_strategy() -> impl Strategy<Value = Vec<f64>> {
    (-50.0f64..50.0, prop::collection::vec(0.01f64..10.0, 1..20)).prop_map(|(start, steps)| {
        let mut edges = Vec::with_capacity(steps.len() + 1);
        edges.push(start);
        for step in steps {
            let last = edges[edges.len() - 1];
            edges.push(last + step);
        }
        edges
    })
}

/// Events spread slightly beyond `[0, 10]` with positive weights.
fn events_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    prop::collection::vec((-2.0f64..12.0, 0.0f64..5.0), 0..300)
        .prop_map(|pairs| pairs.into_iter().unzip())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_locate_total_on_domain(edges in edges_strategy(), fraction in 0.0f64..=1.0) {
        let n = edges.len() - 1;
        let (lo, hi) = (edges[0], edges[n]);
        let x = (lo + fraction * (hi - lo)).clamp(lo, hi);
        let bin = locate(x, &edges);
        prop_assert!(bin.is_some());
        let bin = bin.unwrap();
        prop_assert!(bin < n);
        prop_assert!(edges[bin] <= x);
        prop_assert!(x < edges[bin + 1] || bin == n - 1);
    }

    #[test]
    fn prop_boundary_law(edges in edges_strategy()) {
        let n = edges.len() - 1;
        for (k, &edge) in edges.iter().enumerate().take(n) {
            prop_assert_eq!(locate(edge, &edges), Some(k));
        }
        prop_assert_eq!(locate(edges[n], &edges), Some(n - 1));
    }

    #[test]
    fn prop_out_of_range_is_sentinel(edges in edges_strategy(), offset in 0.001f64..100.0) {
        let n = edges.len() - 1;
        prop_assert_eq!(locate(edges[0] - offset, &edges), None);
        prop_assert_eq!(locate(edges[n] + offset, &edges), None);
        prop_assert_eq!(locate(f64::NAN, &edges), None);
    }

    #[test]
    fn prop_weight_is_conserved((xs, ws) in events_strategy(), n_bins in 1usize..12) {
        let binning = linear_binning(n_bins);
        let dim = &binning.dimensions()[0];
        let sample = Sample::from_columns(vec![("x", Array1::from(xs.clone()))]).unwrap();
        let weights = Array1::from(ws.clone());
        let expected: f64 = xs
            .iter()
            .zip(&ws)
            .filter(|(x, _)| dim.locate(**x).is_some())
            .map(|(_, w)| w)
            .sum();
        for engine in engines() {
            let hist = engine.accumulate(&sample, Some(weights.view()), &binning).unwrap();
            prop_assert!((hist.sum() - expected).abs() <= 1e-9 * (1.0 + expected.abs()));
        }
    }

    #[test]
    fn prop_transform_equals_accumulate((xs, ws) in events_strategy(), n_bins in 1usize..12) {
        let binning = linear_binning(n_bins);
        let sample = Sample::from_columns(vec![("x", Array1::from(xs))]).unwrap();
        let weights = Array1::from(ws);
        for engine in engines() {
            let direct = engine.accumulate(&sample, Some(weights.view()), &binning).unwrap();
            let transform = engine.build_transform(&sample, &binning).unwrap();
            let via_transform = engine.apply_transform(&transform, weights.view()).unwrap();
            for (a, b) in direct.iter().zip(via_transform.iter()) {
                prop_assert!((a - b).abs() <= 1e-9 * (1.0 + a.abs()));
            }
        }
    }

    #[test]
    fn prop_accumulate_is_idempotent((xs, ws) in events_strategy()) {
        let binning = linear_binning(7);
        let sample = Sample::from_columns(vec![("x", Array1::from(xs))]).unwrap();
        let weights = Array1::from(ws);
        let engines = engines();
        let first = engines[0].accumulate(&sample, Some(weights.view()), &binning).unwrap();
        let second = engines[0].accumulate(&sample, Some(weights.view()), &binning).unwrap();
        prop_assert_eq!(first, second);
    }
}
