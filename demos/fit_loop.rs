//! Fit-loop demo for evhist.
//!
//! Builds a container of synthetic events, then re-weights it over a few
//! "minimizer iterations" through a binned-calc histogramming step, and
//! compares against direct accumulation.
//!
//! Run with: `cargo run --example fit_loop`

use anyhow::{Context, Result};
use evhist::*;
use ndarray::Array1;
use std::sync::Arc;

fn main() -> Result<()> {
    evhist::init()?;
    println!("{}", evhist::capabilities().summary());

    let mut config = EngineConfig::load_from_environment().context("reading EVHIST_* overrides")?;
    config.error_method = ErrorMethod::Sumw2;
    let engine = Arc::new(Engine::new(config)?);

    let n_events = 50_000;
    let reco: Array1<f64> = (0..n_events)
        .map(|i| (i as f64 * 0.754_877_666).fract() * 50.0)
        .collect();
    let truth: Array1<f64> = reco.mapv(|r| (r * 1.1 + 2.0).min(60.0));
    let sample = Sample::from_columns(vec![("reco_energy", reco), ("true_energy", truth.clone())])?;

    let apply = MultiDimBinning::one_dim(Dimension::logarithmic("reco_energy", 1.0, 50.0, 8)?);
    let calc = MultiDimBinning::one_dim(Dimension::linear("true_energy", 0.0, 60.0, 120)?);

    let mut containers = vec![engine.new_container("numu_cc", sample)];
    let mut step = engine.histogrammer(CalcMode::Binned(calc), apply.clone())?;
    step.setup(&containers)?;

    for (iteration, index) in [2.0, 2.3, 2.7].iter().enumerate() {
        // power-law re-weighting, the only thing that changes per iteration
        let weights = truth.mapv(|e| (e + 1.0).powf(-index) * 1e4);
        containers[0].set_in(WEIGHTS_KEY, &Representation::Events, weights.clone())?;
        let direct = engine.accumulate(containers[0].sample(), Some(weights.view()), &apply)?;

        step.apply(&mut containers)?;
        let hist = containers[0].get(WEIGHTS_KEY)?.to_owned();
        let errors = containers[0].get(ERRORS_KEY)?.to_owned();

        println!("iteration {} (index {:.1}) in {}", iteration, index, apply);
        for (bin, ((h, e), d)) in hist.iter().zip(errors.iter()).zip(direct.iter()).enumerate() {
            println!("  bin {:>2}: {:>12.4} +- {:>10.4}  (direct {:>12.4})", bin, h, e, d);
        }
    }

    let stats = engine.cache_statistics()?;
    println!("transform cache: {} hits, {} misses", stats.hits, stats.misses);
    Ok(())
}
