//! The histogramming step of a fit loop.
//!
//! A [`Histogrammer`] turns each container's event weights into binned
//! weights in its apply binning, and optionally per-bin errors. In
//! [`CalcMode::Events`] every event is histogrammed directly. In
//! [`CalcMode::Binned`] a combined transform is built once in
//! [`Histogrammer::setup`] holding, per bin of the calc binning, the number
//! of events in each apply bin; each [`Histogrammer::apply`] then contracts
//! the calc-binned average weights against it, which costs
//! O(calc bins x apply bins) instead of O(events).

use crate::binning::MultiDimBinning;
use crate::core::constants::{ERRORS_KEY, WEIGHTS_KEY};
use crate::core::error::Result;
use crate::core::types::{ErrorMethod, Hist, TranslationMode};
use crate::dataset::{Container, Representation};
use crate::histogram::Transform;
use ndarray::Array1;
use std::collections::HashMap;
use std::sync::Arc;

/// Where weights are evaluated before histogramming.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcMode {
    /// Per event
    Events,
    /// Per bin of a coarser (or orthogonal) calc binning
    Binned(MultiDimBinning),
}

/// Events-to-apply-binning step over a set of containers.
#[derive(Debug)]
pub struct Histogrammer {
    calc_mode: CalcMode,
    apply_binning: MultiDimBinning,
    error_method: ErrorMethod,
    transforms: HashMap<String, Arc<Transform>>,
}

impl Histogrammer {
    /// A calc binning must not share dimension names with `apply_binning`.
    pub fn new(
        calc_mode: CalcMode,
        apply_binning: MultiDimBinning,
        error_method: ErrorMethod,
    ) -> Result<Self> {
        if let CalcMode::Binned(calc) = &calc_mode {
            calc.combine(&apply_binning)?;
        }
        Ok(Histogrammer {
            calc_mode,
            apply_binning,
            error_method,
            transforms: HashMap::new(),
        })
    }

    pub fn calc_mode(&self) -> &CalcMode {
        &self.calc_mode
    }

    pub fn apply_binning(&self) -> &MultiDimBinning {
        &self.apply_binning
    }

    pub fn error_method(&self) -> ErrorMethod {
        self.error_method
    }

    /// Build the combined transforms (binned calc mode) or check that the
    /// apply dimensions are present (events calc mode).
    pub fn setup(&mut self, containers: &[Container]) -> Result<()> {
        self.transforms.clear();
        for container in containers {
            match &self.calc_mode {
                CalcMode::Events => {
                    container.sample().coordinates(&self.apply_binning)?;
                }
                CalcMode::Binned(calc) => {
                    let transform = container.engine().combined_transform(
                        container.sample(),
                        calc,
                        &self.apply_binning,
                    )?;
                    log::debug!(
                        "container '{}': {}x{} combined transform",
                        container.name(),
                        transform.rows(),
                        transform.cols()
                    );
                    self.transforms
                        .insert(container.name().to_string(), transform);
                }
            }
        }
        Ok(())
    }

    /// Replace each container's weights with their histogram in the apply
    /// binning, plus `errors = sqrt(sumw2)` when requested.
    pub fn apply(&self, containers: &mut [Container]) -> Result<()> {
        for container in containers.iter_mut() {
            let (hist, sumw2) = match &self.calc_mode {
                CalcMode::Events => self.apply_events(container)?,
                CalcMode::Binned(calc) => self.apply_binned(container, calc)?,
            };

            let target = Representation::Binned(self.apply_binning.clone());
            container.set_in(WEIGHTS_KEY, &target, hist)?;
            if let Some(sumw2) = sumw2 {
                container.set_in(ERRORS_KEY, &target, sumw2.mapv(f64::sqrt))?;
            }
            container.set_representation(target);
        }
        Ok(())
    }

    fn apply_events(&self, container: &mut Container) -> Result<(Array1<Hist>, Option<Array1<Hist>>)> {
        let weights = container
            .get_in(WEIGHTS_KEY, &Representation::Events)?
            .to_owned();
        let backend = container.engine().backend();
        let sample = container.sample();
        let hist = backend.accumulate_flat(sample, Some(weights.view()), &self.apply_binning)?;
        let sumw2 = match self.error_method {
            ErrorMethod::Sumw2 => {
                let squared = weights.mapv(|w| w * w);
                Some(backend.accumulate_flat(sample, Some(squared.view()), &self.apply_binning)?)
            }
            ErrorMethod::None => None,
        };
        Ok((hist, sumw2))
    }

    fn apply_binned(
        &self,
        container: &mut Container,
        calc: &MultiDimBinning,
    ) -> Result<(Array1<Hist>, Option<Array1<Hist>>)> {
        let transform = self.transforms.get(container.name()).ok_or_else(|| {
            crate::config_error!(
                "no transform for container '{}': setup was not run",
                container.name()
            )
        })?;
        transform.check_fresh(container.sample().key(), &self.apply_binning)?;

        let mode = container.translation_mode(WEIGHTS_KEY)?;
        container.set_translation_mode(WEIGHTS_KEY, TranslationMode::Average)?;
        let weights = container
            .get_in(WEIGHTS_KEY, &Representation::Binned(calc.clone()))
            .map(|w| w.to_owned());
        container.set_translation_mode(WEIGHTS_KEY, mode)?;
        let weights = weights?;

        let hist = transform.apply_flat(weights.view())?;
        let sumw2 = match self.error_method {
            ErrorMethod::Sumw2 => Some(transform.apply_flat(weights.mapv(|w| w * w).view())?),
            ErrorMethod::None => None,
        };
        Ok((hist, sumw2))
    }
}
