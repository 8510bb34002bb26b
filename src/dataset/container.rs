//! Named attribute store with controlled representation switching.
//!
//! A [`Container`] owns one [`Sample`] (the coordinate columns) and any
//! number of further attributes such as weights or errors. Each attribute
//! tracks which [`Representation`] is currently valid. Reading an attribute
//! in a binned representation translates it lazily from its per-event data
//! through the engine's cached transform; reading a binned-only attribute
//! per event fails, since binned data cannot be un-aggregated.

use crate::binning::MultiDimBinning;
use crate::core::constants::WEIGHTS_KEY;
use crate::core::error::{HistError, Result};
use crate::core::types::TranslationMode;
use crate::dataset::representation::{AttributeState, Representation};
use crate::dataset::Sample;
use crate::engine::Engine;
use crate::histogram::Transform;
use ndarray::{Array1, ArrayView1, Zip};
use std::collections::HashMap;
use std::sync::Arc;

/// Sample coordinates plus named per-event or per-bin attributes.
#[derive(Debug)]
pub struct Container {
    name: String,
    sample: Sample,
    attributes: HashMap<String, AttributeState>,
    representation: Representation,
    engine: Arc<Engine>,
}

/// Reduce per-event `values` into the bins of `transform`.
pub fn translate_events(
    transform: &Transform,
    values: ArrayView1<'_, f64>,
    mode: TranslationMode,
) -> Result<Array1<f64>> {
    let mut sums = transform.apply_flat(values)?;
    if mode == TranslationMode::Average {
        let counts = transform.apply_flat(Array1::<f64>::ones(values.len()).view())?;
        Zip::from(&mut sums).and(&counts).for_each(|s, &n| {
            *s = if n > 0.0 { *s / n } else { 0.0 };
        });
    }
    Ok(sums)
}

impl Container {
    /// Wrap `sample`; weights start as ones in events form.
    pub fn new<S: Into<String>>(name: S, sample: Sample, engine: Arc<Engine>) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(
            WEIGHTS_KEY.to_string(),
            AttributeState::from_events(Array1::ones(sample.n_events()), TranslationMode::Sum),
        );
        Container {
            name: name.into(),
            sample,
            attributes,
            representation: Representation::Events,
            engine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn n_events(&self) -> usize {
        self.sample.n_events()
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Representation used by [`Container::get`] and [`Container::set`].
    pub fn representation(&self) -> &Representation {
        &self.representation
    }

    /// Change the default representation. No data is translated until an
    /// attribute is read.
    pub fn set_representation<R: Into<Representation>>(&mut self, representation: R) {
        self.representation = representation.into();
    }

    /// Whether `attr` is a coordinate column or a stored attribute.
    pub fn has_attribute(&self, attr: &str) -> bool {
        self.sample.has_column(attr) || self.attributes.contains_key(attr)
    }

    /// Coordinate and attribute names, sorted.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names = self.sample.column_names();
        for name in self.attributes.keys() {
            if !self.sample.has_column(name) {
                names.push(name.as_str());
            }
        }
        names.sort_unstable();
        names
    }

    /// Currently valid representation of `attr`.
    pub fn representation_of(&self, attr: &str) -> Result<Representation> {
        match self.attributes.get(attr) {
            Some(state) => Ok(state.representation().clone()),
            None if self.sample.has_column(attr) => Ok(Representation::Events),
            None => Err(HistError::missing_attribute(attr)),
        }
    }

    /// Translation mode of `attr`. Coordinates default to `Average`.
    pub fn translation_mode(&self, attr: &str) -> Result<TranslationMode> {
        match self.attributes.get(attr) {
            Some(state) => Ok(state.mode()),
            None if self.sample.has_column(attr) => Ok(TranslationMode::Average),
            None => Err(HistError::missing_attribute(attr)),
        }
    }

    /// Set how `attr` is reduced into bins. Binned views derived under the
    /// previous mode are discarded.
    pub fn set_translation_mode(&mut self, attr: &str, mode: TranslationMode) -> Result<()> {
        if let Some(state) = self.attributes.get_mut(attr) {
            state.set_mode(mode);
            return Ok(());
        }
        if self.sample.has_column(attr) {
            self.attributes
                .insert(attr.to_string(), AttributeState::derived(mode));
            return Ok(());
        }
        Err(HistError::missing_attribute(attr))
    }

    /// `attr` in the container's current representation.
    pub fn get(&mut self, attr: &str) -> Result<ArrayView1<'_, f64>> {
        let target = self.representation.clone();
        self.get_in(attr, &target)
    }

    /// `attr` in `target` form, translating from per-event data if needed.
    /// The attribute's current representation becomes `target`.
    pub fn get_in(&mut self, attr: &str, target: &Representation) -> Result<ArrayView1<'_, f64>> {
        if !self.has_attribute(attr) {
            return Err(HistError::missing_attribute(attr));
        }
        if target.is_events() && self.sample.has_column(attr) {
            if let Some(state) = self.attributes.get_mut(attr) {
                state.set_current(Representation::Events);
            }
            return self
                .sample
                .column(attr)
                .ok_or_else(|| HistError::missing_attribute(attr));
        }

        self.ensure_view(attr, target)?;
        let state = self
            .attributes
            .get_mut(attr)
            .ok_or_else(|| HistError::missing_attribute(attr))?;
        state.set_current(target.clone());
        state
            .view(target)
            .map(|values| values.view())
            .ok_or_else(|| HistError::internal(format!("view of '{}' vanished", attr)))
    }

    /// Store `values` for `attr` in the container's current representation.
    pub fn set(&mut self, attr: &str, values: Array1<f64>) -> Result<()> {
        let target = self.representation.clone();
        self.set_in(attr, &target, values)
    }

    /// Store `values` for `attr` in `target` form, discarding every other
    /// view of it. Setting a coordinate changes the sample, which drops all
    /// cached transforms and derived binned views.
    pub fn set_in(&mut self, attr: &str, target: &Representation, values: Array1<f64>) -> Result<()> {
        let expected = match target {
            Representation::Events => self.sample.n_events(),
            Representation::Binned(binning) => binning.total_bins(),
        };
        if values.len() != expected {
            return Err(HistError::shape_mismatch(
                format!("attribute '{}' in {} form", attr, target),
                expected,
                values.len(),
            ));
        }

        if self.sample.has_column(attr) {
            if let Representation::Binned(_) = target {
                return Err(HistError::configuration(format!(
                    "coordinate '{}' can only be set per event",
                    attr
                )));
            }
            return self.set_coordinate(attr, values);
        }

        let mode = self
            .attributes
            .get(attr)
            .map_or(TranslationMode::Sum, AttributeState::mode);
        let state = match target {
            Representation::Events => AttributeState::from_events(values, mode),
            Representation::Binned(binning) => AttributeState::from_binned(binning, values, mode),
        };
        self.attributes.insert(attr.to_string(), state);
        Ok(())
    }

    /// Remove a non-coordinate attribute.
    pub fn remove(&mut self, attr: &str) -> Option<AttributeState> {
        if self.sample.has_column(attr) {
            return None;
        }
        self.attributes.remove(attr)
    }

    /// Cached events-to-bins transform of this container's sample.
    pub fn transform(&self, binning: &MultiDimBinning) -> Result<Arc<Transform>> {
        self.engine.transform(&self.sample, binning)
    }

    fn set_coordinate(&mut self, attr: &str, values: Array1<f64>) -> Result<()> {
        let id = self.sample.key().id;
        self.sample.set_column(attr, values)?;
        self.engine.invalidate_sample(id)?;
        for state in self.attributes.values_mut() {
            state.drop_derived();
        }
        if let Some(state) = self.attributes.get_mut(attr) {
            state.set_current(Representation::Events);
        }
        log::debug!("container '{}': coordinate '{}' replaced", self.name, attr);
        Ok(())
    }

    fn ensure_view(&mut self, attr: &str, target: &Representation) -> Result<()> {
        let binning = match target {
            Representation::Events => {
                if self.attributes.get(attr).and_then(AttributeState::events).is_some() {
                    return Ok(());
                }
                return Err(HistError::unsupported_transition(
                    attr,
                    self.representation_of(attr)?,
                    target,
                ));
            }
            Representation::Binned(binning) => binning,
        };
        if self
            .attributes
            .get(attr)
            .and_then(|state| state.binned(binning))
            .is_some()
        {
            return Ok(());
        }

        let mode = self.translation_mode(attr)?;
        let binned = {
            let events = match self.sample.column(attr) {
                Some(column) => column,
                None => match self.attributes.get(attr).and_then(AttributeState::events) {
                    Some(values) => values.view(),
                    None => {
                        return Err(HistError::unsupported_transition(
                            attr,
                            self.representation_of(attr)?,
                            target,
                        ))
                    }
                },
            };
            let transform = self.engine.transform(&self.sample, binning)?;
            translate_events(&transform, events, mode)?
        };
        log::trace!("container '{}': translated '{}' to {}", self.name, attr, target);
        self.attributes
            .entry(attr.to_string())
            .or_insert_with(|| AttributeState::derived(mode))
            .store_binned(binning, binned);
        Ok(())
    }
}
