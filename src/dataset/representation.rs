//! Per-attribute representation state.

use crate::binning::MultiDimBinning;
use crate::core::types::TranslationMode;
use ndarray::Array1;
use std::collections::HashMap;
use std::fmt;

/// The form an attribute's data is held in.
#[derive(Debug, Clone, PartialEq)]
pub enum Representation {
    /// One value per event
    Events,
    /// One value per bin of the given binning
    Binned(MultiDimBinning),
}

impl Representation {
    /// Whether this is the per-event form.
    pub fn is_events(&self) -> bool {
        matches!(self, Representation::Events)
    }

    /// Binning of a binned representation.
    pub fn binning(&self) -> Option<&MultiDimBinning> {
        match self {
            Representation::Events => None,
            Representation::Binned(binning) => Some(binning),
        }
    }
}

impl From<MultiDimBinning> for Representation {
    fn from(binning: MultiDimBinning) -> Self {
        Representation::Binned(binning)
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Events => write!(f, "events"),
            Representation::Binned(binning) => write!(f, "{}", binning),
        }
    }
}

/// Data views of one attribute plus the tag of the currently valid one.
///
/// An attribute may hold its per-event data and any number of binned views
/// derived from it; binned views are keyed by binning fingerprint. Only
/// [`crate::dataset::Container`] transitions this state.
#[derive(Debug, Clone)]
pub struct AttributeState {
    events: Option<Array1<f64>>,
    binned: HashMap<u64, Array1<f64>>,
    current: Representation,
    mode: TranslationMode,
}

impl AttributeState {
    /// State holding per-event data.
    pub fn from_events(values: Array1<f64>, mode: TranslationMode) -> Self {
        AttributeState {
            events: Some(values),
            binned: HashMap::new(),
            current: Representation::Events,
            mode,
        }
    }

    /// State holding only one binned view.
    pub fn from_binned(binning: &MultiDimBinning, values: Array1<f64>, mode: TranslationMode) -> Self {
        let mut binned = HashMap::new();
        binned.insert(binning.fingerprint(), values);
        AttributeState {
            events: None,
            binned,
            current: Representation::Binned(binning.clone()),
            mode,
        }
    }

    /// State with no data yet, used for binned views of sample coordinates.
    pub(crate) fn derived(mode: TranslationMode) -> Self {
        AttributeState {
            events: None,
            binned: HashMap::new(),
            current: Representation::Events,
            mode,
        }
    }

    /// Currently valid representation.
    pub fn representation(&self) -> &Representation {
        &self.current
    }

    /// Reduction used when translating to a binned view.
    pub fn mode(&self) -> TranslationMode {
        self.mode
    }

    /// Per-event data, if held.
    pub fn events(&self) -> Option<&Array1<f64>> {
        self.events.as_ref()
    }

    /// Binned view for `binning`, if held.
    pub fn binned(&self, binning: &MultiDimBinning) -> Option<&Array1<f64>> {
        self.binned.get(&binning.fingerprint())
    }

    /// View for `representation`, if held.
    pub fn view(&self, representation: &Representation) -> Option<&Array1<f64>> {
        match representation {
            Representation::Events => self.events(),
            Representation::Binned(binning) => self.binned(binning),
        }
    }

    /// Number of binned views held.
    pub fn num_binned_views(&self) -> usize {
        self.binned.len()
    }

    pub(crate) fn set_current(&mut self, representation: Representation) {
        self.current = representation;
    }

    pub(crate) fn set_mode(&mut self, mode: TranslationMode) {
        if mode != self.mode && self.events.is_some() {
            self.binned.clear();
        }
        self.mode = mode;
    }

    pub(crate) fn store_binned(&mut self, binning: &MultiDimBinning, values: Array1<f64>) {
        self.binned.insert(binning.fingerprint(), values);
    }

    /// Drop binned views that can be recomputed from per-event data.
    pub(crate) fn drop_derived(&mut self) {
        if self.events.is_some() {
            self.binned.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::Dimension;
    use ndarray::array;

    fn binning() -> MultiDimBinning {
        MultiDimBinning::one_dim(Dimension::new("x", vec![0.0, 1.0, 2.0]).unwrap())
    }

    #[test]
    fn test_display() {
        assert_eq!(Representation::Events.to_string(), "events");
        assert!(Representation::from(binning()).to_string().contains('x'));
    }

    #[test]
    fn test_views() {
        let mut state = AttributeState::from_events(array![1.0, 2.0], TranslationMode::Sum);
        assert!(state.representation().is_events());
        assert!(state.binned(&binning()).is_none());

        state.store_binned(&binning(), array![3.0, 0.0]);
        state.set_current(Representation::Binned(binning()));
        assert_eq!(state.view(&Representation::Binned(binning())), Some(&array![3.0, 0.0]));
        assert_eq!(state.view(&Representation::Events), Some(&array![1.0, 2.0]));

        state.set_mode(TranslationMode::Average);
        assert_eq!(state.num_binned_views(), 0);
    }

    #[test]
    fn test_binned_only_state_keeps_views() {
        let mut state = AttributeState::from_binned(&binning(), array![1.0, 1.0], TranslationMode::Sum);
        assert!(state.events().is_none());
        state.drop_derived();
        state.set_mode(TranslationMode::Average);
        assert_eq!(state.num_binned_views(), 1);
    }
}
