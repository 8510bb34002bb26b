//! Event samples and the containers that hold their attributes.

pub mod container;
pub mod representation;
pub mod sample;

pub use container::Container;
pub use representation::{AttributeState, Representation};
pub use sample::{Sample, SampleKey};
