//! Bin edge definitions.
//!
//! A [`Dimension`] is a named, immutable, strictly increasing edge array; a
//! [`MultiDimBinning`] orders several of them and defines the row-major flat
//! bin index used by every histogram in the crate.

pub mod dimension;
pub mod multi;

pub use dimension::{locate, Dimension};
pub use multi::MultiDimBinning;
