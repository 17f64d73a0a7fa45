//! Reference lattice elements for the Linac envelope simulation framework.
//!
//! | Type tag | Element | Length | Map |
//! |----------|---------|--------|-----|
//! | `source` | [`Source`] | 0 | overwrites the state |
//! | `marker` | [`Marker`] | 0 | identity |
//! | `drift` | [`Drift`] | `L` | transverse free flight |
//! | `generic` | [`Generic`] | `L` (default 0) | user matrix `transfer` / `TM` |
//!
//! Every non-source element also accepts the misalignment keys `dx`, `dy`
//! and `tilt`. [`default_registry`] registers all four.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod drift;
pub mod generic;
pub mod marker;
pub mod source;

pub use drift::Drift;
pub use generic::Generic;
pub use marker::Marker;
pub use source::Source;

use linac_core::ConfigError;
use linac_element::{Element, ElementRegistry};

/// A registry with every reference element type.
pub fn default_registry() -> ElementRegistry {
    ElementRegistry::new()
        .with(Source::TYPE_NAME, |scope| boxed(Source::from_scope(scope)))
        .with(Marker::TYPE_NAME, |scope| boxed(Marker::from_scope(scope)))
        .with(Drift::TYPE_NAME, |scope| boxed(Drift::from_scope(scope)))
        .with(Generic::TYPE_NAME, |scope| boxed(Generic::from_scope(scope)))
}

fn boxed<E: Element + 'static>(
    built: Result<E, ConfigError>,
) -> Result<Box<dyn Element>, ConfigError> {
    Ok(Box::new(built?))
}
