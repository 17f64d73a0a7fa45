//! Test utilities and mock elements for Linac development.
//!
//! - [`elements`]: mock [`Element`](linac_element::Element) implementations
//!   and factories for registering them.
//! - [`lattices`]: the reference single- and multi-charge-state lattices.
//! - [`states`]: ready-made beam states.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod elements;
pub mod lattices;
pub mod states;
