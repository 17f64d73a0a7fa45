//! Element trait, transfer-map engine, and element registry for Linac.
//!
//! The [`Element`] trait is the extension point for lattice physics: one
//! `advance` method per element kind, registered by type tag in an
//! [`ElementRegistry`]. [`TransferMap`] and [`transport`] provide the linear
//! moment transformation shared by every non-source element.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod registry;
pub mod transfer;

pub use element::{Element, ElementBase};
pub use registry::{ElementFactory, ElementRegistry};
pub use transfer::{ensure_finite, transport, Misalignment, TransferMap};
