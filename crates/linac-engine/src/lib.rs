//! Machine construction and state propagation for Linac lattices.
//!
//! [`Machine`] owns an ordered element sequence built from a configuration
//! mapping and drives caller-owned [`MomentState`](linac_core::MomentState)s
//! through it. [`MachineBuilder`] layers caller overrides over the base
//! configuration and selects the element registry.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod machine;
pub mod metrics;
pub mod observer;

pub use builder::MachineBuilder;
pub use machine::Machine;
pub use metrics::{PropagateMetrics, PropagateResult};
pub use observer::{Observer, Recorder};
