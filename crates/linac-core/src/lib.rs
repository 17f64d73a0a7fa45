//! Core types for the Linac envelope simulation framework.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! configuration model, lattice flattening, phase-space algebra, particle
//! kinematics, the moment state that elements advance, ensemble readout,
//! and every error type used across the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod ensemble;
pub mod error;
pub mod kinematics;
pub mod lattice;
pub mod phase;
pub mod state;

pub use config::{Config, FromValue, LayeredConfig, Scope, Value, ELEMENTS_KEY};
pub use ensemble::{Ensemble, Moment1Rule, ParallelAxis};
pub use error::{BuildError, ConfigError, ElementError, PropagationError, StateShapeError};
pub use kinematics::Kinematics;
pub use lattice::{Lattice, NAME_KEY, TYPE_KEY};
pub use phase::{
    PhaseMatrix, PhaseVector, PS_DIM, PS_HOM, PS_PS, PS_PX, PS_PY, PS_S, PS_X, PS_Y,
};
pub use state::{ChargeVec, MomentState, StateInit};
