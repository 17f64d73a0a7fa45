//! Linac: moment-envelope beam transport through linear accelerator lattices.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Linac sub-crates. For most users, adding `linac` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use linac::prelude::*;
//!
//! // A 1 mm / 1 mrad offset beam with a diagonal envelope.
//! let mut sigma = [0.0; 49];
//! for d in 0..6 {
//!     sigma[d * 7 + d] = 1e-6;
//! }
//! let conf = Lattice::new()
//!     .global("IonEs", 931.49e6)
//!     .global("IonEk", 500e3)
//!     .element(
//!         "src",
//!         "source",
//!         Config::new()
//!             .with("moment0", [1e-3, 1e-3, 0.0, 0.0, 0.0, 0.0, 1.0])
//!             .with("initial", sigma),
//!     )
//!     .element("d1", "drift", Config::new().with("L", 2.0))
//!     .line("main", ["src", "d1"])
//!     .into_config()
//!     .unwrap();
//!
//! let machine = Machine::new(conf).unwrap();
//! let mut state = machine.alloc_state(&StateInit::new()).unwrap();
//! let result = machine.propagate(&mut state, 0, None).unwrap();
//!
//! assert_eq!(result.steps, 2);
//! assert_eq!(state.pos, 2.0);
//! assert_eq!(state.charge_states(), 1);
//! assert!((state.moment0_env[0][0] - 3e-3).abs() < 1e-15);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `linac-core` | Configuration, lattices, kinematics, moment state, errors |
//! | [`element`] | `linac-element` | Element trait, transfer maps, element registry |
//! | [`elements`] | `linac-elements` | Built-in elements (source, drift, generic, marker) |
//! | [`engine`] | `linac-engine` | Machine construction and propagation |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`linac-core`).
///
/// Contains the configuration mapping, lattice flattening, reference
/// kinematics, the per-charge-state [`types::MomentState`] and the
/// error types.
pub use linac_core as types;

/// Element trait and transfer-map engine (`linac-element`).
///
/// The [`element::Element`] trait is the main extension point for
/// user-defined beamline physics.
pub use linac_element as element;

/// Built-in element implementations (`linac-elements`).
///
/// Includes [`elements::Source`], [`elements::Drift`],
/// [`elements::Generic`] and [`elements::Marker`].
pub use linac_elements as elements;

/// Machine construction and propagation (`linac-engine`).
///
/// [`engine::Machine`] owns the element sequence;
/// [`engine::MachineBuilder`] layers overrides and picks a registry.
pub use linac_engine as engine;

/// Common imports for typical Linac usage.
///
/// ```rust
/// use linac::prelude::*;
/// ```
///
/// This imports the most frequently used types: configuration and lattice
/// builders, the beam state, the element trait, and the machine.
pub mod prelude {
    // Configuration and state
    pub use linac_core::{
        Config, Ensemble, Kinematics, Lattice, MomentState, ParallelAxis, PhaseMatrix,
        PhaseVector, StateInit, Value,
    };

    // Errors
    pub use linac_core::{BuildError, ConfigError, ElementError, PropagationError, StateShapeError};

    // Elements
    pub use linac_element::{Element, ElementBase, ElementRegistry, Misalignment, TransferMap};
    pub use linac_elements::default_registry;

    // Engine
    pub use linac_engine::{
        Machine, MachineBuilder, Observer, PropagateMetrics, PropagateResult, Recorder,
    };
}
