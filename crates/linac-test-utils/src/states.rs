//! Ready-made beam states.

use linac_core::{MomentState, PhaseMatrix, PhaseVector, StateInit};

use crate::lattices::{block_ones, centroid};

/// The state a two-charge-state source produces: charges (42, 43),
/// populations (1000, 1010), unit reference energies.
pub fn two_state_beam() -> MomentState {
    let init = StateInit::new()
        .reference(1.0, 1.0)
        .ion_z([42.0, 43.0])
        .ion_q([1000.0, 1010.0])
        .moment0([
            PhaseVector::from_column_slice(&centroid(1.0)),
            PhaseVector::from_column_slice(&centroid(2.0)),
        ])
        .moment1([
            PhaseMatrix::from_row_slice(&block_ones(0.0)),
            PhaseMatrix::from_row_slice(&block_ones(1.0)),
        ]);
    MomentState::fresh(&init).expect("two-state fixture is well-formed")
}
