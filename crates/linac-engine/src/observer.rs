//! Observing the state between elements.
//!
//! An [`Observer`] is handed the state after every element that advances
//! successfully. Closures `FnMut(usize, &MomentState)` are observers, and
//! [`Recorder`] keeps copies of the state at chosen element indices.

use linac_core::MomentState;

/// Receives the state after each successfully advanced element.
pub trait Observer {
    /// `index` is the element's position in the machine.
    fn view(&mut self, index: usize, state: &MomentState);
}

impl<F: FnMut(usize, &MomentState)> Observer for F {
    fn view(&mut self, index: usize, state: &MomentState) {
        self(index, state)
    }
}

/// Records snapshots of the state after selected elements.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    indices: Option<Vec<usize>>,
    states: Vec<(usize, MomentState)>,
}

impl Recorder {
    /// Record after every element.
    pub fn all() -> Self {
        Self::default()
    }

    /// Record only after the elements at `indices`.
    pub fn at(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: Some(indices.into_iter().collect()),
            states: Vec::new(),
        }
    }

    /// Recorded `(element index, state)` pairs, in propagation order.
    pub fn states(&self) -> &[(usize, MomentState)] {
        &self.states
    }

    /// Consume the recorder, returning its snapshots.
    pub fn into_states(self) -> Vec<(usize, MomentState)> {
        self.states
    }
}

impl Observer for Recorder {
    fn view(&mut self, index: usize, state: &MomentState) {
        let wanted = match &self.indices {
            Some(indices) => indices.contains(&index),
            None => true,
        };
        if wanted {
            self.states.push((index, state.clone()));
        }
    }
}
