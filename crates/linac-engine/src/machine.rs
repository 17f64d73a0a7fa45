//! The machine: an ordered element sequence built from configuration.
//!
//! A [`Machine`] owns its effective configuration and its elements; it
//! never owns a beam state. States are independent values the caller
//! allocates and passes to [`propagate()`](Machine::propagate). The machine
//! is immutable after construction, so one machine may drive many states
//! concurrently.

use std::fmt;
use std::time::Instant;

use linac_core::{
    BuildError, Config, MomentState, PropagationError, StateInit, StateShapeError,
};
use linac_element::{Element, ElementRegistry};

use crate::builder::MachineBuilder;
use crate::metrics::{PropagateMetrics, PropagateResult};
use crate::observer::Observer;

/// An immutable lattice of elements plus the configuration it came from.
pub struct Machine {
    conf: Config,
    elements: Vec<Box<dyn Element>>,
}

impl Machine {
    /// Build from `conf` with the reference element types and no overrides.
    ///
    /// All-or-nothing: the first element that fails to build aborts
    /// construction.
    pub fn new(conf: Config) -> Result<Self, BuildError> {
        Self::builder(conf).build()
    }

    /// Start a [`MachineBuilder`] for overrides or a custom registry.
    pub fn builder(conf: Config) -> MachineBuilder {
        MachineBuilder::new(conf)
    }

    pub(crate) fn from_registry(
        conf: Config,
        registry: &ElementRegistry,
    ) -> Result<Self, BuildError> {
        let elements = conf
            .elements()?
            .iter()
            .map(|decl| registry.build(decl, &conf))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(elements = elements.len(), "constructed machine");
        Ok(Self { conf, elements })
    }

    /// The effective (post-override) configuration.
    pub fn conf(&self) -> &Config {
        &self.conf
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the machine has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element at `index`.
    pub fn element(&self, index: usize) -> Option<&dyn Element> {
        self.elements.get(index).map(|e| e.as_ref())
    }

    /// Iterate elements in lattice order.
    pub fn elements(&self) -> impl Iterator<Item = &dyn Element> {
        self.elements.iter().map(|e| e.as_ref())
    }

    /// Indices of every element named `name`.
    pub fn find(&self, name: &str) -> Vec<usize> {
        self.positions(|e| e.name() == name)
    }

    /// Indices of every element of type `type_name`.
    pub fn find_by_type(&self, type_name: &str) -> Vec<usize> {
        self.positions(|e| e.type_name() == type_name)
    }

    fn positions(&self, pred: impl Fn(&dyn Element) -> bool) -> Vec<usize> {
        self.elements()
            .enumerate()
            .filter(|(_, e)| pred(*e))
            .map(|(i, _)| i)
            .collect()
    }

    /// A fresh state: zeroed, C = 0 unless `init` supplies arrays.
    ///
    /// Independent of the element sequence.
    pub fn alloc_state(&self, init: &StateInit) -> Result<MomentState, StateShapeError> {
        MomentState::fresh(init)
    }

    /// A state carrying over `prev`'s charge-state structure.
    pub fn alloc_state_inheriting(
        &self,
        prev: &MomentState,
        init: &StateInit,
    ) -> Result<MomentState, StateShapeError> {
        MomentState::inheriting_shape_from(prev, init)
    }

    /// Advance `state` through elements `[start, start + max)`, clamped to
    /// the end of the lattice. `max = None` runs to the end.
    ///
    /// `start == len()` is a no-op. On error the state must be discarded.
    pub fn propagate(
        &self,
        state: &mut MomentState,
        start: usize,
        max: Option<usize>,
    ) -> Result<PropagateResult, PropagationError> {
        self.propagate_observed(state, start, max, &mut |_: usize, _: &MomentState| {})
    }

    /// [`propagate()`](Machine::propagate), showing `observer` the state
    /// after each element.
    pub fn propagate_observed(
        &self,
        state: &mut MomentState,
        start: usize,
        max: Option<usize>,
        observer: &mut dyn Observer,
    ) -> Result<PropagateResult, PropagationError> {
        let len = self.elements.len();
        if start > len {
            return Err(PropagationError::StartOutOfRange { start, len });
        }
        let end = max.map_or(len, |max| start.saturating_add(max).min(len));
        tracing::debug!(start, end, pos = state.pos, "propagation started");

        let call_start = Instant::now();
        let mut element_us = Vec::with_capacity(end - start);
        for (index, element) in self.elements[start..end]
            .iter()
            .enumerate()
            .map(|(i, e)| (start + i, e))
        {
            let element_start = Instant::now();
            if let Err(reason) = element.advance(state) {
                tracing::warn!(
                    index,
                    element = element.name(),
                    error = %reason,
                    "element advance failed"
                );
                return Err(PropagationError::ElementFailed {
                    index,
                    element: element.name().to_string(),
                    reason,
                });
            }
            element_us.push((
                element.name().to_string(),
                element_start.elapsed().as_micros() as u64,
            ));
            tracing::trace!(index, element = element.name(), pos = state.pos, "advanced");
            observer.view(index, state);
        }

        let metrics = PropagateMetrics {
            total_us: call_start.elapsed().as_micros() as u64,
            element_us,
        };
        tracing::debug!(steps = end - start, pos = state.pos, "propagation finished");
        Ok(PropagateResult {
            steps: end - start,
            metrics,
        })
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("conf_keys", &self.conf.len())
            .field(
                "elements",
                &self
                    .elements()
                    .map(|e| (e.name(), e.type_name()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
