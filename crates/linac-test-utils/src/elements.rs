//! Reusable element test fixtures.
//!
//! - [`CountingElement`]: records every call in a shared counter.
//! - [`PoisonElement`]: writes NaN into moment0 and trips the finiteness guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use linac_core::{ElementError, MomentState, Scope};
use linac_element::{ensure_finite, Element, ElementBase, ElementRegistry};

/// Adds its length to `pos` and counts calls in a shared counter.
pub struct CountingElement {
    base: ElementBase,
    pub length: f64,
    calls: Arc<AtomicUsize>,
}

impl Element for CountingElement {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn length(&self) -> f64 {
        self.length
    }

    fn advance(&self, state: &mut MomentState) -> Result<(), ElementError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        state.pos += self.length;
        Ok(())
    }
}

/// Corrupts moment0 of the first charge state with NaN.
pub struct PoisonElement {
    base: ElementBase,
}

impl Element for PoisonElement {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn advance(&self, state: &mut MomentState) -> Result<(), ElementError> {
        state.check_shape()?;
        state.moment0_env[0][0] = f64::NAN;
        ensure_finite(state)
    }
}

/// Register `counter` (parameter `L`, default 0, all instances sharing
/// `calls`) and `poison` on `registry`.
pub fn register_mocks(registry: &mut ElementRegistry, calls: Arc<AtomicUsize>) {
    registry.register("counter", move |scope: &Scope<'_>| {
        Ok(Box::new(CountingElement {
            base: ElementBase::from_config(scope.local()),
            length: scope.non_negative_or("L", 0.0)?,
            calls: Arc::clone(&calls),
        }) as Box<dyn Element>)
    });
    registry.register("poison", |scope: &Scope<'_>| {
        Ok(Box::new(PoisonElement {
            base: ElementBase::from_config(scope.local()),
        }) as Box<dyn Element>)
    });
}
