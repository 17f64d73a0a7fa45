//! Two-layer machine construction.

use linac_core::{BuildError, Config, LayeredConfig, Value};
use linac_element::ElementRegistry;
use linac_elements::default_registry;

use crate::machine::Machine;

/// Collects overrides and a registry, then builds a [`Machine`].
///
/// Overrides are merged over the base configuration once, in
/// [`build()`](MachineBuilder::build); the merged mapping is what
/// [`Machine::conf`] returns.
///
/// ```
/// use linac_core::Lattice;
/// use linac_core::Config;
/// use linac_engine::Machine;
///
/// let conf = Lattice::new()
///     .global("IonEs", 1.0)
///     .global("IonEk", 1.0)
///     .global("IonChargeStates", [42.0, 43.0])
///     .global("NCharge", [1000.0, 1010.0])
///     .element("elem0", "source", Config::new())
///     .line("foo", ["elem0"])
///     .into_config()
///     .unwrap();
/// let machine = Machine::builder(conf).extra("cstate", 1.0).build().unwrap();
/// assert_eq!(machine.conf().require::<f64>("cstate").unwrap(), 1.0);
/// ```
#[derive(Debug)]
#[must_use]
pub struct MachineBuilder {
    layers: LayeredConfig,
    registry: Option<ElementRegistry>,
}

impl MachineBuilder {
    /// Start from a base configuration.
    pub fn new(conf: Config) -> Self {
        Self {
            layers: LayeredConfig::new(conf),
            registry: None,
        }
    }

    /// Override one key.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.layers = self.layers.extra(key, value);
        self
    }

    /// Override every key in `overrides`.
    pub fn extend(mut self, overrides: &Config) -> Self {
        self.layers = self.layers.extend(overrides);
        self
    }

    /// Build elements from `registry` instead of the reference types.
    pub fn registry(mut self, registry: ElementRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Merge the layers and build every element.
    pub fn build(self) -> Result<Machine, BuildError> {
        let conf = self.layers.build();
        match &self.registry {
            Some(registry) => Machine::from_registry(conf, registry),
            None => Machine::from_registry(conf, &default_registry()),
        }
    }
}
