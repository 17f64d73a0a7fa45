//! Type-tag → factory catalog for building elements.
//!
//! New element kinds are added by registering a factory under their type
//! tag; a machine never needs to know the concrete types it holds.

use std::fmt;

use indexmap::IndexMap;
use linac_core::{BuildError, Config, ConfigError, Scope, NAME_KEY, TYPE_KEY};

use crate::element::Element;

/// A function building one element from its parameter scope.
///
/// The scope resolves keys in the element's own mapping first, then in the
/// global configuration.
pub type ElementFactory =
    dyn Fn(&Scope<'_>) -> Result<Box<dyn Element>, ConfigError> + Send + Sync;

/// Registered element factories, in registration order.
#[derive(Default)]
pub struct ElementRegistry {
    factories: IndexMap<String, Box<ElementFactory>>,
}

impl ElementRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `type_name`, replacing any previous one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&Scope<'_>) -> Result<Box<dyn Element>, ConfigError> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self
            .factories
            .insert(type_name.clone(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(type_name = %type_name, "replaced element factory");
        }
    }

    /// Builder-style [`register`](ElementRegistry::register).
    #[must_use]
    pub fn with<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Scope<'_>) -> Result<Box<dyn Element>, ConfigError> + Send + Sync + 'static,
    {
        self.register(type_name, factory);
        self
    }

    /// Whether a factory exists for `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type tags, in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build the element described by `element`, with `global` as fallback
    /// scope for its parameters.
    pub fn build(&self, element: &Config, global: &Config) -> Result<Box<dyn Element>, BuildError> {
        let name = element
            .lookup::<&str>(NAME_KEY)
            .ok()
            .flatten()
            .unwrap_or_default();
        let type_name: &str = element.require(TYPE_KEY).map_err(|reason| BuildError::Element {
            element: name.to_string(),
            reason,
        })?;
        let factory =
            self.factories
                .get(type_name)
                .ok_or_else(|| BuildError::UnknownElementType {
                    element: name.to_string(),
                    type_name: type_name.to_string(),
                })?;
        let built = factory(&element.scope_within(global)).map_err(|reason| BuildError::Element {
            element: name.to_string(),
            reason,
        })?;
        tracing::trace!(element = name, type_name, "built element");
        Ok(built)
    }
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
