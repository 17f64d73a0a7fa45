//! The [`Element`] trait and the identity every element carries.
//!
//! Elements are built once from configuration and are immutable thereafter.
//! Each one advances a [`MomentState`] in place by exactly one step of the
//! lattice.

use linac_core::{Config, ElementError, MomentState, NAME_KEY, TYPE_KEY};

use crate::transfer::TransferMap;

/// Name, type tag and local parameters of a built element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementBase {
    name: String,
    type_name: String,
    params: Config,
}

impl ElementBase {
    /// An element identity with no parameters.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            params: Config::new(),
        }
    }

    /// Take name, type and parameters from an element's own mapping.
    ///
    /// Absent or non-string `name`/`type` entries become empty strings.
    pub fn from_config(conf: &Config) -> Self {
        let text = |key: &str| conf.lookup::<&str>(key).ok().flatten().unwrap_or_default();
        Self {
            name: text(NAME_KEY).to_string(),
            type_name: text(TYPE_KEY).to_string(),
            params: conf.clone(),
        }
    }

    /// Element name as declared in the lattice.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered type tag.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The element's own parameter mapping (no global fallback).
    pub fn params(&self) -> &Config {
        &self.params
    }
}

/// One lattice element: a transfer map over the beam state.
///
/// # Contract
///
/// - `advance()` adds [`length()`](Element::length) to `state.pos`.
/// - Every charge state is transformed independently; C never changes,
///   except in a source element, which is the only place C is established.
/// - On error the state's contents are undefined.
///
/// # Object safety
///
/// This trait is object-safe; a machine stores its elements as
/// `Vec<Box<dyn Element>>` and may be shared across threads.
///
/// # Examples
///
/// ```
/// use linac_core::{ElementError, MomentState};
/// use linac_element::{transport, Element, ElementBase, TransferMap};
///
/// struct Shift {
///     base: ElementBase,
///     map: TransferMap,
/// }
///
/// impl Element for Shift {
///     fn base(&self) -> &ElementBase { &self.base }
///     fn length(&self) -> f64 { 1.0 }
///     fn advance(&self, state: &mut MomentState) -> Result<(), ElementError> {
///         transport(state, self.length(), &self.map)
///     }
/// }
///
/// let e = Shift {
///     base: ElementBase::new("s1", "shift"),
///     map: TransferMap::drift(1.0),
/// };
/// assert_eq!(e.name(), "s1");
/// assert_eq!(e.type_name(), "shift");
/// ```
pub trait Element: Send + Sync {
    /// Identity and parameters.
    fn base(&self) -> &ElementBase;

    /// Element name, for error reporting and lookup.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Registered type tag.
    fn type_name(&self) -> &str {
        self.base().type_name()
    }

    /// The element's own parameter mapping.
    fn params(&self) -> &Config {
        self.base().params()
    }

    /// Physical length. Zero for markers and sources.
    fn length(&self) -> f64 {
        0.0
    }

    /// The linear map this element applies, if it has a fixed one.
    fn transfer(&self) -> Option<&TransferMap> {
        None
    }

    /// Advance `state` through this element.
    fn advance(&self, state: &mut MomentState) -> Result<(), ElementError>;
}
