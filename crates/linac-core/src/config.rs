//! The configuration model: an ordered key→value mapping.
//!
//! A [`Config`] is produced once by whatever loads the lattice description
//! and is read-only thereafter. Element parameters are read through a
//! [`Scope`], which falls back from the element's own mapping to the global
//! one. [`LayeredConfig`] merges caller overrides over a base mapping
//! exactly once, before a machine is built.

use indexmap::IndexMap;

use crate::error::ConfigError;

/// Key under which the flattened element sequence is stored.
pub const ELEMENTS_KEY: &str = "elements";

// ── Value ──────────────────────────────────────────────────────────

/// A single configuration value.
///
/// Matrices are stored row-major as [`Value::Vector`] and reshaped on read.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A real number.
    Scalar(f64),
    /// A string (type tags, variable names).
    Str(String),
    /// A flat numeric array.
    Vector(Vec<f64>),
    /// A nested sequence of mappings (the element list).
    Elements(Vec<Config>),
}

impl Value {
    /// Human-readable name of this value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Str(_) => "string",
            Self::Vector(_) => "vector",
            Self::Elements(_) => "element list",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Scalar(f64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Scalar(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Self::Vector(v.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        Self::Vector(v.to_vec())
    }
}

impl From<Vec<Config>> for Value {
    fn from(v: Vec<Config>) -> Self {
        Self::Elements(v)
    }
}

// ── Typed extraction ───────────────────────────────────────────────

/// Types that can be borrowed out of a [`Value`].
pub trait FromValue<'a>: Sized {
    /// Kind name reported in [`ConfigError::WrongType`].
    const KIND: &'static str;

    /// Borrow the value as `Self`, or `None` if the kind differs.
    fn from_value(value: &'a Value) -> Option<Self>;
}

impl<'a> FromValue<'a> for f64 {
    const KIND: &'static str = "scalar";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for &'a str {
    const KIND: &'static str = "string";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for &'a [f64] {
    const KIND: &'static str = "vector";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Vector(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for &'a [Config] {
    const KIND: &'static str = "element list";

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Elements(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

fn extract<'a, T: FromValue<'a>>(key: &str, value: &'a Value) -> Result<T, ConfigError> {
    T::from_value(value).ok_or_else(|| ConfigError::WrongType {
        key: key.to_string(),
        expected: T::KIND,
        found: value.kind(),
    })
}

// ── Config ─────────────────────────────────────────────────────────

/// An insertion-ordered mapping of configuration keys to values.
///
/// Keys are unique; inserting an existing key replaces its value in place
/// without changing its position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    values: IndexMap<String, Value>,
}

impl Config {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the mapping has no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Typed lookup of a required key.
    pub fn require<'a, T: FromValue<'a>>(&'a self, key: &str) -> Result<T, ConfigError> {
        self.scope().require(key)
    }

    /// Typed lookup of an optional key.
    pub fn lookup<'a, T: FromValue<'a>>(&'a self, key: &str) -> Result<Option<T>, ConfigError> {
        self.scope().lookup(key)
    }

    /// The element sequence, in declaration order.
    ///
    /// An absent `elements` key is an empty sequence.
    pub fn elements(&self) -> Result<&[Config], ConfigError> {
        Ok(self.lookup::<&[Config]>(ELEMENTS_KEY)?.unwrap_or(&[]))
    }

    /// A scope over this mapping with no parent.
    pub fn scope(&self) -> Scope<'_> {
        Scope {
            local: self,
            global: None,
        }
    }

    /// A scope over `self` that falls back to `global`.
    pub fn scope_within<'a>(&'a self, global: &'a Config) -> Scope<'a> {
        Scope {
            local: self,
            global: Some(global),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (k, v) in iter {
            config.insert(k, v);
        }
        config
    }
}

// ── Scope ──────────────────────────────────────────────────────────

/// Read view over an element's parameters with fallback to globals.
///
/// A key missing from the element's own mapping is looked up in the global
/// mapping, so an element may name a global variable (e.g. `IV0`) or rely
/// on a global default (e.g. `IonEk`).
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    local: &'a Config,
    global: Option<&'a Config>,
}

impl<'a> Scope<'a> {
    /// Raw lookup: local first, then global.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.local
            .get(key)
            .or_else(|| self.global.and_then(|g| g.get(key)))
    }

    /// Whether `key` resolves in either layer.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The element-local mapping.
    pub fn local(&self) -> &'a Config {
        self.local
    }

    /// Typed lookup of an optional key.
    ///
    /// `Ok(None)` if absent; `Err(WrongType)` if present with another kind.
    pub fn lookup<T: FromValue<'a>>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get(key).map(|v| extract(key, v)).transpose()
    }

    /// Typed lookup of a required key.
    pub fn require<T: FromValue<'a>>(&self, key: &str) -> Result<T, ConfigError> {
        self.lookup(key)?.ok_or_else(|| ConfigError::MissingKey {
            key: key.to_string(),
        })
    }

    /// Scalar lookup with a default for absent keys.
    pub fn scalar_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        Ok(self.lookup::<f64>(key)?.unwrap_or(default))
    }

    /// String lookup with a default for absent keys.
    pub fn str_or(&self, key: &str, default: &'a str) -> Result<&'a str, ConfigError> {
        Ok(self.lookup::<&str>(key)?.unwrap_or(default))
    }

    /// A required vector of exactly `len` entries.
    pub fn vector_of(&self, key: &str, len: usize) -> Result<&'a [f64], ConfigError> {
        let v: &[f64] = self.require(key)?;
        check_len(key, v, len)
    }

    /// An optional non-negative integer index stored as a scalar.
    pub fn index(&self, key: &str) -> Result<Option<usize>, ConfigError> {
        match self.lookup::<f64>(key)? {
            None => Ok(None),
            Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as usize)),
            Some(v) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a non-negative integer, got {v}"),
            }),
        }
    }

    /// An optional scalar that must be finite and non-negative.
    pub fn non_negative_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        let v = self.scalar_or(key, default)?;
        if !v.is_finite() || v < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("must be finite and non-negative, got {v}"),
            });
        }
        Ok(v)
    }
}

pub(crate) fn check_len<'v>(
    key: &str,
    values: &'v [f64],
    len: usize,
) -> Result<&'v [f64], ConfigError> {
    if values.len() != len {
        return Err(ConfigError::ShapeMismatch {
            key: key.to_string(),
            expected: len,
            found: values.len(),
        });
    }
    Ok(values)
}

// ── LayeredConfig ──────────────────────────────────────────────────

/// Two-layer configuration: a base mapping plus caller overrides.
///
/// [`build()`](LayeredConfig::build) merges the layers once. Overridden
/// keys keep their base position; new keys are appended in override order.
#[derive(Clone, Debug, Default)]
pub struct LayeredConfig {
    base: Config,
    extra: Config,
}

impl LayeredConfig {
    /// Start from a base mapping with no overrides.
    pub fn new(base: Config) -> Self {
        Self {
            base,
            extra: Config::new(),
        }
    }

    /// Add one override.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Add every entry of `overrides` as an override.
    #[must_use]
    pub fn extend(mut self, overrides: &Config) -> Self {
        for (k, v) in overrides.iter() {
            self.extra.insert(k, v.clone());
        }
        self
    }

    /// The pending overrides.
    pub fn overrides(&self) -> &Config {
        &self.extra
    }

    /// Merge overrides over the base, consuming both layers.
    pub fn build(self) -> Config {
        let Self { mut base, extra } = self;
        for (key, value) in extra.values {
            let replaced = base.insert(key.clone(), value).is_some();
            tracing::debug!(key = %key, replaced, "applied configuration override");
        }
        base
    }
}
