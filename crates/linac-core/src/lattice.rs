//! Structured lattice declarations and line flattening.
//!
//! [`Lattice`] is the typed form of a lattice description: global
//! parameters, named element definitions, and named lines whose entries
//! refer to elements or to other lines. [`Lattice::into_config`] expands
//! the selected line into the flat, ordered element list a machine is
//! built from.
//!
//! ```
//! use linac_core::{Config, Lattice};
//!
//! let conf = Lattice::new()
//!     .global("IonEs", 930e6)
//!     .global("IonEk", 500e3)
//!     .element("elem0", "source", Config::new())
//!     .element("d1", "drift", Config::new().with("L", 0.5))
//!     .line("cell", ["d1", "d1"])
//!     .line("foo", ["elem0", "cell"])
//!     .into_config()
//!     .unwrap();
//! let names: Vec<&str> = conf
//!     .elements()
//!     .unwrap()
//!     .iter()
//!     .map(|e| e.require::<&str>("name").unwrap())
//!     .collect();
//! assert_eq!(names, ["elem0", "d1", "d1"]);
//! ```

use indexmap::IndexMap;

use crate::config::{Config, Value, ELEMENTS_KEY};
use crate::error::ConfigError;

/// Key holding an element's name.
pub const NAME_KEY: &str = "name";
/// Key holding an element's type tag.
pub const TYPE_KEY: &str = "type";

/// A lattice description prior to flattening.
#[derive(Clone, Debug, Default)]
pub struct Lattice {
    globals: Config,
    definitions: IndexMap<String, Config>,
    lines: IndexMap<String, Vec<String>>,
    use_line: Option<String>,
}

impl Lattice {
    /// An empty lattice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a global parameter.
    #[must_use]
    pub fn global(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key, value);
        self
    }

    /// Define (or redefine) a named element of the given type.
    #[must_use]
    pub fn element(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        params: Config,
    ) -> Self {
        let name = name.into();
        let mut def = Config::new()
            .with(NAME_KEY, name.as_str())
            .with(TYPE_KEY, type_name.into());
        for (k, v) in params.iter() {
            if k != NAME_KEY && k != TYPE_KEY {
                def.insert(k, v.clone());
            }
        }
        self.definitions.insert(name, def);
        self
    }

    /// Define a line: an ordered list of element or line names.
    #[must_use]
    pub fn line<I, S>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .insert(name.into(), entries.into_iter().map(Into::into).collect());
        self
    }

    /// Select which line to expand. Defaults to the last declared line.
    #[must_use]
    pub fn use_line(mut self, name: impl Into<String>) -> Self {
        self.use_line = Some(name.into());
        self
    }

    /// Flatten the selected line and produce the configuration mapping.
    ///
    /// Globals come first, in declaration order, followed by `elements`.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let selected = match &self.use_line {
            Some(name) if self.lines.contains_key(name) => name.clone(),
            Some(name) => {
                return Err(ConfigError::UndefinedLineEntry {
                    line: "USE".to_string(),
                    entry: name.clone(),
                })
            }
            None => self
                .lines
                .keys()
                .last()
                .cloned()
                .ok_or(ConfigError::NoLattice)?,
        };

        let mut flat = Vec::new();
        let mut stack = Vec::new();
        self.expand(&selected, &mut stack, &mut flat)?;

        let mut config = self.globals;
        config.insert(ELEMENTS_KEY, flat);
        Ok(config)
    }

    fn expand(
        &self,
        line: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<Config>,
    ) -> Result<(), ConfigError> {
        if stack.iter().any(|l| l == line) {
            return Err(ConfigError::RecursiveLine {
                line: line.to_string(),
            });
        }
        stack.push(line.to_string());
        for entry in self.lines.get(line).into_iter().flatten() {
            if let Some(def) = self.definitions.get(entry) {
                out.push(def.clone());
            } else if self.lines.contains_key(entry) {
                self.expand(entry, stack, out)?;
            } else {
                return Err(ConfigError::UndefinedLineEntry {
                    line: line.to_string(),
                    entry: entry.clone(),
                });
            }
        }
        stack.pop();
        Ok(())
    }
}
