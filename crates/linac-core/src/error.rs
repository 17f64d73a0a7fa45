//! Error types for the Linac envelope simulation framework.
//!
//! Organized by subsystem: configuration ingestion, machine construction,
//! state shape checks, per-element advance, and whole-lattice propagation.

use std::error::Error;
use std::fmt;

/// Errors from reading or validating a configuration mapping.
///
/// Raised at machine construction time; never during propagation.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A required key is absent from both the local and global scope.
    MissingKey {
        /// The key that was looked up.
        key: String,
    },
    /// A key is present but holds a value of the wrong kind.
    WrongType {
        /// The offending key.
        key: String,
        /// The kind the caller asked for (`"scalar"`, `"vector"`, ...).
        expected: &'static str,
        /// The kind actually stored.
        found: &'static str,
    },
    /// A vector or matrix has the wrong number of entries.
    ShapeMismatch {
        /// The offending key.
        key: String,
        /// Required entry count.
        expected: usize,
        /// Actual entry count.
        found: usize,
    },
    /// A value is present and well-typed but outside its valid domain.
    InvalidValue {
        /// The offending key.
        key: String,
        /// Description of the violated constraint.
        reason: String,
    },
    /// A moment1 matrix is not symmetric positive-semidefinite.
    NotPositiveSemidefinite {
        /// The key the matrix was read from.
        key: String,
        /// The most negative eigenvalue, or the largest asymmetry.
        detail: String,
    },
    /// A line references a name that is neither an element nor a line.
    UndefinedLineEntry {
        /// The line containing the reference.
        line: String,
        /// The unresolved name.
        entry: String,
    },
    /// A line (directly or indirectly) contains itself.
    RecursiveLine {
        /// The line at which the cycle was detected.
        line: String,
    },
    /// No line was declared, so there is no element sequence to build.
    NoLattice,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey { key } => write!(f, "missing required key '{key}'"),
            Self::WrongType {
                key,
                expected,
                found,
            } => write!(f, "key '{key}' must be a {expected}, found {found}"),
            Self::ShapeMismatch {
                key,
                expected,
                found,
            } => write!(f, "key '{key}' must have {expected} entries, found {found}"),
            Self::InvalidValue { key, reason } => write!(f, "invalid value for '{key}': {reason}"),
            Self::NotPositiveSemidefinite { key, detail } => {
                write!(f, "matrix '{key}' is not symmetric positive-semidefinite: {detail}")
            }
            Self::UndefinedLineEntry { line, entry } => {
                write!(f, "line '{line}' references undefined name '{entry}'")
            }
            Self::RecursiveLine { line } => write!(f, "line '{line}' contains itself"),
            Self::NoLattice => write!(f, "no line declared"),
        }
    }
}

impl Error for ConfigError {}

/// Errors from building a machine out of a configuration.
///
/// Construction is all-or-nothing: any of these means no machine exists.
#[derive(Clone, Debug, PartialEq)]
pub enum BuildError {
    /// The global configuration itself is malformed.
    Config(ConfigError),
    /// An element declares a type with no registered factory.
    UnknownElementType {
        /// Name of the declaring element.
        element: String,
        /// The unregistered type tag.
        type_name: String,
    },
    /// An element factory rejected its parameters.
    Element {
        /// Name of the element being built.
        element: String,
        /// The underlying configuration problem.
        reason: ConfigError,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::UnknownElementType { element, type_name } => {
                write!(f, "element '{element}' has unknown type '{type_name}'")
            }
            Self::Element { element, reason } => write!(f, "element '{element}': {reason}"),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Element { reason, .. } => Some(reason),
            Self::UnknownElementType { .. } => None,
        }
    }
}

impl From<ConfigError> for BuildError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// A state whose charge-state structure or initial values do not fit the
/// operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateShapeError {
    /// No charge states are tracked yet (C = 0); only a source may run.
    Uninitialized,
    /// A per-charge-state array disagrees with the charge-state count.
    LengthMismatch {
        /// Name of the mismatched field.
        field: &'static str,
        /// The charge-state count C.
        expected: usize,
        /// The array's actual length.
        found: usize,
    },
    /// Ensemble aggregation over a total population that is not positive.
    EmptyPopulation,
    /// Reference energy overrides that do not describe a physical particle.
    InvalidReference {
        /// The violated constraint.
        reason: String,
    },
}

impl fmt::Display for StateShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "state has no charge states"),
            Self::LengthMismatch {
                field,
                expected,
                found,
            } => write!(f, "field '{field}' has {found} entries, expected {expected}"),
            Self::EmptyPopulation => write!(f, "total charge-state population is not positive"),
            Self::InvalidReference { reason } => write!(f, "invalid reference energy: {reason}"),
        }
    }
}

impl Error for StateShapeError {}

/// Errors from a single element's `advance`.
///
/// Wrapped in [`PropagationError`] by the machine.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementError {
    /// The incoming state's charge-state structure is unusable.
    Shape(StateShapeError),
    /// A moment entry became NaN or infinite.
    NonFinite {
        /// `"moment0"` or `"moment1"`.
        quantity: &'static str,
        /// Index of the offending charge state.
        charge_state: usize,
    },
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(e) => write!(f, "state shape: {e}"),
            Self::NonFinite {
                quantity,
                charge_state,
            } => write!(f, "non-finite {quantity} in charge state {charge_state}"),
        }
    }
}

impl Error for ElementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shape(e) => Some(e),
            Self::NonFinite { .. } => None,
        }
    }
}

impl From<StateShapeError> for ElementError {
    fn from(e: StateShapeError) -> Self {
        Self::Shape(e)
    }
}

/// Errors from driving a state through the element sequence.
///
/// After `ElementFailed` the state's contents are undefined and the
/// caller must discard it.
#[derive(Clone, Debug, PartialEq)]
pub enum PropagationError {
    /// An element's `advance` failed; remaining elements were not run.
    ElementFailed {
        /// Position of the failing element in the sequence.
        index: usize,
        /// Name of the failing element.
        element: String,
        /// The underlying element error.
        reason: ElementError,
    },
    /// The requested start index lies past the end of the sequence.
    StartOutOfRange {
        /// The requested start.
        start: usize,
        /// Number of elements in the machine.
        len: usize,
    },
}

impl fmt::Display for PropagationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementFailed {
                index,
                element,
                reason,
            } => write!(f, "element {index} ('{element}') failed: {reason}"),
            Self::StartOutOfRange { start, len } => {
                write!(f, "start index {start} exceeds element count {len}")
            }
        }
    }
}

impl Error for PropagationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ElementFailed { reason, .. } => Some(reason),
            Self::StartOutOfRange { .. } => None,
        }
    }
}
