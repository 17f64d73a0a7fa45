//! Element defined directly by a user-supplied transfer matrix.

use linac_core::phase::{read_matrix, read_vector};
use linac_core::{ConfigError, ElementError, MomentState, Scope};
use linac_element::{transport, Element, ElementBase, Misalignment, TransferMap};

/// Key holding the element's own transfer matrix (row-major, 49 entries).
pub const TRANSFER_KEY: &str = "transfer";
/// Global default transfer matrix, used when `transfer` is absent.
pub const DEFAULT_TRANSFER_KEY: &str = "TM";

/// An arbitrary linear element: `T`, an optional offset, and a length.
#[derive(Clone, Debug)]
pub struct Generic {
    base: ElementBase,
    length: f64,
    map: TransferMap,
}

impl Generic {
    /// Registered type tag.
    pub const TYPE_NAME: &'static str = "generic";

    /// Read `L` (default 0), `transfer` (or the global `TM`), `offset`
    /// and the misalignment keys.
    pub fn from_scope(scope: &Scope<'_>) -> Result<Self, ConfigError> {
        let length = scope.non_negative_or("L", 0.0)?;
        let matrix = match read_matrix(scope, TRANSFER_KEY)? {
            Some(m) => m,
            None => read_matrix(scope, DEFAULT_TRANSFER_KEY)?.ok_or_else(|| {
                ConfigError::MissingKey {
                    key: TRANSFER_KEY.into(),
                }
            })?,
        };
        let mut map = TransferMap::new(matrix);
        if let Some(offset) = read_vector(scope, "offset")? {
            map = map.with_offset(offset);
        }
        let map = map.misaligned(&Misalignment::from_scope(scope)?);
        Ok(Self {
            base: ElementBase::from_config(scope.local()),
            length,
            map,
        })
    }
}

impl Element for Generic {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn length(&self) -> f64 {
        self.length
    }

    fn transfer(&self) -> Option<&TransferMap> {
        Some(&self.map)
    }

    fn advance(&self, state: &mut MomentState) -> Result<(), ElementError> {
        transport(state, self.length, &self.map)
    }
}
