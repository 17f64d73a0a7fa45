//! Field-free drift space.

use linac_core::{ConfigError, ElementError, MomentState, Scope};
use linac_element::{transport, Element, ElementBase, Misalignment, TransferMap};

/// Transverse free flight over length `L`.
///
/// Longitudinal coordinates pass through unchanged.
#[derive(Clone, Debug)]
pub struct Drift {
    base: ElementBase,
    length: f64,
    map: TransferMap,
}

impl Drift {
    /// Registered type tag.
    pub const TYPE_NAME: &'static str = "drift";

    /// Read `L` (required, non-negative) and the misalignment keys.
    pub fn from_scope(scope: &Scope<'_>) -> Result<Self, ConfigError> {
        let length: f64 = scope.require("L")?;
        if !length.is_finite() || length < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "L".into(),
                reason: format!("drift length must be finite and non-negative, got {length}"),
            });
        }
        let map = TransferMap::drift(length).misaligned(&Misalignment::from_scope(scope)?);
        Ok(Self {
            base: ElementBase::from_config(scope.local()),
            length,
            map,
        })
    }
}

impl Element for Drift {
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

#[cfg(test)]
mod tests {
    use super::*;
    use linac_core::{Config, PS_PX, PS_X};
    use linac_test_utils::states::two_state_beam;

    #[test]
    fn advances_position_and_shears_x() {
        let conf = Config::new().with("L", 0.5);
        let drift = Drift::from_scope(&conf.scope()).unwrap();
        let mut s = two_state_beam();
        let px = s.moment0_env[1][PS_PX];
        let x = s.moment0_env[1][PS_X];
        drift.advance(&mut s).unwrap();
        assert_eq!(s.pos, 0.5);
        assert_eq!(s.moment0_env[1][PS_X], x + 0.5 * px);
        assert_eq!(s.charge_states(), 2);
    }

    #[test]
    fn length_is_required_and_non_negative() {
        assert_eq!(
            Drift::from_scope(&Config::new().scope()).err(),
            Some(ConfigError::MissingKey { key: "L".into() })
        );
        let conf = Config::new().with("L", -1.0);
        assert!(matches!(
            Drift::from_scope(&conf.scope()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn exposes_its_map() {
        let conf = Config::new().with("L", 2.0).with("tilt", 0.1);
        let drift = Drift::from_scope(&conf.scope()).unwrap();
        let map = drift.transfer().unwrap();
        assert!(map.matrix.iter().all(|v| v.is_finite()));
        assert_eq!(drift.length(), 2.0);
    }
}
