//! Zero-length marker element.

use linac_core::{ConfigError, ElementError, MomentState, Scope};
use linac_element::{ensure_finite, Element, ElementBase};

/// Identity element with no length, used to name lattice positions.
///
/// Still requires an initialized state, so a marker placed before the
/// source fails the same way any other element would.
#[derive(Clone, Debug)]
pub struct Marker {
    base: ElementBase,
}

impl Marker {
    /// Registered type tag.
    pub const TYPE_NAME: &'static str = "marker";

    /// A marker takes no parameters.
    pub fn from_scope(scope: &Scope<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            base: ElementBase::from_config(scope.local()),
        })
    }
}

impl Element for Marker {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn advance(&self, state: &mut MomentState) -> Result<(), ElementError> {
        state.check_shape()?;
        ensure_finite(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linac_core::{Config, StateInit, StateShapeError, NAME_KEY};
    use linac_test_utils::states::two_state_beam;

    #[test]
    fn leaves_state_untouched() {
        let conf = Config::new().with(NAME_KEY, "m1");
        let marker = Marker::from_scope(&conf.scope()).unwrap();
        let mut s = two_state_beam();
        let before = s.clone();
        marker.advance(&mut s).unwrap();
        assert_eq!(s, before);
        assert_eq!(marker.name(), "m1");
        assert_eq!(marker.length(), 0.0);
    }

    #[test]
    fn requires_initialized_state() {
        let marker = Marker::from_scope(&Config::new().scope()).unwrap();
        let mut s = MomentState::fresh(&StateInit::new()).unwrap();
        assert_eq!(
            marker.advance(&mut s),
            Err(ElementError::Shape(StateShapeError::Uninitialized))
        );
    }
}
