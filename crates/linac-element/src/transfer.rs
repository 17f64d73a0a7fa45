//! The linear transfer-map engine.
//!
//! A [`TransferMap`] acts on each charge state's moments as
//! `moment0' = T·moment0 + offset` and `moment1' = T·moment1·Tᵀ`.
//! [`transport`] wraps one application with the shape check, the position
//! update and the finiteness guard every non-source element needs.

use linac_core::phase::{matrix_is_finite, vector_is_finite};
use linac_core::{
    ConfigError, ElementError, MomentState, PhaseMatrix, PhaseVector, Scope, PS_HOM, PS_PX,
    PS_PY, PS_X, PS_Y,
};

// ── TransferMap ────────────────────────────────────────────────────

/// A linear map with an optional additive offset on moment0.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferMap {
    /// The D×D transfer matrix.
    pub matrix: PhaseMatrix,
    /// Added to moment0 after the matrix product.
    pub offset: Option<PhaseVector>,
}

impl Default for TransferMap {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransferMap {
    /// The identity map.
    pub fn identity() -> Self {
        Self::new(PhaseMatrix::identity())
    }

    /// A purely linear map.
    pub fn new(matrix: PhaseMatrix) -> Self {
        Self {
            matrix,
            offset: None,
        }
    }

    /// Transverse free flight over `length`: `x += L·px`, `y += L·py`.
    pub fn drift(length: f64) -> Self {
        let mut m = PhaseMatrix::identity();
        m[(PS_X, PS_PX)] = length;
        m[(PS_Y, PS_PY)] = length;
        Self::new(m)
    }

    /// The same map with an additive moment0 offset.
    #[must_use]
    pub fn with_offset(mut self, offset: PhaseVector) -> Self {
        self.offset = Some(offset);
        self
    }

    /// This map conjugated by `misalignment`: `M·T·M⁻¹`.
    ///
    /// The offset is carried into the misaligned frame as `M·offset`.
    #[must_use]
    pub fn misaligned(self, misalignment: &Misalignment) -> Self {
        if misalignment.is_none() {
            return self;
        }
        let m = misalignment.matrix();
        Self {
            matrix: m * self.matrix * misalignment.inverse(),
            offset: self.offset.map(|o| m * o),
        }
    }

    /// Apply to every charge state of `state`.
    ///
    /// Does not check shape or finiteness; see [`transport`].
    pub fn apply(&self, state: &mut MomentState) {
        let t = &self.matrix;
        let tt = t.transpose();
        for (m0, m1) in state
            .moment0_env
            .iter_mut()
            .zip(state.moment1_env.iter_mut())
        {
            *m0 = t * *m0;
            if let Some(offset) = &self.offset {
                *m0 += offset;
            }
            *m1 = t * *m1 * tt;
        }
    }
}

// ── Misalignment ───────────────────────────────────────────────────

/// Transverse offset and roll of an element relative to the beam axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Misalignment {
    /// Horizontal offset.
    pub dx: f64,
    /// Vertical offset.
    pub dy: f64,
    /// Roll about the beam axis, radians.
    pub tilt: f64,
}

impl Misalignment {
    /// Read `dx`, `dy` and `tilt` (all default 0, all finite).
    pub fn from_scope(scope: &Scope<'_>) -> Result<Self, ConfigError> {
        let finite = |key: &str| -> Result<f64, ConfigError> {
            let v = scope.scalar_or(key, 0.0)?;
            if !v.is_finite() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("must be finite, got {v}"),
                });
            }
            Ok(v)
        };
        Ok(Self {
            dx: finite("dx")?,
            dy: finite("dy")?,
            tilt: finite("tilt")?,
        })
    }

    /// Whether this is the aligned (identity) case.
    pub fn is_none(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0 && self.tilt == 0.0
    }

    /// Rotation by `tilt` in x–y composed with a homogeneous translation
    /// by `(-dx, -dy)`.
    pub fn matrix(&self) -> PhaseMatrix {
        rotation(self.tilt) * translation(-self.dx, -self.dy)
    }

    /// The inverse of [`matrix()`](Misalignment::matrix): translation by
    /// `(dx, dy)` after rotation by `-tilt`. Always exists.
    pub fn inverse(&self) -> PhaseMatrix {
        translation(self.dx, self.dy) * rotation(-self.tilt)
    }
}

fn rotation(angle: f64) -> PhaseMatrix {
    let (s, c) = angle.sin_cos();
    let mut rot = PhaseMatrix::identity();
    for (a, b) in [(PS_X, PS_Y), (PS_PX, PS_PY)] {
        rot[(a, a)] = c;
        rot[(a, b)] = s;
        rot[(b, a)] = -s;
        rot[(b, b)] = c;
    }
    rot
}

fn translation(dx: f64, dy: f64) -> PhaseMatrix {
    let mut shift = PhaseMatrix::identity();
    shift[(PS_X, PS_HOM)] = dx;
    shift[(PS_Y, PS_HOM)] = dy;
    shift
}

// ── Transport ──────────────────────────────────────────────────────

/// Advance `state` through a fixed linear element of the given length.
///
/// Requires C ≥ 1 with consistent array lengths, applies `map`, adds
/// `length` to `pos`, then rejects any non-finite moment entry.
pub fn transport(
    state: &mut MomentState,
    length: f64,
    map: &TransferMap,
) -> Result<(), ElementError> {
    state.check_shape()?;
    map.apply(state);
    state.pos += length;
    ensure_finite(state)
}

/// Fail on the first non-finite moment0 or moment1 entry.
pub fn ensure_finite(state: &MomentState) -> Result<(), ElementError> {
    for (i, (m0, m1)) in state
        .moment0_env
        .iter()
        .zip(&state.moment1_env)
        .enumerate()
    {
        if !vector_is_finite(m0) {
            return Err(ElementError::NonFinite {
                quantity: "moment0",
                charge_state: i,
            });
        }
        if !matrix_is_finite(m1) {
            return Err(ElementError::NonFinite {
                quantity: "moment1",
                charge_state: i,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use linac_core::{Config, StateInit, StateShapeError, PS_S};
    use proptest::prelude::*;

    fn beam(m0: PhaseVector, m1: PhaseMatrix) -> MomentState {
        MomentState::fresh(
            &StateInit::new()
                .ion_z([1.0])
                .ion_q([1.0])
                .moment0([m0])
                .moment1([m1]),
        )
        .unwrap()
    }

    fn vec7(v: [f64; 7]) -> PhaseVector {
        PhaseVector::from_column_slice(&v)
    }

    #[test]
    fn drift_moves_positions_by_angles() {
        let mut s = beam(
            vec7([1.0, 0.5, -1.0, 0.25, 3.0, 4.0, 0.0]),
            PhaseMatrix::identity(),
        );
        transport(&mut s, 2.0, &TransferMap::drift(2.0)).unwrap();
        assert_eq!(s.pos, 2.0);
        let m0 = s.moment0_env[0];
        assert_eq!(m0[PS_X], 2.0);
        assert_eq!(m0[PS_Y], -0.5);
        assert_eq!(m0[PS_S], 3.0);

        // <x²> grows by L²<px²> for an uncorrelated unit beam.
        let m1 = s.moment1_env[0];
        assert_eq!(m1[(PS_X, PS_X)], 5.0);
        assert_eq!(m1[(PS_X, PS_PX)], 2.0);
        assert_eq!(m1[(PS_PX, PS_X)], 2.0);
        assert_eq!(m1[(PS_S, PS_S)], 1.0);
    }

    #[test]
    fn offset_is_added_after_matrix() {
        let offset = vec7([0.0, 0.0, 0.0, 0.0, 0.0, 1.5, 0.0]);
        let map = TransferMap::identity().with_offset(offset);
        let mut s = beam(vec7([1.0; 7]), PhaseMatrix::zeros());
        transport(&mut s, 0.0, &map).unwrap();
        assert_eq!(s.moment0_env[0][5], 2.5);
        assert_eq!(s.moment1_env[0], PhaseMatrix::zeros());
    }

    #[test]
    fn uninitialized_state_rejected() {
        let mut s = MomentState::fresh(&StateInit::new()).unwrap();
        assert_eq!(
            transport(&mut s, 1.0, &TransferMap::identity()),
            Err(ElementError::Shape(StateShapeError::Uninitialized))
        );
    }

    #[test]
    fn non_finite_result_detected() {
        // Finite in moment0 (1e200) but squared into moment1 (1e400).
        let mut m = PhaseMatrix::identity();
        m[(PS_Y, PS_Y)] = 1e200;
        let mut s = beam(
            vec7([0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
            PhaseMatrix::identity(),
        );
        assert_eq!(
            transport(&mut s, 0.0, &TransferMap::new(m)),
            Err(ElementError::NonFinite {
                quantity: "moment1",
                charge_state: 0,
            })
        );
    }

    #[test]
    fn nan_moment0_reports_charge_state() {
        let s = MomentState::fresh(
            &StateInit::new()
                .moment0([vec7([0.0; 7]), vec7([f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])]),
        )
        .unwrap();
        assert_eq!(
            ensure_finite(&s),
            Err(ElementError::NonFinite {
                quantity: "moment0",
                charge_state: 1,
            })
        );
    }

    #[test]
    fn aligned_misalignment_is_noop() {
        let map = TransferMap::drift(1.0);
        let same = map.clone().misaligned(&Misalignment::default());
        assert_eq!(map, same);
    }

    #[test]
    fn offset_misalignment_conjugates_translation() {
        // A beam on axis seen through an element displaced by dx: the
        // identity map stays the identity.
        let mis = Misalignment {
            dx: 1e-3,
            dy: -2e-3,
            tilt: 0.0,
        };
        let map = TransferMap::identity().misaligned(&mis);
        assert_relative_eq!(map.matrix, PhaseMatrix::identity(), epsilon = 1e-15);

        // A drift is translation invariant.
        let drift = TransferMap::drift(2.0);
        let shifted = drift.clone().misaligned(&mis);
        assert_relative_eq!(shifted.matrix, drift.matrix, epsilon = 1e-15);
    }

    #[test]
    fn tilt_rotates_transverse_plane() {
        let mis = Misalignment {
            tilt: std::f64::consts::FRAC_PI_2,
            ..Misalignment::default()
        };
        let m = mis.matrix();
        let v = m * vec7([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(v[PS_X], 0.0, epsilon = 1e-15);
        assert_relative_eq!(v[PS_Y], -1.0, epsilon = 1e-15);
    }

    #[test]
    fn misalignment_reads_from_scope() {
        let conf = Config::new().with("dx", 0.1).with("tilt", 0.2);
        let mis = Misalignment::from_scope(&conf.scope()).unwrap();
        assert_eq!(mis.dx, 0.1);
        assert_eq!(mis.dy, 0.0);
        assert_eq!(mis.tilt, 0.2);
        assert!(!mis.is_none());

        let bad = Config::new().with("dy", "up");
        assert!(Misalignment::from_scope(&bad.scope()).is_err());
        let nan = Config::new().with("tilt", f64::NAN);
        assert!(matches!(
            Misalignment::from_scope(&nan.scope()),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "tilt"
        ));
    }

    #[test]
    fn inverse_undoes_misalignment() {
        let mis = Misalignment {
            dx: 2e-3,
            dy: -1e-3,
            tilt: 0.3,
        };
        assert_relative_eq!(
            mis.matrix() * mis.inverse(),
            PhaseMatrix::identity(),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            mis.inverse() * mis.matrix(),
            PhaseMatrix::identity(),
            epsilon = 1e-15
        );
    }

    proptest! {
        #[test]
        fn transport_preserves_symmetry(
            l in 0.0f64..10.0,
            tilt in -3.0f64..3.0,
            sx in 0.0f64..4.0,
            sxp in 0.0f64..4.0,
            corr in -1.0f64..1.0,
        ) {
            let mut m1 = PhaseMatrix::identity();
            m1[(PS_X, PS_X)] = sx;
            m1[(PS_PX, PS_PX)] = sxp;
            m1[(PS_X, PS_PX)] = corr * (sx * sxp).sqrt();
            m1[(PS_PX, PS_X)] = m1[(PS_X, PS_PX)];
            let mis = Misalignment { dx: 0.0, dy: 0.0, tilt };
            let map = TransferMap::drift(l).misaligned(&mis);
            let mut s = beam(PhaseVector::zeros(), m1);
            transport(&mut s, l, &map).unwrap();
            let out = s.moment1_env[0];
            prop_assert!((out - out.transpose()).amax() < 1e-9 * (1.0 + out.amax()));
            prop_assert_eq!(s.pos, l);
        }
    }
}
