//! The beam state advanced along a lattice.
//!
//! A [`MomentState`] holds the longitudinal position, the reference
//! kinematics shared by all charge states, and one entry per tracked charge
//! state for kinematics, charge, population, moment0 and moment1. The
//! charge-state count C is the length of those arrays; it is fixed from the
//! moment a source element populates the state.

use smallvec::{smallvec, SmallVec};

use crate::config::Config;
use crate::error::{ConfigError, StateShapeError};
use crate::kinematics::Kinematics;
use crate::phase::{PhaseMatrix, PhaseVector, PS_DIM};

/// Per-charge-state storage, inline for up to two states.
pub type ChargeVec<T> = SmallVec<[T; 2]>;

// ── StateInit ──────────────────────────────────────────────────────

/// Sparse field overrides applied when allocating a state.
///
/// Every field left as `None` keeps its zero (or inherited) default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateInit {
    /// Longitudinal position.
    pub pos: Option<f64>,
    /// Reference rest energy.
    pub ion_es: Option<f64>,
    /// Reference kinetic energy.
    pub ion_ek: Option<f64>,
    /// Charge per charge state.
    pub ion_z: Option<Vec<f64>>,
    /// Population per charge state.
    pub ion_q: Option<Vec<f64>>,
    /// moment0 per charge state.
    pub moment0_env: Option<Vec<PhaseVector>>,
    /// moment1 per charge state.
    pub moment1_env: Option<Vec<PhaseMatrix>>,
}

impl StateInit {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting position.
    #[must_use]
    pub fn pos(mut self, pos: f64) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Set the reference rest and kinetic energy.
    #[must_use]
    pub fn reference(mut self, ion_es: f64, ion_ek: f64) -> Self {
        self.ion_es = Some(ion_es);
        self.ion_ek = Some(ion_ek);
        self
    }

    /// Set the charge of each charge state.
    #[must_use]
    pub fn ion_z(mut self, z: impl IntoIterator<Item = f64>) -> Self {
        self.ion_z = Some(z.into_iter().collect());
        self
    }

    /// Set the population of each charge state.
    #[must_use]
    pub fn ion_q(mut self, q: impl IntoIterator<Item = f64>) -> Self {
        self.ion_q = Some(q.into_iter().collect());
        self
    }

    /// Set moment0 for each charge state.
    #[must_use]
    pub fn moment0(mut self, m: impl IntoIterator<Item = PhaseVector>) -> Self {
        self.moment0_env = Some(m.into_iter().collect());
        self
    }

    /// Set moment1 for each charge state.
    #[must_use]
    pub fn moment1(mut self, m: impl IntoIterator<Item = PhaseMatrix>) -> Self {
        self.moment1_env = Some(m.into_iter().collect());
        self
    }

    /// Read overrides from a mapping.
    ///
    /// Recognized keys: `pos`, `IonEs`, `IonEk`, `IonZ`, `IonQ` (scalar or
    /// vector), `moment0_env` (flat, multiple of 7) and `moment1_env`
    /// (flat row-major, multiple of 49). Other keys are ignored.
    pub fn from_config(conf: &Config) -> Result<Self, ConfigError> {
        let mut init = Self::new();
        for (key, _) in conf.iter() {
            match key {
                "pos" => init.pos = Some(conf.require(key)?),
                "IonEs" => init.ion_es = Some(conf.require(key)?),
                "IonEk" => init.ion_ek = Some(conf.require(key)?),
                "IonZ" => init.ion_z = Some(scalar_or_vector(conf, key)?),
                "IonQ" => init.ion_q = Some(scalar_or_vector(conf, key)?),
                "moment0_env" => {
                    let flat: &[f64] = conf.require(key)?;
                    init.moment0_env = Some(
                        chunks(key, flat, PS_DIM)?
                            .map(PhaseVector::from_column_slice)
                            .collect(),
                    );
                }
                "moment1_env" => {
                    let flat: &[f64] = conf.require(key)?;
                    init.moment1_env = Some(
                        chunks(key, flat, PS_DIM * PS_DIM)?
                            .map(PhaseMatrix::from_row_slice)
                            .collect(),
                    );
                }
                other => tracing::debug!(key = other, "ignoring unknown state field"),
            }
        }
        Ok(init)
    }
}

fn scalar_or_vector(conf: &Config, key: &str) -> Result<Vec<f64>, ConfigError> {
    match conf.lookup::<f64>(key) {
        Ok(Some(v)) => Ok(vec![v]),
        _ => Ok(conf.require::<&[f64]>(key)?.to_vec()),
    }
}

fn chunks<'a>(
    key: &str,
    flat: &'a [f64],
    size: usize,
) -> Result<std::slice::ChunksExact<'a, f64>, ConfigError> {
    if flat.len() % size != 0 {
        return Err(ConfigError::ShapeMismatch {
            key: key.to_string(),
            expected: (flat.len() / size + 1) * size,
            found: flat.len(),
        });
    }
    Ok(flat.chunks_exact(size))
}

// ── MomentState ────────────────────────────────────────────────────

/// Beam state at one longitudinal position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MomentState {
    /// Longitudinal position.
    pub pos: f64,
    /// Reference kinematics, shared by all charge states.
    pub reference: Kinematics,
    /// Species-corrected kinematics per charge state.
    pub real: ChargeVec<Kinematics>,
    /// Charge per charge state.
    pub ion_z: ChargeVec<f64>,
    /// Population per charge state.
    pub ion_q: ChargeVec<f64>,
    /// moment0 per charge state.
    pub moment0_env: ChargeVec<PhaseVector>,
    /// moment1 per charge state.
    pub moment1_env: ChargeVec<PhaseMatrix>,
}

impl MomentState {
    /// A zeroed state with the given overrides applied.
    ///
    /// Reference energy overrides must satisfy [`Kinematics::new`].
    /// Without array overrides the state tracks no charge states (C = 0).
    /// Otherwise C is the common length of the supplied arrays.
    pub fn fresh(init: &StateInit) -> Result<Self, StateShapeError> {
        let c = declared_len(init)?.unwrap_or(0);
        let mut state = Self::default();
        state.resize(c);
        state.apply(init, c)?;
        Ok(state)
    }

    /// A state carrying over `prev`'s charge-state structure.
    ///
    /// C, `ion_z`, `ion_q`, the reference and real kinematics are copied;
    /// moments and position start at zero. Array overrides must match C.
    pub fn inheriting_shape_from(prev: &Self, init: &StateInit) -> Result<Self, StateShapeError> {
        let c = prev.charge_states();
        let mut state = Self {
            pos: 0.0,
            reference: prev.reference,
            real: prev.real.clone(),
            ion_z: prev.ion_z.clone(),
            ion_q: prev.ion_q.clone(),
            moment0_env: smallvec![PhaseVector::zeros(); c],
            moment1_env: smallvec![PhaseMatrix::zeros(); c],
        };
        state.resize(c);
        state.apply(init, c)?;
        Ok(state)
    }

    /// Number of tracked charge states (C).
    pub fn charge_states(&self) -> usize {
        self.moment0_env.len()
    }

    /// Verify every per-charge-state array has length C and C ≥ 1.
    pub fn check_shape(&self) -> Result<usize, StateShapeError> {
        let c = self.charge_states();
        if c == 0 {
            return Err(StateShapeError::Uninitialized);
        }
        for (field, len) in [
            ("moment1_env", self.moment1_env.len()),
            ("real", self.real.len()),
            ("IonZ", self.ion_z.len()),
            ("IonQ", self.ion_q.len()),
        ] {
            if len != c {
                return Err(StateShapeError::LengthMismatch {
                    field,
                    expected: c,
                    found: len,
                });
            }
        }
        Ok(c)
    }

    /// Recompute derived kinematics for the reference and every charge state.
    pub fn recalc(&mut self) {
        self.reference.recalc();
        for k in &mut self.real {
            k.recalc();
        }
    }

    /// RMS beam size per charge state: `sqrt(diag(moment1))`.
    ///
    /// Negative diagonal entries (round-off) are clamped to zero.
    pub fn rms(&self) -> ChargeVec<PhaseVector> {
        self.moment1_env
            .iter()
            .map(|m| m.diagonal().map(|v| v.max(0.0).sqrt()))
            .collect()
    }

    fn resize(&mut self, c: usize) {
        let reference = self.reference;
        self.real.resize(c, reference);
        self.ion_z.resize(c, 0.0);
        self.ion_q.resize(c, 0.0);
        self.moment0_env.resize(c, PhaseVector::zeros());
        self.moment1_env.resize(c, PhaseMatrix::zeros());
    }

    fn apply(&mut self, init: &StateInit, c: usize) -> Result<(), StateShapeError> {
        if let Some(pos) = init.pos {
            self.pos = pos;
        }
        if init.ion_es.is_some() || init.ion_ek.is_some() {
            self.reference = Kinematics::new(
                self.reference.ion_z,
                init.ion_es.unwrap_or(self.reference.ion_es),
                init.ion_ek.unwrap_or(self.reference.ion_ek),
            )
            .map_err(|e| StateShapeError::InvalidReference {
                reason: e.to_string(),
            })?;
            for k in &mut self.real {
                k.ion_es = self.reference.ion_es;
                k.ion_ek = self.reference.ion_ek;
                k.recalc();
            }
        }
        if let Some(z) = &init.ion_z {
            check_override("IonZ", z.len(), c)?;
            self.ion_z = z.iter().copied().collect();
            for (k, &z) in self.real.iter_mut().zip(z) {
                k.ion_z = z;
            }
        }
        if let Some(q) = &init.ion_q {
            check_override("IonQ", q.len(), c)?;
            self.ion_q = q.iter().copied().collect();
        }
        if let Some(m) = &init.moment0_env {
            check_override("moment0_env", m.len(), c)?;
            self.moment0_env = m.iter().copied().collect();
        }
        if let Some(m) = &init.moment1_env {
            check_override("moment1_env", m.len(), c)?;
            self.moment1_env = m.iter().copied().collect();
        }
        Ok(())
    }
}

fn check_override(field: &'static str, len: usize, c: usize) -> Result<(), StateShapeError> {
    if len != c {
        return Err(StateShapeError::LengthMismatch {
            field,
            expected: c,
            found: len,
        });
    }
    Ok(())
}

/// The charge-state count implied by the array overrides, if any.
fn declared_len(init: &StateInit) -> Result<Option<usize>, StateShapeError> {
    let lens = [
        ("IonZ", init.ion_z.as_ref().map(Vec::len)),
        ("IonQ", init.ion_q.as_ref().map(Vec::len)),
        ("moment0_env", init.moment0_env.as_ref().map(Vec::len)),
        ("moment1_env", init.moment1_env.as_ref().map(Vec::len)),
    ];
    let mut c = None;
    for (field, len) in lens {
        let Some(len) = len else { continue };
        match c {
            None => c = Some(len),
            Some(expected) => check_override(field, len, expected)?,
        }
    }
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn iv(a: f64) -> PhaseVector {
        PhaseVector::from_column_slice(&[a, a, 0.0, 0.0, 0.0, 0.0, 0.0])
    }

    #[test]
    fn fresh_default_is_empty_and_zero() {
        let s = MomentState::fresh(&StateInit::new()).unwrap();
        assert_eq!(s.charge_states(), 0);
        assert_eq!(s.pos, 0.0);
        assert_eq!(s.reference, Kinematics::default());
        assert_eq!(s.check_shape(), Err(StateShapeError::Uninitialized));
    }

    #[test]
    fn fresh_with_overrides() {
        let init = StateInit::new()
            .pos(2.5)
            .reference(1.0, 1.0)
            .ion_z([42.0, 43.0])
            .moment0([iv(1.0), iv(2.0)]);
        let s = MomentState::fresh(&init).unwrap();
        assert_eq!(s.pos, 2.5);
        assert_eq!(s.check_shape(), Ok(2));
        assert_eq!(s.reference.gamma, 2.0);
        assert_eq!(s.real[1].ion_z, 43.0);
        assert_eq!(s.real[1].gamma, 2.0);
        assert_eq!(s.ion_q.as_slice(), &[0.0, 0.0]);
        assert_eq!(s.moment0_env[1], iv(2.0));
        assert_eq!(s.moment1_env[0], PhaseMatrix::zeros());
    }

    #[test]
    fn fresh_rejects_inconsistent_lengths() {
        let init = StateInit::new().ion_z([1.0, 2.0]).ion_q([1.0]);
        assert_eq!(
            MomentState::fresh(&init),
            Err(StateShapeError::LengthMismatch {
                field: "IonQ",
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn inherit_copies_structure_not_moments() {
        let prev = MomentState::fresh(
            &StateInit::new()
                .pos(10.0)
                .reference(1.0, 3.0)
                .ion_z([42.0, 43.0])
                .ion_q([1000.0, 1010.0])
                .moment0([iv(1.0), iv(2.0)]),
        )
        .unwrap();
        let s = MomentState::inheriting_shape_from(&prev, &StateInit::new()).unwrap();
        assert_eq!(s.charge_states(), 2);
        assert_eq!(s.pos, 0.0);
        assert_eq!(s.ion_z.as_slice(), &[42.0, 43.0]);
        assert_eq!(s.ion_q.as_slice(), &[1000.0, 1010.0]);
        assert_eq!(s.reference, prev.reference);
        assert_eq!(s.moment0_env[1], PhaseVector::zeros());

        let bad = StateInit::new().moment0([iv(1.0)]);
        assert!(MomentState::inheriting_shape_from(&prev, &bad).is_err());
    }

    #[test]
    fn invalid_reference_energy_rejected() {
        for init in [
            StateInit::new().reference(1.0, -0.5),
            StateInit::new().reference(0.0, 1.0),
            StateInit::new().reference(f64::NAN, 1.0),
        ] {
            assert!(matches!(
                MomentState::fresh(&init),
                Err(StateShapeError::InvalidReference { .. })
            ));
        }
        assert!(MomentState::fresh(&StateInit::new().reference(1.0, 1.0)).is_ok());
        // Kinetic energy alone leaves the rest energy at zero.
        assert!(matches!(
            MomentState::fresh(&StateInit {
                ion_ek: Some(1.0),
                ..StateInit::new()
            }),
            Err(StateShapeError::InvalidReference { .. })
        ));
    }

    #[test]
    fn check_shape_detects_mismatch() {
        let mut s = MomentState::fresh(&StateInit::new().ion_z([1.0])).unwrap();
        s.ion_q.push(5.0);
        assert_eq!(
            s.check_shape(),
            Err(StateShapeError::LengthMismatch {
                field: "IonQ",
                expected: 1,
                found: 2,
            })
        );
    }

    #[test]
    fn rms_is_sqrt_of_diagonal() {
        let mut m = PhaseMatrix::zeros();
        m[(0, 0)] = 4.0;
        m[(2, 2)] = 9.0;
        m[(4, 4)] = -1e-18;
        let s = MomentState::fresh(&StateInit::new().moment1([m])).unwrap();
        let rms = s.rms();
        assert_relative_eq!(rms[0][0], 2.0);
        assert_relative_eq!(rms[0][2], 3.0);
        assert_eq!(rms[0][4], 0.0);
    }

    #[test]
    fn from_config_reads_known_keys() {
        let mut flat1 = vec![0.0; 49];
        flat1[1] = 3.0;
        let conf = Config::new()
            .with("pos", 1.5)
            .with("IonEs", 2.0)
            .with("IonZ", 0.5)
            .with("moment0_env", vec![1.0; 7])
            .with("moment1_env", flat1)
            .with("something_else", "ignored");
        let init = StateInit::from_config(&conf).unwrap();
        assert_eq!(init.pos, Some(1.5));
        assert_eq!(init.ion_es, Some(2.0));
        assert_eq!(init.ion_ek, None);
        assert_eq!(init.ion_z, Some(vec![0.5]));
        assert_eq!(init.moment1_env.as_ref().unwrap()[0][(0, 1)], 3.0);

        let s = MomentState::fresh(&init).unwrap();
        assert_eq!(s.charge_states(), 1);
        assert_eq!(s.reference.ion_es, 2.0);
    }

    #[test]
    fn from_config_rejects_ragged_moments() {
        let conf = Config::new().with("moment0_env", vec![1.0; 8]);
        assert!(matches!(
            StateInit::from_config(&conf),
            Err(ConfigError::ShapeMismatch { expected: 14, found: 8, .. })
        ));
    }
}
