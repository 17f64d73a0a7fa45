//! The source element: the zero-length initializer of a beam state.
//!
//! # Configuration
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `IonEs`, `IonEk` | required | reference rest and kinetic energy |
//! | `vector_variable` | `"moment0"` | key (or key prefix) of the moment0 data |
//! | `matrix_variable` | `"initial"` | key (or key prefix) of the moment1 data |
//! | `IonChargeStates` | absent | charge of each declared charge state |
//! | `NCharge` | `1` | population of each declared charge state |
//! | `cstate` | absent | select a single declared charge state |
//! | `IonEs_real` | `IonEs` | per-charge-state rest energy |
//! | `IonZ` | `0` | charge, when no charge states are declared |
//!
//! With `IonChargeStates` declared, charge state `i` reads its moments from
//! `<vector_variable><i>` and `<matrix_variable><i>`; otherwise the single
//! state reads `<vector_variable>` and `<matrix_variable>` directly.
//!
//! # Semantics
//!
//! `advance()` replaces the state's kinematics, charge-state arrays and
//! moments with the configured values. It accepts a freshly allocated
//! state (C = 0) and leaves `pos` unchanged.

use linac_core::phase::{read_matrix, read_vector, validate_moment1};
use linac_core::{
    ChargeVec, ConfigError, ElementError, Kinematics, MomentState, PhaseMatrix, PhaseVector,
    Scope, Value,
};
use linac_element::{ensure_finite, Element, ElementBase};

/// Zero-length element that establishes the beam's charge states and
/// initial moments.
#[derive(Clone, Debug)]
pub struct Source {
    base: ElementBase,
    reference: Kinematics,
    real: ChargeVec<Kinematics>,
    ion_z: ChargeVec<f64>,
    ion_q: ChargeVec<f64>,
    moment0: ChargeVec<PhaseVector>,
    moment1: ChargeVec<PhaseMatrix>,
}

impl Source {
    /// Registered type tag.
    pub const TYPE_NAME: &'static str = "source";

    /// Resolve the configured charge states and moments.
    pub fn from_scope(scope: &Scope<'_>) -> Result<Self, ConfigError> {
        let ion_es: f64 = scope.require("IonEs")?;
        let ion_ek: f64 = scope.require("IonEk")?;
        let reference = Kinematics::new(0.0, ion_es, ion_ek)?;

        let vector_var = scope.str_or("vector_variable", "moment0")?;
        let matrix_var = scope.str_or("matrix_variable", "initial")?;

        let mut source = Self {
            base: ElementBase::from_config(scope.local()),
            reference,
            real: ChargeVec::new(),
            ion_z: ChargeVec::new(),
            ion_q: ChargeVec::new(),
            moment0: ChargeVec::new(),
            moment1: ChargeVec::new(),
        };

        match scope.lookup::<&[f64]>("IonChargeStates")? {
            Some(charges) => {
                let n = charges.len();
                if n == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "IonChargeStates".into(),
                        reason: "at least one charge state is required".into(),
                    });
                }
                require_finite("IonChargeStates", charges)?;
                let populations = scope.vector_of("NCharge", n)?;
                for &q in populations {
                    check_population(q)?;
                }
                let rest_energies = match scope.lookup::<&[f64]>("IonEs_real")? {
                    Some(_) => Some(scope.vector_of("IonEs_real", n)?),
                    None => None,
                };
                for i in selected_states(scope, n)? {
                    let es = rest_energies.map_or(ion_es, |es| es[i]);
                    source.push(
                        reference.with_species(charges[i], es)?,
                        populations[i],
                        read_moment0(scope, &format!("{vector_var}{i}"))?,
                        read_moment1(scope, &format!("{matrix_var}{i}"))?,
                    );
                }
            }
            None => {
                selected_states(scope, 1)?;
                let ion_z = scope.scalar_or("IonZ", 0.0)?;
                require_finite("IonZ", &[ion_z])?;
                source.push(
                    reference.with_species(ion_z, ion_es)?,
                    check_population(first_scalar(scope, "NCharge", 1.0)?)?,
                    read_moment0(scope, vector_var)?,
                    read_moment1(scope, matrix_var)?,
                );
            }
        }

        source.reference.ion_z = source.ion_z[0];
        Ok(source)
    }

    /// Number of charge states this source establishes.
    pub fn charge_states(&self) -> usize {
        self.moment0.len()
    }

    /// Reference kinematics written to every state.
    pub fn reference(&self) -> &Kinematics {
        &self.reference
    }

    /// Configured moment0 per charge state.
    pub fn moment0(&self) -> &[PhaseVector] {
        &self.moment0
    }

    /// Configured moment1 per charge state.
    pub fn moment1(&self) -> &[PhaseMatrix] {
        &self.moment1
    }

    fn push(&mut self, real: Kinematics, ion_q: f64, m0: PhaseVector, m1: PhaseMatrix) {
        self.ion_z.push(real.ion_z);
        self.real.push(real);
        self.ion_q.push(ion_q);
        self.moment0.push(m0);
        self.moment1.push(m1);
    }
}

impl Element for Source {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn advance(&self, state: &mut MomentState) -> Result<(), ElementError> {
        state.reference = self.reference;
        state.real.clone_from(&self.real);
        state.ion_z.clone_from(&self.ion_z);
        state.ion_q.clone_from(&self.ion_q);
        state.moment0_env.clone_from(&self.moment0);
        state.moment1_env.clone_from(&self.moment1);
        tracing::trace!(
            element = self.name(),
            charge_states = self.charge_states(),
            "initialized beam state"
        );
        ensure_finite(state)
    }
}

/// Indices of the retained charge states: `cstate` alone, or all `n`.
fn selected_states(scope: &Scope<'_>, n: usize) -> Result<Vec<usize>, ConfigError> {
    match scope.index("cstate")? {
        None => Ok((0..n).collect()),
        Some(i) if i < n => Ok(vec![i]),
        Some(i) => Err(ConfigError::InvalidValue {
            key: "cstate".into(),
            reason: format!("charge state {i} out of range for {n} declared"),
        }),
    }
}

fn read_moment0(scope: &Scope<'_>, key: &str) -> Result<PhaseVector, ConfigError> {
    Ok(read_vector(scope, key)?.unwrap_or_else(|| {
        tracing::debug!(key, "moment0 not configured, using zeros");
        PhaseVector::zeros()
    }))
}

fn read_moment1(scope: &Scope<'_>, key: &str) -> Result<PhaseMatrix, ConfigError> {
    match read_matrix(scope, key)? {
        Some(m) => {
            validate_moment1(key, &m)?;
            Ok(m)
        }
        None => {
            tracing::debug!(key, "moment1 not configured, using zeros");
            Ok(PhaseMatrix::zeros())
        }
    }
}

fn require_finite(key: &str, values: &[f64]) -> Result<(), ConfigError> {
    match values.iter().find(|v| !v.is_finite()) {
        None => Ok(()),
        Some(v) => Err(ConfigError::InvalidValue {
            key: key.into(),
            reason: format!("must be finite, got {v}"),
        }),
    }
}

/// A population must be finite and non-negative.
fn check_population(q: f64) -> Result<f64, ConfigError> {
    if !q.is_finite() || q < 0.0 {
        return Err(ConfigError::InvalidValue {
            key: "NCharge".into(),
            reason: format!("population must be finite and non-negative, got {q}"),
        });
    }
    Ok(q)
}

/// A scalar, or the first entry of a vector.
fn first_scalar(scope: &Scope<'_>, key: &str, default: f64) -> Result<f64, ConfigError> {
    match scope.get(key) {
        None => Ok(default),
        Some(Value::Scalar(v)) => Ok(*v),
        Some(Value::Vector(v)) if !v.is_empty() => Ok(v[0]),
        Some(other) => Err(ConfigError::WrongType {
            key: key.to_string(),
            expected: "scalar",
            found: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use linac_core::{Config, StateInit, StateShapeError, NAME_KEY, TYPE_KEY};
    use linac_test_utils::lattices::{block_ones, multi_charge_globals, single_charge_globals};

    fn decl(params: Config) -> Config {
        let mut conf = Config::new()
            .with(NAME_KEY, "elem0")
            .with(TYPE_KEY, Source::TYPE_NAME);
        for (k, v) in params.iter() {
            conf.insert(k, v.clone());
        }
        conf
    }

    fn build(local: Config, global: &Config) -> Result<Source, ConfigError> {
        Source::from_scope(&decl(local).scope_within(global))
    }

    fn fresh() -> MomentState {
        MomentState::fresh(&StateInit::new()).unwrap()
    }

    #[test]
    fn single_state_overwrites_fresh_state() {
        let global = single_charge_globals();
        let local = Config::new()
            .with("initial", block_ones(0.0))
            .with("moment0", [1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let src = build(local, &global).unwrap();
        let mut s = fresh();
        src.advance(&mut s).unwrap();

        assert_eq!(s.pos, 0.0);
        assert_eq!(s.charge_states(), 1);
        assert_eq!(s.real[0].ion_es, 930e6);
        assert_eq!(s.real[0].ion_ek, 500e3);
        assert_eq!(s.real[0].ion_w, 930e6 + 500e3);
        assert_eq!(s.real[0].gamma, (930e6 + 500e3) / 930e6);
        assert_relative_eq!(
            s.real[0].beta,
            (1.0 - 1.0 / (s.real[0].gamma * s.real[0].gamma)).sqrt()
        );
        assert_eq!(
            s.moment0_env[0],
            PhaseVector::from_column_slice(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0])
        );
        assert_eq!(
            s.moment1_env[0],
            PhaseMatrix::from_row_slice(&block_ones(0.0))
        );
        assert_eq!(s.ion_q.as_slice(), &[1.0]);
    }

    #[test]
    fn cstate_selects_one_state() {
        let global = multi_charge_globals().with("cstate", 1.0);
        let local = Config::new()
            .with("vector_variable", "IV")
            .with("matrix_variable", "IM");
        let src = build(local, &global).unwrap();
        assert_eq!(src.charge_states(), 1);

        let mut s = fresh();
        src.advance(&mut s).unwrap();
        assert_eq!(s.ion_z.as_slice(), &[43.0]);
        assert_eq!(s.ion_q.as_slice(), &[1010.0]);
        assert_eq!(s.reference.gamma, 2.0);
        assert_relative_eq!(s.reference.beta, 0.8660254037844386, epsilon = 1e-15);
        assert_eq!(s.reference.ion_z, 43.0);
        assert_eq!(s.moment0_env[0][0], 2.0);
        assert_eq!(
            s.moment1_env[0],
            PhaseMatrix::from_row_slice(&block_ones(1.0))
        );
    }

    #[test]
    fn all_states_retained_in_order() {
        let global = multi_charge_globals();
        let local = Config::new()
            .with("vector_variable", "IV")
            .with("matrix_variable", "IM");
        let src = build(local, &global).unwrap();

        let mut s = fresh();
        src.advance(&mut s).unwrap();
        assert_eq!(s.check_shape(), Ok(2));
        assert_eq!(s.ion_z.as_slice(), &[42.0, 43.0]);
        assert_eq!(s.ion_q.as_slice(), &[1000.0, 1010.0]);
        assert_eq!(s.real[1].ion_z, 43.0);
        assert_eq!(s.moment0_env[0][0], 1.0);
        assert_eq!(s.moment0_env[1][0], 2.0);
    }

    #[test]
    fn advance_replaces_rather_than_adds() {
        let global = multi_charge_globals();
        let local = Config::new()
            .with("vector_variable", "IV")
            .with("matrix_variable", "IM");
        let src = build(local, &global).unwrap();

        let mut s = MomentState::fresh(
            &StateInit::new()
                .pos(3.0)
                .moment0([PhaseVector::from_element(9.0)])
                .ion_q([5.0]),
        )
        .unwrap();
        src.advance(&mut s).unwrap();
        assert_eq!(s.pos, 3.0);
        assert_eq!(s.charge_states(), 2);
        assert_eq!(s.moment0_env[0][2], 0.0);
        assert_eq!(s.ion_q.as_slice(), &[1000.0, 1010.0]);
    }

    #[test]
    fn cstate_out_of_range() {
        let global = multi_charge_globals().with("cstate", 2.0);
        let local = Config::new().with("vector_variable", "IV");
        assert!(matches!(
            build(local.clone(), &global),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "cstate"
        ));

        let global = multi_charge_globals().with("cstate", 0.5);
        assert!(build(local, &global).is_err());
    }

    #[test]
    fn missing_moments_default_to_zero() {
        let global = Config::new().with("IonEs", 1.0).with("IonEk", 0.0);
        let src = build(Config::new(), &global).unwrap();
        assert_eq!(src.moment0()[0], PhaseVector::zeros());
        assert_eq!(src.moment1()[0], PhaseMatrix::zeros());
        assert_eq!(src.reference().gamma, 1.0);
    }

    #[test]
    fn missing_reference_energy_rejected() {
        let global = Config::new().with("IonEk", 1.0);
        assert_eq!(
            build(Config::new(), &global).err(),
            Some(ConfigError::MissingKey {
                key: "IonEs".into()
            })
        );
    }

    #[test]
    fn population_count_must_match_charge_states() {
        let global = multi_charge_globals().with("NCharge", [1000.0]);
        assert!(matches!(
            build(Config::new(), &global),
            Err(ConfigError::ShapeMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn wrong_moment_shape_rejected() {
        let global = single_charge_globals();
        let local = Config::new().with("moment0", [1.0, 2.0]);
        assert!(matches!(
            build(local, &global),
            Err(ConfigError::ShapeMismatch { expected: 7, found: 2, .. })
        ));
    }

    #[test]
    fn non_psd_moment1_rejected() {
        let global = single_charge_globals();
        let mut m = [0.0; 49];
        m[0] = -1.0;
        let local = Config::new().with("initial", m);
        assert!(matches!(
            build(local, &global),
            Err(ConfigError::NotPositiveSemidefinite { .. })
        ));
    }

    #[test]
    fn non_finite_moments_rejected() {
        let global = single_charge_globals();
        let local = Config::new().with("moment0", [f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(
            build(local, &global),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "moment0"
        ));

        let mut m = block_ones(0.0);
        m[0] = f64::INFINITY;
        let local = Config::new().with("initial", m);
        assert!(matches!(
            build(local, &global),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "initial"
        ));
    }

    #[test]
    fn invalid_populations_rejected() {
        for bad in [[-1000.0, 2010.0], [f64::NAN, 1.0], [1.0, f64::INFINITY]] {
            let global = multi_charge_globals().with("NCharge", bad);
            assert!(matches!(
                build(Config::new(), &global),
                Err(ConfigError::InvalidValue { ref key, .. }) if key == "NCharge"
            ));
        }
        let global = single_charge_globals().with("NCharge", -1.0);
        assert!(build(Config::new(), &global).is_err());

        let global = multi_charge_globals().with("IonChargeStates", [42.0, f64::NAN]);
        assert!(matches!(
            build(Config::new(), &global),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "IonChargeStates"
        ));
    }

    #[test]
    fn per_state_rest_energy() {
        let global = multi_charge_globals().with("IonEs_real", [2.0, 3.0]);
        let src = build(Config::new(), &global).unwrap();
        let mut s = fresh();
        src.advance(&mut s).unwrap();
        assert_eq!(s.reference.ion_es, 1.0);
        assert_eq!(s.real[0].ion_es, 2.0);
        assert_eq!(s.real[1].ion_es, 3.0);
        assert_eq!(s.real[1].gamma, 4.0 / 3.0);
    }

    #[test]
    fn single_state_population_from_ncharge() {
        let global = single_charge_globals()
            .with("NCharge", [250.0, 1.0])
            .with("IonZ", 0.25);
        let src = build(Config::new(), &global).unwrap();
        let mut s = fresh();
        src.advance(&mut s).unwrap();
        assert_eq!(s.ion_q.as_slice(), &[250.0]);
        assert_eq!(s.ion_z.as_slice(), &[0.25]);
        assert_eq!(s.check_shape(), Ok(1));
        assert_ne!(s.check_shape(), Err(StateShapeError::Uninitialized));
    }
}
