//! Relativistic kinematics of a reference or per-charge-state particle.

use crate::error::ConfigError;

/// Energy and velocity of one particle species.
///
/// All energies share one unit (eV in the usual lattice files). The
/// derived quantities `ion_w`, `gamma`, `beta` and `bg` are kept
/// consistent with `ion_es`/`ion_ek` by [`recalc()`](Kinematics::recalc).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Kinematics {
    /// Charge state (charge number).
    pub ion_z: f64,
    /// Rest energy.
    pub ion_es: f64,
    /// Kinetic energy.
    pub ion_ek: f64,
    /// Total energy, `ion_ek + ion_es`.
    pub ion_w: f64,
    /// Lorentz factor, `ion_w / ion_es`.
    pub gamma: f64,
    /// Velocity over c, `sqrt(1 - 1/gamma²)`.
    pub beta: f64,
    /// `beta * gamma`.
    pub bg: f64,
}

impl Kinematics {
    /// Build from rest and kinetic energy.
    ///
    /// Requires `ion_es > 0` and `ion_ek >= 0`, both finite.
    pub fn new(ion_z: f64, ion_es: f64, ion_ek: f64) -> Result<Self, ConfigError> {
        if !ion_es.is_finite() || ion_es <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "IonEs".into(),
                reason: format!("rest energy must be finite and positive, got {ion_es}"),
            });
        }
        if !ion_ek.is_finite() || ion_ek < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "IonEk".into(),
                reason: format!("kinetic energy must be finite and non-negative, got {ion_ek}"),
            });
        }
        let mut k = Self {
            ion_z,
            ion_es,
            ion_ek,
            ..Self::default()
        };
        k.recalc();
        Ok(k)
    }

    /// Recompute derived quantities from `ion_es` and `ion_ek`.
    ///
    /// A zero rest energy (an unpopulated state) leaves every derived
    /// quantity at zero.
    pub fn recalc(&mut self) {
        self.ion_w = self.ion_ek + self.ion_es;
        if self.ion_es == 0.0 {
            self.gamma = 0.0;
            self.beta = 0.0;
            self.bg = 0.0;
            return;
        }
        self.gamma = self.ion_w / self.ion_es;
        self.beta = (1.0 - 1.0 / (self.gamma * self.gamma)).sqrt();
        self.bg = self.beta * self.gamma;
    }

    /// The same particle with a different charge state and rest energy.
    pub fn with_species(&self, ion_z: f64, ion_es: f64) -> Result<Self, ConfigError> {
        Self::new(ion_z, ion_es, self.ion_ek)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn unit_energies() {
        let k = Kinematics::new(0.0, 1.0, 1.0).unwrap();
        assert_eq!(k.ion_w, 2.0);
        assert_eq!(k.gamma, 2.0);
        assert_relative_eq!(k.beta, 0.8660254037844386, epsilon = 1e-15);
        assert_relative_eq!(k.bg, 2.0 * 0.8660254037844386, epsilon = 1e-15);
    }

    #[test]
    fn at_rest() {
        let k = Kinematics::new(1.0, 930e6, 0.0).unwrap();
        assert_eq!(k.gamma, 1.0);
        assert_eq!(k.beta, 0.0);
    }

    #[test]
    fn invalid_energies_rejected() {
        assert!(Kinematics::new(0.0, 0.0, 1.0).is_err());
        assert!(Kinematics::new(0.0, -1.0, 1.0).is_err());
        assert!(Kinematics::new(0.0, 1.0, -1.0).is_err());
        assert!(Kinematics::new(0.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn default_is_all_zero() {
        let mut k = Kinematics::default();
        k.recalc();
        assert_eq!(k, Kinematics::default());
    }

    proptest! {
        #[test]
        fn derived_quantities_match_definitions(
            es in 1.0e-3f64..1.0e10,
            ek in 0.0f64..1.0e10,
        ) {
            let k = Kinematics::new(0.0, es, ek).unwrap();
            prop_assert_eq!(k.ion_w, ek + es);
            prop_assert_eq!(k.gamma, (ek + es) / es);
            prop_assert_eq!(k.beta, (1.0 - 1.0 / (k.gamma * k.gamma)).sqrt());
            prop_assert!(k.beta >= 0.0 && k.beta < 1.0 + 1e-12);
        }
    }
}
