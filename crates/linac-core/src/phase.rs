//! Phase-space vectors and matrices.
//!
//! The phase space has [`PS_DIM`] = 7 coordinates: three position/momentum
//! pairs plus one homogeneous coordinate that lets translations act as
//! matrix products.

use nalgebra::{SMatrix, SVector, SymmetricEigen};

use crate::config::{check_len, Scope};
use crate::error::ConfigError;

/// Phase-space dimension.
pub const PS_DIM: usize = 7;

/// Horizontal position.
pub const PS_X: usize = 0;
/// Horizontal angle.
pub const PS_PX: usize = 1;
/// Vertical position.
pub const PS_Y: usize = 2;
/// Vertical angle.
pub const PS_PY: usize = 3;
/// Longitudinal phase.
pub const PS_S: usize = 4;
/// Longitudinal energy deviation.
pub const PS_PS: usize = 5;
/// Homogeneous coordinate.
pub const PS_HOM: usize = 6;

/// A moment0 (centroid) vector.
pub type PhaseVector = SVector<f64, PS_DIM>;

/// A moment1 (second moment) matrix or a transfer matrix.
pub type PhaseMatrix = SMatrix<f64, PS_DIM, PS_DIM>;

/// Relative tolerance for symmetry and semidefiniteness checks.
const PSD_TOLERANCE: f64 = 1e-9;

/// Build a matrix from `PS_DIM * PS_DIM` finite row-major entries.
pub fn matrix_from_row_major(key: &str, values: &[f64]) -> Result<PhaseMatrix, ConfigError> {
    let values = check_finite(key, check_len(key, values, PS_DIM * PS_DIM)?)?;
    Ok(PhaseMatrix::from_row_slice(values))
}

/// Build a vector from exactly `PS_DIM` finite entries.
pub fn vector_from_slice(key: &str, values: &[f64]) -> Result<PhaseVector, ConfigError> {
    let values = check_finite(key, check_len(key, values, PS_DIM)?)?;
    Ok(PhaseVector::from_column_slice(values))
}

fn check_finite<'v>(key: &str, values: &'v [f64]) -> Result<&'v [f64], ConfigError> {
    match values.iter().position(|v| !v.is_finite()) {
        None => Ok(values),
        Some(i) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("entry {i} is not finite ({})", values[i]),
        }),
    }
}

/// Flatten a matrix to row-major order.
pub fn matrix_to_row_major(m: &PhaseMatrix) -> Vec<f64> {
    m.transpose().as_slice().to_vec()
}

/// Check that `m` is finite, symmetric and positive-semidefinite.
///
/// Both checks are relative to the largest absolute entry, so an all-zero
/// matrix passes.
pub fn validate_moment1(key: &str, m: &PhaseMatrix) -> Result<(), ConfigError> {
    check_finite(key, m.as_slice())?;
    let scale = m.amax().max(1.0);

    let asymmetry = (m - m.transpose()).amax();
    if asymmetry > PSD_TOLERANCE * scale {
        return Err(ConfigError::NotPositiveSemidefinite {
            key: key.to_string(),
            detail: format!("asymmetry {asymmetry:e}"),
        });
    }

    let eigen = SymmetricEigen::new(*m);
    let min = eigen.eigenvalues.min();
    if min < -PSD_TOLERANCE * scale {
        return Err(ConfigError::NotPositiveSemidefinite {
            key: key.to_string(),
            detail: format!("eigenvalue {min:e}"),
        });
    }
    Ok(())
}

/// Read an optional phase vector from `key`.
pub fn read_vector(scope: &Scope<'_>, key: &str) -> Result<Option<PhaseVector>, ConfigError> {
    scope
        .lookup::<&[f64]>(key)?
        .map(|v| vector_from_slice(key, v))
        .transpose()
}

/// Read an optional row-major phase matrix from `key`.
pub fn read_matrix(scope: &Scope<'_>, key: &str) -> Result<Option<PhaseMatrix>, ConfigError> {
    scope
        .lookup::<&[f64]>(key)?
        .map(|v| matrix_from_row_major(key, v))
        .transpose()
}

/// Whether every entry of `v` is finite.
pub fn vector_is_finite(v: &PhaseVector) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Whether every entry of `m` is finite.
pub fn matrix_is_finite(m: &PhaseMatrix) -> bool {
    m.iter().all(|x| x.is_finite())
}
