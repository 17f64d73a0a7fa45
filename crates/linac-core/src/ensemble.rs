//! Reading a multi-charge-state beam back as a single ensemble.
//!
//! The ensemble centroid is the population-weighted mean of the per-state
//! centroids. Combining second moments needs more than a weighted sum, so
//! it goes through the [`Moment1Rule`] trait; [`ParallelAxis`] is the
//! covariance combination (mean of covariances plus covariance of means).

use crate::error::StateShapeError;
use crate::phase::{PhaseMatrix, PhaseVector};
use crate::state::MomentState;

/// A strategy for combining per-charge-state moment1 matrices.
pub trait Moment1Rule {
    /// Combine `moment1[i]` (about centroid `moment0[i]`, population
    /// `weights[i]`) into one matrix about the ensemble centroid `mean`.
    ///
    /// `total` is the (positive) sum of `weights`.
    fn combine(
        &self,
        weights: &[f64],
        total: f64,
        moment0: &[PhaseVector],
        moment1: &[PhaseMatrix],
        mean: &PhaseVector,
    ) -> PhaseMatrix;
}

/// Population-weighted covariance combination.
///
/// `Σ = Σᵢ qᵢ (Σᵢ + (μᵢ − μ)(μᵢ − μ)ᵀ) / Σᵢ qᵢ`
#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelAxis;

impl Moment1Rule for ParallelAxis {
    fn combine(
        &self,
        weights: &[f64],
        total: f64,
        moment0: &[PhaseVector],
        moment1: &[PhaseMatrix],
        mean: &PhaseVector,
    ) -> PhaseMatrix {
        let mut acc = PhaseMatrix::zeros();
        for ((q, m0), m1) in weights.iter().zip(moment0).zip(moment1) {
            let d = m0 - mean;
            acc += (m1 + d * d.transpose()) * *q;
        }
        acc / total
    }
}

/// A beam's ensemble moments.
#[derive(Clone, Debug, PartialEq)]
pub struct Ensemble {
    /// Total population.
    pub total: f64,
    /// Population-weighted centroid.
    pub moment0: PhaseVector,
    /// Combined second moment about `moment0`.
    pub moment1: PhaseMatrix,
}

impl MomentState {
    /// Population-weighted mean of moment0 across charge states.
    pub fn ensemble_moment0(&self) -> Result<PhaseVector, StateShapeError> {
        self.check_shape()?;
        let total = self.total_population()?;
        Ok(weighted_mean(&self.ion_q, &self.moment0_env, total))
    }

    /// Ensemble centroid and second moment under `rule`.
    pub fn ensemble<R: Moment1Rule + ?Sized>(&self, rule: &R) -> Result<Ensemble, StateShapeError> {
        self.check_shape()?;
        let total = self.total_population()?;
        let moment0 = weighted_mean(&self.ion_q, &self.moment0_env, total);
        let moment1 = rule.combine(
            &self.ion_q,
            total,
            &self.moment0_env,
            &self.moment1_env,
            &moment0,
        );
        Ok(Ensemble {
            total,
            moment0,
            moment1,
        })
    }

    fn total_population(&self) -> Result<f64, StateShapeError> {
        let total: f64 = self.ion_q.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(StateShapeError::EmptyPopulation);
        }
        Ok(total)
    }
}

fn weighted_mean(weights: &[f64], values: &[PhaseVector], total: f64) -> PhaseVector {
    let mut acc = PhaseVector::zeros();
    for (q, v) in weights.iter().zip(values) {
        acc += v * *q;
    }
    acc / total
}
