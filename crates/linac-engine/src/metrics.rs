//! Per-call performance metrics for propagation.
//!
//! [`PropagateMetrics`] captures timing data for a single `propagate()`
//! call, for profiling long lattices.

/// Timing metrics collected during a single propagation.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropagateMetrics {
    /// Wall-clock time for the whole call, in microseconds.
    pub total_us: u64,
    /// Per-element execution times: `(name, microseconds)`, in the order
    /// the elements ran.
    pub element_us: Vec<(String, u64)>,
}

impl PropagateMetrics {
    /// The slowest element, if any ran.
    pub fn slowest(&self) -> Option<(&str, u64)> {
        self.element_us
            .iter()
            .max_by_key(|(_, us)| *us)
            .map(|(name, us)| (name.as_str(), *us))
    }
}

/// Outcome of a successful propagation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropagateResult {
    /// Number of elements the state was advanced through.
    pub steps: usize,
    /// Timing for this call.
    pub metrics: PropagateMetrics,
}
