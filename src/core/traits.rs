//! Core traits for pairwise diagram computations

use crate::core::{PersistenceDiagram, Result};

/// A pure function of two diagrams that can fill a pairwise matrix
///
/// Implementations must be symmetric and deterministic: the value for `(x, y)`
/// has to equal the value for `(y, x)` bit for bit, and `self_value` is what
/// every diagram scores against itself.
pub trait PairwiseMeasure: Send + Sync {
    /// Evaluate the measure for one pair of diagrams
    fn evaluate(&self, x: &PersistenceDiagram, y: &PersistenceDiagram) -> Result<f64>;

    /// Value of the measure for a diagram paired with itself
    fn self_value(&self) -> f64;

    /// Check scalar parameters before any pair is evaluated
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
