//! Persistence Fisher kernel
//!
//! The kernel is defined as: K(A, B) = exp(-t * d_F(A, B))
//! where d_F is the persistence Fisher distance with bandwidth σ. Since
//! `0 <= d_F <= π/2`, every kernel value lies in `[exp(-tπ/2), 1]`, and a diagram
//! always scores exactly 1 against itself.

use crate::core::{KernelParams, PairwiseMeasure, PersistenceDiagram, Result};
use crate::distance::{diagram_distance, Metric};

/// Persistence Fisher kernel with fixed dimension, bandwidth and decay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistenceFisherKernel {
    params: KernelParams,
}

impl PersistenceFisherKernel {
    /// Create a kernel, rejecting a non-positive `sigma` or a negative `t`
    pub fn new(params: KernelParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> KernelParams {
        self.params
    }

    /// Kernel value for one pair of diagrams
    pub fn compute(&self, x: &PersistenceDiagram, y: &PersistenceDiagram) -> Result<f64> {
        let distance = diagram_distance(x, y, self.params.dim, &Metric::fisher(self.params.sigma))?;
        Ok((-self.params.t * distance).exp())
    }
}

impl Default for PersistenceFisherKernel {
    /// dim = 0, sigma = 1, t = 1
    fn default() -> Self {
        Self {
            params: KernelParams::default(),
        }
    }
}

impl PairwiseMeasure for PersistenceFisherKernel {
    fn evaluate(&self, x: &PersistenceDiagram, y: &PersistenceDiagram) -> Result<f64> {
        self.compute(x, y)
    }

    fn self_value(&self) -> f64 {
        1.0
    }

    fn validate(&self) -> Result<()> {
        self.params.validate()
    }
}

/// Fisher kernel value between two diagrams
pub fn kernel_value(
    x: &PersistenceDiagram,
    y: &PersistenceDiagram,
    params: KernelParams,
) -> Result<f64> {
    PersistenceFisherKernel::new(params)?.compute(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DiagramPoint;
    use crate::distance::fisher_distance;
    use approx::assert_relative_eq;

    fn single(dim: usize, birth: f64, death: f64) -> PersistenceDiagram {
        PersistenceDiagram::new(vec![DiagramPoint::new(dim, birth, death)]).unwrap()
    }

    #[test]
    fn test_self_kernel_is_one() {
        let d = PersistenceDiagram::new(vec![
            DiagramPoint::new(0, 2.0, 3.1),
            DiagramPoint::new(0, 5.0, 6.0),
        ])
        .unwrap();
        assert_eq!(kernel_value(&d, &d, KernelParams::default()).unwrap(), 1.0);
    }

    #[test]
    fn test_kernel_matches_distance() {
        let x = single(0, 2.0, 3.0);
        let y = single(0, 2.0, 3.1);
        let params = KernelParams::new(0, 1.0, 2.0);

        let expected = (-2.0 * fisher_distance(&[(2.0, 3.0)], &[(2.0, 3.1)], 1.0).unwrap()).exp();
        assert_relative_eq!(kernel_value(&x, &y, params).unwrap(), expected, epsilon = 1e-14);
    }

    #[test]
    fn test_kernel_symmetry_and_range() {
        let x = single(0, 0.0, 1.0);
        let y = single(0, 0.5, 3.0);
        let kernel = PersistenceFisherKernel::default();

        let xy = kernel.compute(&x, &y).unwrap();
        let yx = kernel.compute(&y, &x).unwrap();
        assert_eq!(xy, yx);
        assert!(xy > 0.0 && xy < 1.0);
    }

    #[test]
    fn test_larger_t_decays_faster() {
        let x = single(0, 0.0, 1.0);
        let y = single(0, 0.0, 2.0);
        let slow = kernel_value(&x, &y, KernelParams::default().with_t(0.5)).unwrap();
        let fast = kernel_value(&x, &y, KernelParams::default().with_t(5.0)).unwrap();
        assert!(slow > fast);

        let flat = kernel_value(&x, &y, KernelParams::default().with_t(0.0)).unwrap();
        assert_eq!(flat, 1.0);
    }

    #[test]
    fn test_invalid_parameters() {
        let err = PersistenceFisherKernel::new(KernelParams::default().with_sigma(-1.0)).unwrap_err();
        assert!(err.to_string().contains("sigma"));

        let err = PersistenceFisherKernel::new(KernelParams::default().with_t(f64::NAN)).unwrap_err();
        assert!(err.to_string().contains('t'));
    }

    #[test]
    fn test_pairwise_measure_self_value() {
        assert_eq!(PersistenceFisherKernel::default().self_value(), 1.0);
    }
}
