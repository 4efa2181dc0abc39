//! Wasserstein and bottleneck distances between persistence diagrams
//!
//! Both diagrams are padded with diagonal slots so that every point may either be
//! matched to a point of the other diagram or sent to its projection on the
//! diagonal. For diagrams with `n` and `m` points the padded cost matrix is
//! `(n + m) x (n + m)`:
//!
//! ```text
//!              | points of B        | diagonal slots for A |
//! points of A  | c(a_i, b_j)        | c(a_i, diagonal)     |
//! diag for B   | c(diagonal, b_j)   | 0                    |
//! ```
//!
//! The p-Wasserstein distance is `(min Σ c^p)^(1/p)` over perfect matchings; the
//! bottleneck distance (p = ∞) minimizes the largest matched cost instead.

use crate::core::{PdkError, Result};
use crate::distance::assignment::{solve_min_max, solve_min_sum};
use serde::{Deserialize, Serialize};

/// Ground metric between two points of the birth/death half-plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GroundMetric {
    /// max(|Δbirth|, |Δdeath|)
    #[default]
    LInfinity,
    /// sqrt(Δbirth² + Δdeath²)
    Euclidean,
}

impl GroundMetric {
    fn between(&self, a: (f64, f64), b: (f64, f64)) -> f64 {
        let db = (a.0 - b.0).abs();
        let dd = (a.1 - b.1).abs();
        match self {
            Self::LInfinity => db.max(dd),
            Self::Euclidean => db.hypot(dd),
        }
    }

    /// Distance from a point to its nearest point on the diagonal
    fn to_diagonal(&self, p: (f64, f64)) -> f64 {
        let persistence = (p.1 - p.0).abs();
        match self {
            Self::LInfinity => persistence / 2.0,
            Self::Euclidean => persistence / std::f64::consts::SQRT_2,
        }
    }
}

/// Order of the Wasserstein distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Order {
    /// p-Wasserstein with `p >= 1`
    Finite(f64),
    /// Bottleneck distance (p = ∞)
    Bottleneck,
}

impl Default for Order {
    fn default() -> Self {
        Self::Finite(2.0)
    }
}

impl Order {
    /// Interpret a real `p`; infinity selects the bottleneck distance
    pub fn from_p(p: f64) -> Result<Self> {
        let order = if p == f64::INFINITY {
            Self::Bottleneck
        } else {
            Self::Finite(p)
        };
        order.validate()?;
        Ok(order)
    }

    fn validate(&self) -> Result<()> {
        if let Self::Finite(p) = *self {
            if !p.is_finite() || p < 1.0 {
                return Err(PdkError::InvalidParameter(format!(
                    "p must be a number >= 1 (or infinity for bottleneck), got {p}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of the Wasserstein metric
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WassersteinConfig {
    pub order: Order,
    pub ground: GroundMetric,
}

impl WassersteinConfig {
    pub fn new(order: Order, ground: GroundMetric) -> Self {
        Self { order, ground }
    }

    /// Bottleneck distance under the given ground metric
    pub fn bottleneck(ground: GroundMetric) -> Self {
        Self::new(Order::Bottleneck, ground)
    }

    pub fn validate(&self) -> Result<()> {
        self.order.validate()
    }
}

/// Wasserstein (or bottleneck) distance between two point sets of one dimension
pub fn wasserstein_distance(
    a: &[(f64, f64)],
    b: &[(f64, f64)],
    config: &WassersteinConfig,
) -> Result<f64> {
    config.validate()?;
    let n = a.len() + b.len();
    if n == 0 {
        return Ok(0.0);
    }

    let ground = config.ground;
    let mut costs = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            costs[i * n + j] = match (i < a.len(), j < b.len()) {
                (true, true) => ground.between(a[i], b[j]),
                (true, false) => ground.to_diagonal(a[i]),
                (false, true) => ground.to_diagonal(b[j]),
                (false, false) => 0.0,
            };
        }
    }

    match config.order {
        Order::Bottleneck => solve_min_max(&costs, n),
        Order::Finite(p) => {
            costs.iter_mut().for_each(|c| *c = c.powf(p));
            let assignment = solve_min_sum(&costs, n)?;
            Ok(assignment.total_cost.max(0.0).powf(1.0 / p))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_diagrams() {
        let a = vec![(0.0, 1.0), (0.5, 2.0)];
        let d = wasserstein_distance(&a, &a, &WassersteinConfig::default()).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_single_points_matched() {
        // L-inf between (2,3) and (2,3.1) is 0.1; diagonal costs are 0.5 and 0.55
        let a = vec![(2.0, 3.0)];
        let b = vec![(2.0, 3.1)];
        let d = wasserstein_distance(&a, &b, &WassersteinConfig::default()).unwrap();
        assert_relative_eq!(d, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_points_sent_to_diagonal() {
        // Far apart points are cheaper to send to the diagonal: sqrt(0.5² + 0.5²)
        let a = vec![(0.0, 1.0)];
        let b = vec![(10.0, 11.0)];
        let d = wasserstein_distance(&a, &b, &WassersteinConfig::default()).unwrap();
        assert_relative_eq!(d, (0.5_f64).hypot(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_one_side_empty_uses_diagonal() {
        let a = vec![(0.0, 2.0), (1.0, 2.0)];
        let config = WassersteinConfig::new(Order::Finite(1.0), GroundMetric::LInfinity);
        let d = wasserstein_distance(&a, &[], &config).unwrap();
        assert_relative_eq!(d, 1.0 + 0.5, epsilon = 1e-12);

        let d_rev = wasserstein_distance(&[], &a, &config).unwrap();
        assert_relative_eq!(d, d_rev, epsilon = 1e-12);
    }

    #[test]
    fn test_both_empty() {
        let d = wasserstein_distance(&[], &[], &WassersteinConfig::default()).unwrap();
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_euclidean_ground_metric() {
        let a = vec![(0.0, 2.0)];
        let config = WassersteinConfig::new(Order::Finite(1.0), GroundMetric::Euclidean);
        let d = wasserstein_distance(&a, &[], &config).unwrap();
        assert_relative_eq!(d, 2.0 / std::f64::consts::SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_bottleneck() {
        let a = vec![(0.0, 4.0), (1.0, 1.2)];
        let b = vec![(0.0, 3.0)];
        let config = WassersteinConfig::bottleneck(GroundMetric::LInfinity);
        // (0,4)->(0,3) costs 1, (1,1.2)->diagonal costs 0.1
        let d = wasserstein_distance(&a, &b, &config).unwrap();
        assert_relative_eq!(d, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_order_validation() {
        assert!(Order::from_p(0.5).is_err());
        assert!(Order::from_p(f64::NAN).is_err());
        assert_eq!(Order::from_p(f64::INFINITY).unwrap(), Order::Bottleneck);
        assert_eq!(Order::from_p(3.0).unwrap(), Order::Finite(3.0));

        let config = WassersteinConfig::new(Order::Finite(0.0), GroundMetric::LInfinity);
        let err = wasserstein_distance(&[(0.0, 1.0)], &[], &config).unwrap_err();
        assert!(err.to_string().contains('p'));
    }
}
