//! Persistence Fisher distance
//!
//! Each diagram is smoothed into a Gaussian density over the birth/death
//! half-plane. To make the two densities comparable, diagram A is augmented with
//! the diagonal projections of B and vice versa, and both densities are evaluated
//! on the common grid `A ∪ B ∪ proj(A) ∪ proj(B)` and normalized to sum to one.
//! The distance is the Fisher information geodesic between them:
//!
//! ```text
//! d_F(A, B) = arccos( Σ_θ sqrt(ρ_A(θ) · ρ_B(θ)) )
//! ```
//!
//! The Gaussian normalizing constant cancels in the normalization, so only
//! `exp(-|θ - u|² / 2σ²)` is accumulated.

use crate::core::Result;
use crate::utils::validation::positive_real;

fn diagonal_projection(p: &(f64, f64)) -> (f64, f64) {
    let mid = (p.0 + p.1) / 2.0;
    (mid, mid)
}

/// Fisher information distance between two point sets of one dimension
///
/// When either side is empty its density comes only from the other side's
/// diagonal projections; two empty sets are at distance zero.
pub fn fisher_distance(a: &[(f64, f64)], b: &[(f64, f64)], sigma: f64) -> Result<f64> {
    positive_real("sigma", sigma)?;
    if a.is_empty() && b.is_empty() {
        return Ok(0.0);
    }

    let a_proj: Vec<(f64, f64)> = a.iter().map(diagonal_projection).collect();
    let b_proj: Vec<(f64, f64)> = b.iter().map(diagonal_projection).collect();

    let grid: Vec<(f64, f64)> = a
        .iter()
        .chain(b)
        .chain(&a_proj)
        .chain(&b_proj)
        .copied()
        .collect();

    let a_centers: Vec<(f64, f64)> = a.iter().chain(&b_proj).copied().collect();
    let b_centers: Vec<(f64, f64)> = b.iter().chain(&a_proj).copied().collect();

    let rho_a = normalized_density(&grid, &a_centers, sigma);
    let rho_b = normalized_density(&grid, &b_centers, sigma);

    let affinity: f64 = rho_a
        .iter()
        .zip(&rho_b)
        .map(|(x, y)| (x * y).sqrt())
        .sum();

    // Rounding can push the Bhattacharyya affinity marginally above one
    Ok(affinity.clamp(0.0, 1.0).acos())
}

/// Gaussian mixture centred on `centers`, evaluated on `grid`, summing to one
///
/// Every center is also a grid point, so each density has mass at least one
/// before normalization.
fn normalized_density(grid: &[(f64, f64)], centers: &[(f64, f64)], sigma: f64) -> Vec<f64> {
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut density: Vec<f64> = grid
        .iter()
        .map(|&(gx, gy)| {
            centers
                .iter()
                .map(|&(cx, cy)| {
                    let sq = (gx - cx).powi(2) + (gy - cy).powi(2);
                    (-sq / two_sigma_sq).exp()
                })
                .sum()
        })
        .collect();

    let total: f64 = density.iter().sum();
    density.iter_mut().for_each(|d| *d /= total);
    density
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_both_empty() {
        assert_eq!(fisher_distance(&[], &[], 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_near_identical_small() {
        let a = vec![(2.0, 3.0)];
        let b = vec![(2.0, 3.1)];
        let d = fisher_distance(&a, &b, 1.0).unwrap();
        assert!(d > 0.0);
        assert!(d < 0.1);
    }

    #[test]
    fn test_distance_grows_with_separation() {
        let a = vec![(0.0, 1.0)];
        let near = vec![(0.0, 1.5)];
        let far = vec![(0.0, 4.0)];
        let d_near = fisher_distance(&a, &near, 1.0).unwrap();
        let d_far = fisher_distance(&a, &far, 1.0).unwrap();
        assert!(d_near < d_far);
    }

    #[test]
    fn test_bounded_by_half_pi() {
        let a = vec![(0.0, 100.0)];
        let b = vec![(500.0, 900.0)];
        let d = fisher_distance(&a, &b, 0.1).unwrap();
        assert!(d <= std::f64::consts::FRAC_PI_2 + 1e-12);
        assert!(d.is_finite());
    }

    #[test]
    fn test_one_side_empty_compares_to_diagonal() {
        let a = vec![(0.0, 2.0)];
        let d = fisher_distance(&a, &[], 1.0).unwrap();
        let d_rev = fisher_distance(&[], &a, 1.0).unwrap();
        assert!(d > 0.0);
        assert_relative_eq!(d, d_rev, epsilon = 1e-12);
    }

    #[test]
    fn test_density_normalized() {
        let grid = vec![(0.0, 1.0), (0.5, 0.5), (2.0, 3.0)];
        let density = normalized_density(&grid, &grid[..2], 0.7);
        assert_relative_eq!(density.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_sigma() {
        let a = vec![(0.0, 1.0)];
        let err = fisher_distance(&a, &a, 0.0).unwrap_err();
        assert!(err.to_string().contains("sigma"));
        assert!(fisher_distance(&a, &a, -2.0).is_err());
    }
}
