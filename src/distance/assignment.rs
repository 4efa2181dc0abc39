//! Assignment problem solvers for diagram matching
//!
//! Square cost matrices are stored row-major. The min-sum case is handed to the
//! `lsap` linear sum assignment solver. The min-max (bottleneck) case
//! binary-searches the sorted cost values, testing each threshold with a 0/1
//! min-sum assignment.

use crate::core::{PdkError, Result};

/// Optimal assignment of rows to columns
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Sum of the selected costs
    pub total_cost: f64,
    /// `columns[row]` is the column matched to `row`
    pub columns: Vec<usize>,
}

fn check_square(costs: &[f64], n: usize) -> Result<()> {
    if costs.len() != n * n {
        return Err(PdkError::ComputationError(format!(
            "cost matrix has {} entries, expected {n}x{n}",
            costs.len()
        )));
    }
    if costs.iter().any(|c| !c.is_finite()) {
        return Err(PdkError::ComputationError(
            "cost matrix contains non-finite entries".to_string(),
        ));
    }
    Ok(())
}

/// Minimum-cost perfect matching on an `n x n` cost matrix
pub fn solve_min_sum(costs: &[f64], n: usize) -> Result<Assignment> {
    check_square(costs, n)?;
    if n == 0 {
        return Ok(Assignment {
            total_cost: 0.0,
            columns: Vec::new(),
        });
    }

    let (rows, cols) = lsap::solve(n, n, &costs.to_vec(), false).map_err(|e| {
        PdkError::ComputationError(format!("assignment solver failed: {e:?}"))
    })?;
    if rows.len() != n {
        return Err(PdkError::ComputationError(format!(
            "assignment solver matched {} of {n} rows",
            rows.len()
        )));
    }

    let mut columns = vec![0usize; n];
    for (&row, &col) in rows.iter().zip(&cols) {
        columns[row] = col;
    }
    let total_cost = columns
        .iter()
        .enumerate()
        .map(|(i, &j)| costs[i * n + j])
        .sum();

    Ok(Assignment {
        total_cost,
        columns,
    })
}

/// Smallest achievable maximum edge cost over all perfect matchings
pub fn solve_min_max(costs: &[f64], n: usize) -> Result<f64> {
    check_square(costs, n)?;
    if n == 0 {
        return Ok(0.0);
    }

    let mut thresholds = costs.to_vec();
    thresholds.sort_by(f64::total_cmp);
    thresholds.dedup();

    // The largest threshold admits the complete bipartite graph
    let (mut lo, mut hi) = (0, thresholds.len() - 1);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if has_perfect_matching(costs, n, thresholds[mid])? {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Ok(thresholds[lo])
}

/// Whether the graph with edges `cost <= threshold` has a perfect matching
///
/// Edges above the threshold cost 1 and admitted edges cost 0, so a perfect
/// matching inside the graph exists iff the optimal assignment costs 0.
fn has_perfect_matching(costs: &[f64], n: usize, threshold: f64) -> Result<bool> {
    let blocked: Vec<f64> = costs
        .iter()
        .map(|&c| if c > threshold { 1.0 } else { 0.0 })
        .collect();
    Ok(solve_min_sum(&blocked, n)?.total_cost == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_sum_small() {
        // Optimal: row0->col1 (1), row1->col0 (2), row2->col2 (2) = 5
        let costs = vec![4.0, 1.0, 3.0, 2.0, 0.0, 5.0, 3.0, 2.0, 2.0];
        let result = solve_min_sum(&costs, 3).unwrap();
        assert_eq!(result.total_cost, 5.0);
        assert_eq!(result.columns, vec![1, 0, 2]);
    }

    #[test]
    fn test_min_sum_identity_is_free() {
        let costs = vec![0.0, 1.0, 1.0, 0.0];
        let result = solve_min_sum(&costs, 2).unwrap();
        assert_eq!(result.total_cost, 0.0);
        assert_eq!(result.columns, vec![0, 1]);
    }

    #[test]
    fn test_min_sum_matches_brute_force() {
        let costs = vec![
            7.0, 5.3, 2.1, 9.0, //
            1.2, 8.8, 6.4, 3.3, //
            4.4, 2.2, 7.7, 6.6, //
            3.9, 1.1, 5.5, 8.1,
        ];
        let n = 4;
        let mut best = f64::INFINITY;
        let mut perm = [0usize, 1, 2, 3];
        permute(&mut perm, 0, &mut |p| {
            let cost: f64 = p.iter().enumerate().map(|(i, &j)| costs[i * n + j]).sum();
            best = best.min(cost);
        });

        let result = solve_min_sum(&costs, n).unwrap();
        assert!((result.total_cost - best).abs() < 1e-12);
    }

    fn permute(items: &mut [usize; 4], k: usize, visit: &mut dyn FnMut(&[usize; 4])) {
        if k == items.len() {
            visit(items);
            return;
        }
        for i in k..items.len() {
            items.swap(k, i);
            permute(items, k + 1, visit);
            items.swap(k, i);
        }
    }

    #[test]
    fn test_min_sum_empty() {
        let result = solve_min_sum(&[], 0).unwrap();
        assert_eq!(result.total_cost, 0.0);
        assert!(result.columns.is_empty());
    }

    #[test]
    fn test_rejects_non_finite_costs() {
        assert!(solve_min_sum(&[f64::NAN], 1).is_err());
        assert!(solve_min_max(&[f64::INFINITY], 1).is_err());
        assert!(solve_min_sum(&[1.0, 2.0], 2).is_err());
    }

    #[test]
    fn test_min_max_needs_blocked_edge() {
        // The three cheapest edges share columns, so the best matching uses 7.0
        let costs = vec![
            9.0, 2.0, 8.0, //
            1.0, 9.0, 7.0, //
            6.0, 3.0, 9.0,
        ];
        assert_eq!(solve_min_max(&costs, 3).unwrap(), 7.0);
    }

    #[test]
    fn test_min_max() {
        // Sum-optimal and max-optimal matchings differ here
        let costs = vec![1.0, 4.0, 3.5, 10.0];
        assert_eq!(solve_min_max(&costs, 2).unwrap(), 4.0);
        assert_eq!(solve_min_sum(&costs, 2).unwrap().total_cost, 7.5);
    }
}
