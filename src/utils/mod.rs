//! Utility functions shared by the kernel, embedding and clustering modules

/// Scalar parameter validation
///
/// Every public entry point runs its parameters through these helpers before any
/// diagram pair is evaluated, so failures name the offending parameter.
pub mod validation {
    use crate::core::{PdkError, Result};

    /// Require a finite, strictly positive real
    pub fn positive_real(name: &str, value: f64) -> Result<f64> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PdkError::InvalidParameter(format!(
                "{name} must be a positive finite number, got {value}"
            )));
        }
        Ok(value)
    }

    /// Require a finite, non-negative real
    pub fn non_negative_real(name: &str, value: f64) -> Result<f64> {
        if !value.is_finite() || value < 0.0 {
            return Err(PdkError::InvalidParameter(format!(
                "{name} must be a non-negative finite number, got {value}"
            )));
        }
        Ok(value)
    }

    /// Convert a real-valued input into a non-negative whole number
    pub fn whole_number(name: &str, value: f64) -> Result<usize> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(PdkError::InvalidParameter(format!(
                "{name} must be a non-negative whole number, got {value}"
            )));
        }
        Ok(value as usize)
    }

    /// Require a count of at least one
    pub fn positive_count(name: &str, value: usize) -> Result<usize> {
        if value == 0 {
            return Err(PdkError::InvalidParameter(format!(
                "{name} must be a positive whole number, got 0"
            )));
        }
        Ok(value)
    }

    /// Require a count that does not exceed the number of diagrams available
    pub fn at_most(name: &str, value: usize, limit: usize, what: &str) -> Result<usize> {
        if value > limit {
            return Err(PdkError::InvalidParameter(format!(
                "{name} ({value}) must not exceed the number of {what} ({limit})"
            )));
        }
        Ok(value)
    }
}

/// Dense linear algebra helpers on top of `nalgebra`
pub mod linalg {
    use crate::core::{PdkError, Result};
    use nalgebra::{DMatrix, SymmetricEigen};

    /// Row means of a square matrix (equal to the column means when symmetric)
    pub fn row_means(matrix: &DMatrix<f64>) -> Vec<f64> {
        let n = matrix.ncols() as f64;
        matrix
            .row_iter()
            .map(|row| row.iter().sum::<f64>() / n)
            .collect()
    }

    /// Double-center a symmetric matrix: `K - 1K - K1 + 1K1`
    ///
    /// Returns the centered matrix together with the row means and the grand mean
    /// it was centered with.
    pub fn double_center(matrix: &DMatrix<f64>) -> (DMatrix<f64>, Vec<f64>, f64) {
        let means = row_means(matrix);
        let grand_mean = means.iter().sum::<f64>() / means.len() as f64;
        let centered = DMatrix::from_fn(matrix.nrows(), matrix.ncols(), |i, j| {
            matrix[(i, j)] - means[i] - means[j] + grand_mean
        });
        (centered, means, grand_mean)
    }

    /// Symmetric eigendecomposition with eigenpairs sorted by descending eigenvalue
    pub fn sorted_symmetric_eigen(matrix: DMatrix<f64>) -> Result<(Vec<f64>, DMatrix<f64>)> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(PdkError::ComputationError(
                "cannot decompose a matrix with non-finite entries".to_string(),
            ));
        }

        let eigen = SymmetricEigen::new(matrix);
        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
        let columns: Vec<_> = order
            .iter()
            .map(|&i| eigen.eigenvectors.column(i).into_owned())
            .collect();
        Ok((values, DMatrix::from_columns(&columns)))
    }

    /// Keep the leading `k` eigenpairs, requiring each eigenvalue to exceed `tolerance`
    pub fn leading_positive(
        values: &[f64],
        vectors: &DMatrix<f64>,
        k: usize,
        tolerance: f64,
    ) -> Result<(Vec<f64>, DMatrix<f64>)> {
        if k > values.len() {
            return Err(PdkError::ComputationError(format!(
                "{k} eigenvectors requested from a decomposition of size {}",
                values.len()
            )));
        }
        for (idx, &value) in values.iter().take(k).enumerate() {
            if value <= tolerance {
                return Err(PdkError::ComputationError(format!(
                    "only {idx} non-trivial eigenvectors available, {k} requested (eigenvalue {value:e})"
                )));
            }
        }
        Ok((values[..k].to_vec(), vectors.columns(0, k).into_owned()))
    }
}
