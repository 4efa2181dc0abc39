//! Core type definitions for persistence diagrams and kernel matrices

use crate::core::{PdkError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// A single topological feature: homological dimension, birth and death scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramPoint {
    pub dimension: usize,
    pub birth: f64,
    pub death: f64,
}

impl DiagramPoint {
    /// Create a new point (validated when it becomes part of a diagram)
    pub fn new(dimension: usize, birth: f64, death: f64) -> Self {
        Self {
            dimension,
            birth,
            death,
        }
    }

    /// Lifetime of the feature
    pub fn persistence(&self) -> f64 {
        self.death - self.birth
    }

    /// Orthogonal projection onto the diagonal birth = death
    pub fn diagonal_projection(&self) -> (f64, f64) {
        let mid = (self.birth + self.death) / 2.0;
        (mid, mid)
    }

    fn validate(&self) -> Result<()> {
        if !self.birth.is_finite() || !self.death.is_finite() {
            return Err(PdkError::diagram(format!(
                "birth and death must be finite, got ({}, {})",
                self.birth, self.death
            )));
        }
        if self.birth < 0.0 {
            return Err(PdkError::diagram(format!(
                "birth values must be non-negative, got {}",
                self.birth
            )));
        }
        if self.death < self.birth {
            return Err(PdkError::diagram(format!(
                "death ({}) must not be smaller than birth ({})",
                self.death, self.birth
            )));
        }
        Ok(())
    }
}

/// Validated persistence diagram
///
/// Construction goes through [`PersistenceDiagram::new`] or
/// [`PersistenceDiagram::from_rows`], so every value of this type is non-empty
/// and holds only finite points with `0 <= birth <= death`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DiagramPoint>", into = "Vec<DiagramPoint>")]
pub struct PersistenceDiagram {
    points: Vec<DiagramPoint>,
}

impl PersistenceDiagram {
    /// Create a diagram from points, rejecting empty or malformed input
    pub fn new(points: Vec<DiagramPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(PdkError::diagram("diagram must be non-empty"));
        }
        for point in &points {
            point.validate()?;
        }
        Ok(Self { points })
    }

    /// Normalize raw `(dimension, birth, death)` rows into a diagram
    ///
    /// The dimension column arrives as a real number from tabular sources, so it is
    /// checked to be a non-negative whole number here.
    pub fn from_rows(rows: &[[f64; 3]]) -> Result<Self> {
        let mut points = Vec::with_capacity(rows.len());
        for (row_idx, row) in rows.iter().enumerate() {
            if row.iter().any(|v| v.is_nan()) {
                return Err(PdkError::diagram(format!(
                    "row {row_idx} contains missing values"
                )));
            }
            let dimension = row[0];
            if dimension < 0.0 || dimension.fract() != 0.0 || !dimension.is_finite() {
                return Err(PdkError::diagram(format!(
                    "dimension must be a non-negative whole number, got {dimension} in row {row_idx}"
                )));
            }
            points.push(DiagramPoint::new(dimension as usize, row[1], row[2]));
        }
        Self::new(points)
    }

    /// All points of the diagram
    pub fn points(&self) -> &[DiagramPoint] {
        &self.points
    }

    /// Number of points across all dimensions
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a validated diagram
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `(birth, death)` pairs of the points in homological dimension `dim`
    pub fn dimension_points(&self, dim: usize) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter(|p| p.dimension == dim)
            .map(|p| (p.birth, p.death))
            .collect()
    }

    /// Highest homological dimension present
    pub fn max_dimension(&self) -> usize {
        self.points.iter().map(|p| p.dimension).max().unwrap_or(0)
    }
}

impl TryFrom<Vec<DiagramPoint>> for PersistenceDiagram {
    type Error = PdkError;

    fn try_from(points: Vec<DiagramPoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<PersistenceDiagram> for Vec<DiagramPoint> {
    fn from(diagram: PersistenceDiagram) -> Self {
        diagram.points
    }
}

/// Dense real matrix of pairwise kernel (or distance) values, stored row-major
///
/// Rows index the second collection and columns the first; for a self-Gram
/// matrix both are the same collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGramMatrix")]
pub struct GramMatrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawGramMatrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawGramMatrix> for GramMatrix {
    type Error = PdkError;

    fn try_from(raw: RawGramMatrix) -> Result<Self> {
        if raw.nrows.checked_mul(raw.ncols) != Some(raw.data.len()) {
            return Err(PdkError::SerializationError(format!(
                "matrix of shape {}x{} holds {} values",
                raw.nrows,
                raw.ncols,
                raw.data.len()
            )));
        }
        Ok(Self::from_row_major(raw.nrows, raw.ncols, raw.data))
    }
}

impl GramMatrix {
    pub(crate) fn from_row_major(nrows: usize, ncols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), nrows * ncols);
        Self { nrows, ncols, data }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Entry at row `i`, column `j`
    ///
    /// # Panics
    /// Panics if the index is out of bounds
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.nrows && j < self.ncols, "index out of bounds");
        self.data[i * self.ncols + j]
    }

    /// Row `i` as a contiguous slice
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.ncols.max(1)).take(self.nrows)
    }

    /// Exact (bitwise) symmetry check
    pub fn is_symmetric(&self) -> bool {
        self.is_square()
            && (0..self.nrows)
                .all(|i| (i + 1..self.ncols).all(|j| self.get(i, j) == self.get(j, i)))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy into an `nalgebra` matrix for decomposition
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.nrows, self.ncols, &self.data)
    }
}

/// Parameters shared by every Fisher-kernel computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelParams {
    /// Homological dimension the diagrams are restricted to
    pub dim: usize,
    /// Bandwidth of the Gaussian smoothing
    pub sigma: f64,
    /// Exponential decay applied to the Fisher distance
    pub t: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            dim: 0,
            sigma: 1.0,
            t: 1.0,
        }
    }
}

impl KernelParams {
    pub fn new(dim: usize, sigma: f64, t: f64) -> Self {
        Self { dim, sigma, t }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_t(mut self, t: f64) -> Self {
        self.t = t;
        self
    }

    /// Check `sigma > 0` and `t >= 0`, both finite
    pub fn validate(&self) -> Result<()> {
        crate::utils::validation::positive_real("sigma", self.sigma)?;
        crate::utils::validation::non_negative_real("t", self.t)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_creation() {
        let diagram = PersistenceDiagram::new(vec![
            DiagramPoint::new(0, 0.0, 1.0),
            DiagramPoint::new(1, 0.5, 2.0),
        ])
        .unwrap();

        assert_eq!(diagram.len(), 2);
        assert_eq!(diagram.max_dimension(), 1);
        assert_eq!(diagram.dimension_points(1), vec![(0.5, 2.0)]);
        assert!(diagram.dimension_points(2).is_empty());
    }

    #[test]
    fn test_empty_diagram_rejected() {
        let err = PersistenceDiagram::new(vec![]).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_invalid_points_rejected() {
        assert!(PersistenceDiagram::new(vec![DiagramPoint::new(0, -1.0, 1.0)]).is_err());
        assert!(PersistenceDiagram::new(vec![DiagramPoint::new(0, 2.0, 1.0)]).is_err());
        assert!(PersistenceDiagram::new(vec![DiagramPoint::new(0, 0.0, f64::INFINITY)]).is_err());
    }

    #[test]
    fn test_from_rows_validation() {
        let diagram = PersistenceDiagram::from_rows(&[[0.0, 0.0, 1.0], [1.0, 0.2, 0.4]]).unwrap();
        assert_eq!(diagram.points()[1].dimension, 1);

        let err = PersistenceDiagram::from_rows(&[[0.5, 0.0, 1.0]]).unwrap_err();
        assert!(err.to_string().contains("dimension"));

        let err = PersistenceDiagram::from_rows(&[[-1.0, 0.0, 1.0]]).unwrap_err();
        assert!(err.to_string().contains("dimension"));

        let err = PersistenceDiagram::from_rows(&[[0.0, f64::NAN, 1.0]]).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_diagram_serde_revalidates() {
        let diagram = PersistenceDiagram::new(vec![DiagramPoint::new(0, 0.0, 1.0)]).unwrap();
        let json = serde_json::to_string(&diagram).unwrap();
        let back: PersistenceDiagram = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diagram);

        let bad = r#"[{"dimension":0,"birth":3.0,"death":1.0}]"#;
        assert!(serde_json::from_str::<PersistenceDiagram>(bad).is_err());
        assert!(serde_json::from_str::<PersistenceDiagram>("[]").is_err());
    }

    #[test]
    fn test_diagonal_projection() {
        let p = DiagramPoint::new(0, 1.0, 3.0);
        assert_eq!(p.diagonal_projection(), (2.0, 2.0));
        assert_eq!(p.persistence(), 2.0);
    }

    #[test]
    fn test_gram_matrix_access() {
        let gram = GramMatrix::from_row_major(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(gram.get(1, 2), 6.0);
        assert_eq!(gram.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(gram.rows().count(), 2);
        assert!(!gram.is_square());
        assert!(!gram.is_symmetric());

        let m = gram.to_dmatrix();
        assert_eq!(m[(1, 0)], 4.0);
    }

    #[test]
    fn test_gram_matrix_serde_checks_shape() {
        let gram = GramMatrix::from_row_major(2, 2, vec![1.0, 0.5, 0.5, 1.0]);
        let json = serde_json::to_string(&gram).unwrap();
        let back: GramMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, gram);

        let short = r#"{"nrows":2,"ncols":3,"data":[1.0,2.0]}"#;
        let err = serde_json::from_str::<GramMatrix>(short).unwrap_err();
        assert!(err.to_string().contains("2x3 holds 2 values"));
    }

    #[test]
    fn test_kernel_params_validation() {
        assert!(KernelParams::default().validate().is_ok());
        assert!(KernelParams::default().with_t(0.0).validate().is_ok());

        let err = KernelParams::default().with_sigma(0.0).validate().unwrap_err();
        assert!(err.to_string().contains("sigma"));

        let err = KernelParams::default().with_t(-1.0).validate().unwrap_err();
        assert!(err.to_string().contains('t'));

        assert!(KernelParams::default()
            .with_sigma(f64::NAN)
            .validate()
            .is_err());
    }
}
