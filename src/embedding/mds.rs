//! Classical (Torgerson) multidimensional scaling of diagram distances
//!
//! B = -½ · J D⁽²⁾ J, where D⁽²⁾ holds squared distances and J is the centering
//! projector. The leading `k` eigenpairs of B give coordinates `sqrt(λ) · v`.

use crate::core::{GramMatrix, PdkError, PersistenceDiagram, Result};
use crate::distance::{DistanceMeasure, Metric};
use crate::gram::GramMatrixEngine;
use crate::utils::linalg::{double_center, leading_positive, sorted_symmetric_eigen};
use crate::utils::validation::{at_most, positive_count};
use nalgebra::DMatrix;

/// Result of classical MDS
#[derive(Debug, Clone, PartialEq)]
pub struct MdsEmbedding {
    /// One row per diagram
    pub coordinates: DMatrix<f64>,
    /// Eigenvalues of the double-centered matrix for the kept axes
    pub eigenvalues: Vec<f64>,
}

/// Classical MDS of a square distance matrix
pub fn classical_mds(distances: &GramMatrix, k: usize) -> Result<MdsEmbedding> {
    if !distances.is_square() {
        return Err(PdkError::InvalidParameter(format!(
            "distance matrix must be square, got {}x{}",
            distances.nrows(),
            distances.ncols()
        )));
    }
    positive_count("k", k)?;
    at_most("k", k, distances.nrows(), "diagrams")?;

    let squared = distances.to_dmatrix().map(|d| d * d);
    let (centered, _, _) = double_center(&squared);
    let (values, vectors) = sorted_symmetric_eigen(centered * -0.5)?;
    let (eigenvalues, vectors) = leading_positive(&values, &vectors, k, 1e-10)?;

    let mut coordinates = vectors;
    for (c, value) in eigenvalues.iter().enumerate() {
        coordinates.column_mut(c).scale_mut(value.sqrt());
    }
    Ok(MdsEmbedding {
        coordinates,
        eigenvalues,
    })
}

/// Classical MDS of a diagram collection under a chosen metric
#[derive(Debug, Clone)]
pub struct DiagramMDS {
    k: usize,
    dim: usize,
    metric: Metric,
    workers: Option<usize>,
}

impl DiagramMDS {
    /// Two-dimensional MDS of dimension-0 features under 2-Wasserstein
    pub fn new(k: usize) -> Self {
        Self {
            k,
            dim: 0,
            metric: Metric::default(),
            workers: None,
        }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn fit(&self, diagrams: &[PersistenceDiagram]) -> Result<MdsEmbedding> {
        self.metric.validate()?;
        positive_count("k", self.k)?;
        if diagrams.is_empty() {
            return Err(PdkError::EmptyCollection);
        }
        if diagrams.len() < 2 {
            return Err(PdkError::InvalidParameter(
                "MDS needs at least 2 diagrams".to_string(),
            ));
        }
        at_most("k", self.k, diagrams.len(), "diagrams")?;

        let distances = GramMatrixEngine::new(DistanceMeasure::new(self.dim, self.metric))
            .with_workers(self.workers)
            .self_gram(diagrams)?;
        classical_mds(&distances, self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DiagramPoint;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_line_distances() {
        // Points 0, 1, 3 on a line
        let d = GramMatrix::from_row_major(3, 3, vec![0.0, 1.0, 3.0, 1.0, 0.0, 2.0, 3.0, 2.0, 0.0]);
        let mds = classical_mds(&d, 1).unwrap();
        let x = mds.coordinates.column(0);
        assert_relative_eq!((x[0] - x[1]).abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!((x[1] - x[2]).abs(), 2.0, epsilon = 1e-9);
        assert_relative_eq!((x[0] - x[2]).abs(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_bad_k() {
        let d = GramMatrix::from_row_major(2, 2, vec![0.0, 1.0, 1.0, 0.0]);
        assert!(classical_mds(&d, 0).is_err());
        assert!(classical_mds(&d, 3).is_err());
        // A two-point configuration spans a single axis
        assert!(classical_mds(&d, 2).is_err());
    }

    #[test]
    fn test_diagram_mds() {
        let diagrams: Vec<PersistenceDiagram> = [1.0, 2.0, 4.0]
            .iter()
            .map(|&death| PersistenceDiagram::new(vec![DiagramPoint::new(0, 0.0, death)]).unwrap())
            .collect();
        let mds = DiagramMDS::new(1).fit(&diagrams).unwrap();
        assert_eq!(mds.coordinates.shape(), (3, 1));
        assert!(mds.eigenvalues[0] > 0.0);

        assert!(DiagramMDS::new(1).fit(&diagrams[..1]).is_err());
    }
}
