//! High-level functional API
//!
//! Every entry point validates its parameters and diagrams before any parallel
//! work is dispatched. Defaults follow [`KernelParams::default`]: `dim = 0`,
//! `sigma = 1`, `t = 1`, and `workers = None` (available execution units - 1).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pdkernel::api;
//! use pdkernel::{DiagramPoint, KernelParams, PersistenceDiagram};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let diagrams = vec![
//!     PersistenceDiagram::new(vec![DiagramPoint::new(0, 2.0, 3.0)])?,
//!     PersistenceDiagram::new(vec![DiagramPoint::new(0, 2.0, 3.1)])?,
//!     PersistenceDiagram::new(vec![DiagramPoint::new(0, 2.0, 3.1), DiagramPoint::new(0, 5.0, 6.0)])?,
//! ];
//!
//! let gram = api::gram_matrix(&diagrams, None, KernelParams::default(), None)?;
//! let model = api::fit_kernel_pca(&diagrams, 2, KernelParams::default(), None)?;
//! let coords = api::project_kernel_pca(&model, &diagrams[..1], None)?;
//! println!("{} x {} Gram matrix, embedding {:?}", gram.nrows(), gram.ncols(), coords);
//! # Ok(())
//! # }
//! ```

use crate::clustering::{KernelClusterModel, KernelKMeans};
use crate::core::{GramMatrix, KernelParams, PersistenceDiagram, Result};
use crate::distance::{DistanceMeasure, Metric};
use crate::embedding::{DiagramMDS, KernelEmbeddingModel, KernelPCA, MdsEmbedding};
use crate::gram::GramMatrixEngine;
use crate::kernel::PersistenceFisherKernel;
use nalgebra::DMatrix;

/// Fisher kernel value between two diagrams
pub fn kernel_value(
    x: &PersistenceDiagram,
    y: &PersistenceDiagram,
    params: KernelParams,
) -> Result<f64> {
    crate::kernel::kernel_value(x, y, params)
}

/// Distance between two diagrams in homological dimension `dim`
pub fn diagram_distance(
    x: &PersistenceDiagram,
    y: &PersistenceDiagram,
    dim: usize,
    metric: &Metric,
) -> Result<f64> {
    crate::distance::diagram_distance(x, y, dim, metric)
}

/// Self-Gram matrix of `diagrams`, or the cross matrix with rows indexed by `other`
pub fn gram_matrix(
    diagrams: &[PersistenceDiagram],
    other: Option<&[PersistenceDiagram]>,
    params: KernelParams,
    workers: Option<usize>,
) -> Result<GramMatrix> {
    GramMatrixEngine::new(PersistenceFisherKernel::new(params)?)
        .with_workers(workers)
        .compute(diagrams, other)
}

/// Pairwise distance matrix, laid out like [`gram_matrix`]
pub fn distance_matrix(
    diagrams: &[PersistenceDiagram],
    other: Option<&[PersistenceDiagram]>,
    dim: usize,
    metric: Metric,
    workers: Option<usize>,
) -> Result<GramMatrix> {
    GramMatrixEngine::new(DistanceMeasure::new(dim, metric))
        .with_workers(workers)
        .compute(diagrams, other)
}

/// Classical MDS of the diagrams' pairwise distances
pub fn diagram_mds(
    diagrams: &[PersistenceDiagram],
    k: usize,
    dim: usize,
    metric: Metric,
    workers: Option<usize>,
) -> Result<MdsEmbedding> {
    DiagramMDS::new(k)
        .with_dim(dim)
        .with_metric(metric)
        .with_workers(workers)
        .fit(diagrams)
}

pub fn fit_kernel_pca(
    diagrams: &[PersistenceDiagram],
    num_components: usize,
    params: KernelParams,
    workers: Option<usize>,
) -> Result<KernelEmbeddingModel> {
    KernelPCA::new(num_components)
        .with_params(params)
        .with_workers(workers)
        .fit(diagrams)
}

/// Coordinates of new diagrams in a fitted embedding (one row per diagram)
pub fn project_kernel_pca(
    model: &KernelEmbeddingModel,
    diagrams: &[PersistenceDiagram],
    workers: Option<usize>,
) -> Result<DMatrix<f64>> {
    model.project(diagrams, workers)
}

pub fn fit_kernel_kmeans(
    diagrams: &[PersistenceDiagram],
    num_clusters: usize,
    params: KernelParams,
    workers: Option<usize>,
) -> Result<KernelClusterModel> {
    KernelKMeans::new(num_clusters)
        .with_params(params)
        .with_workers(workers)
        .fit(diagrams)
}

/// Nearest-cluster labels of new diagrams
pub fn assign_kernel_kmeans(
    model: &KernelClusterModel,
    diagrams: &[PersistenceDiagram],
    workers: Option<usize>,
) -> Result<Vec<usize>> {
    model.assign(diagrams, workers)
}

/// Convenience functions working from CSV files with default parameters
pub mod quick {
    use super::*;
    use crate::data::DiagramCsv;
    use std::path::Path;

    /// Load every diagram of a CSV file
    pub fn load_diagrams<P: AsRef<Path>>(path: P) -> Result<Vec<PersistenceDiagram>> {
        Ok(DiagramCsv::from_file(path)?.into_diagrams())
    }

    /// Default Fisher-kernel Gram matrix of a CSV file
    pub fn gram_csv<P: AsRef<Path>>(path: P) -> Result<GramMatrix> {
        gram_matrix(&load_diagrams(path)?, None, KernelParams::default(), None)
    }

    /// Kernel PCA on a CSV file with default kernel parameters
    pub fn kernel_pca_csv<P: AsRef<Path>>(
        path: P,
        num_components: usize,
    ) -> Result<KernelEmbeddingModel> {
        fit_kernel_pca(&load_diagrams(path)?, num_components, KernelParams::default(), None)
    }

    /// Kernel k-means on a CSV file with default kernel parameters
    pub fn kernel_kmeans_csv<P: AsRef<Path>>(
        path: P,
        num_clusters: usize,
    ) -> Result<KernelClusterModel> {
        fit_kernel_kmeans(&load_diagrams(path)?, num_clusters, KernelParams::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DiagramPoint;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn diagrams() -> Vec<PersistenceDiagram> {
        [1.0, 1.1, 4.0, 4.2]
            .iter()
            .map(|&death| PersistenceDiagram::new(vec![DiagramPoint::new(0, 0.0, death)]).unwrap())
            .collect()
    }

    #[test]
    fn test_gram_and_distance_matrices() {
        let d = diagrams();
        let gram = gram_matrix(&d, None, KernelParams::default(), Some(2)).unwrap();
        let dist = distance_matrix(&d, None, 0, Metric::fisher(1.0), Some(2)).unwrap();

        // Gram entries are exp(-t * Fisher distance)
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(gram.get(i, j), (-dist.get(i, j)).exp());
            }
        }
    }

    #[test]
    fn test_kernel_value_matches_gram() {
        let d = diagrams();
        let gram = gram_matrix(&d, None, KernelParams::default(), None).unwrap();
        let k = kernel_value(&d[0], &d[2], KernelParams::default()).unwrap();
        assert_eq!(gram.get(0, 2), k);
    }

    #[test]
    fn test_fit_and_project_roundtrip() {
        let d = diagrams();
        let pca = fit_kernel_pca(&d, 1, KernelParams::default(), None).unwrap();
        assert_eq!(&project_kernel_pca(&pca, &d, None).unwrap(), pca.coordinates());

        let km = fit_kernel_kmeans(&d, 2, KernelParams::default(), None).unwrap();
        assert_eq!(assign_kernel_kmeans(&km, &d, None).unwrap(), km.labels());
    }

    #[test]
    fn test_diagram_mds() {
        let mds = diagram_mds(&diagrams(), 1, 0, Metric::wasserstein(), None).unwrap();
        assert_eq!(mds.coordinates.nrows(), 4);
    }

    #[test]
    fn test_quick_functions() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "diagram,dimension,birth,death").expect("Failed to write");
        writeln!(file, "a,0,0.0,1.0").expect("Failed to write");
        writeln!(file, "b,0,0.0,1.1").expect("Failed to write");
        writeln!(file, "c,0,0.0,4.0").expect("Failed to write");
        file.flush().expect("Failed to flush");

        let gram = quick::gram_csv(file.path()).unwrap();
        assert_eq!(gram.nrows(), 3);
        let model = quick::kernel_kmeans_csv(file.path(), 2).unwrap();
        assert_eq!(model.labels()[0], model.labels()[1]);
        assert!(quick::kernel_pca_csv(file.path(), 1).is_ok());
    }
}
