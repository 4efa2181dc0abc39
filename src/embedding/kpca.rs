//! Kernel PCA over persistence diagrams
//!
//! The self-Gram matrix K of the training diagrams is double-centered,
//! `Kc = K - 1K - K1 + 1K1`, and eigendecomposed. With eigenpairs `(λ_c, v_c)`
//! sorted by decreasing λ, the embedding of a diagram whose cross-kernel row
//! against the training set is `k` reads
//!
//! ```text
//! z_c = Σ_j kc_j · v_c[j] / sqrt(λ_c),   kc_j = k_j - mean_j - mean(k) + grand_mean
//! ```
//!
//! where `mean_j` and `grand_mean` are captured from K at fit time. Training
//! coordinates are produced by this same projection applied to the rows of K,
//! so projecting the training collection again reproduces them exactly.
//!
//! Eigenvectors are only defined up to sign. Coordinates of a component may flip
//! sign between platforms or library versions; compare them up to a per-component
//! factor (for example by dividing by the first coordinate).

use crate::core::{GramMatrix, KernelParams, PdkError, PersistenceDiagram, Result};
use crate::gram::GramMatrixEngine;
use crate::kernel::PersistenceFisherKernel;
use crate::utils::linalg::{double_center, leading_positive, sorted_symmetric_eigen};
use crate::utils::validation::{at_most, positive_count};
use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Numerical settings of the decomposition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Eigenvalues at or below this value count as trivial
    pub eigenvalue_tolerance: f64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        Self {
            eigenvalue_tolerance: 1e-10,
        }
    }
}

/// Kernel PCA builder
#[derive(Debug, Clone)]
pub struct KernelPCA {
    num_components: usize,
    params: KernelParams,
    workers: Option<usize>,
    config: PcaConfig,
}

impl KernelPCA {
    /// Kernel PCA keeping `num_components` components with dim = 0, sigma = 1, t = 1
    pub fn new(num_components: usize) -> Self {
        Self {
            num_components,
            params: KernelParams::default(),
            workers: None,
            config: PcaConfig::default(),
        }
    }

    pub fn with_params(mut self, params: KernelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.params.dim = dim;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.params.sigma = sigma;
        self
    }

    pub fn with_t(mut self, t: f64) -> Self {
        self.params.t = t;
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_config(mut self, config: PcaConfig) -> Self {
        self.config = config;
        self
    }

    /// Fit the embedding on a training collection
    pub fn fit(&self, diagrams: &[PersistenceDiagram]) -> Result<KernelEmbeddingModel> {
        let kernel = PersistenceFisherKernel::new(self.params)?;
        let k = positive_count("num_components", self.num_components)?;
        if diagrams.is_empty() {
            return Err(PdkError::EmptyCollection);
        }
        if diagrams.len() < 2 {
            return Err(PdkError::InvalidParameter(
                "kernel PCA needs at least 2 training diagrams".to_string(),
            ));
        }
        at_most("num_components", k, diagrams.len(), "training diagrams")?;

        let gram = GramMatrixEngine::new(kernel)
            .with_workers(self.workers)
            .self_gram(diagrams)?;

        let (centered, training_means, grand_mean) = double_center(&gram.to_dmatrix());
        let (values, vectors) = sorted_symmetric_eigen(centered)?;
        let total_variance: f64 = values.iter().filter(|&&v| v > 0.0).sum();
        let (eigenvalues, eigenvectors) =
            leading_positive(&values, &vectors, k, self.config.eigenvalue_tolerance)?;

        let mut model = KernelEmbeddingModel {
            params: self.params,
            num_components: k,
            eigenvalues,
            eigenvectors,
            coordinates: DMatrix::zeros(0, k),
            training_means,
            grand_mean,
            total_variance,
            diagrams: diagrams.to_vec(),
        };
        model.coordinates = model.project_gram(&gram)?;

        info!(
            "kernel PCA fitted on {} diagrams: {} components, eigenvalues {:?}",
            diagrams.len(),
            k,
            model.eigenvalues
        );
        Ok(model)
    }
}

/// Fitted kernel PCA: eigenpairs, training coordinates and centering statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelEmbeddingModel {
    params: KernelParams,
    num_components: usize,
    eigenvalues: Vec<f64>,
    /// Unit eigenvectors of the centered Gram matrix, one column per component
    eigenvectors: DMatrix<f64>,
    /// Training embedding, one row per diagram
    coordinates: DMatrix<f64>,
    training_means: Vec<f64>,
    grand_mean: f64,
    total_variance: f64,
    diagrams: Vec<PersistenceDiagram>,
}

impl KernelEmbeddingModel {
    pub fn params(&self) -> KernelParams {
        self.params
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn eigenvectors(&self) -> &DMatrix<f64> {
        &self.eigenvectors
    }

    /// Coordinates of the training diagrams (n x num_components)
    pub fn coordinates(&self) -> &DMatrix<f64> {
        &self.coordinates
    }

    /// Column means of the training Gram matrix
    pub fn training_means(&self) -> &[f64] {
        &self.training_means
    }

    pub fn grand_mean(&self) -> f64 {
        self.grand_mean
    }

    pub fn training_diagrams(&self) -> &[PersistenceDiagram] {
        &self.diagrams
    }

    /// Check matrix shapes against the training set, as a deserialized model may not match
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        let n = self.diagrams.len();
        let k = self.num_components;
        let inconsistent = |message: String| {
            PdkError::SerializationError(format!("inconsistent kernel PCA model: {message}"))
        };
        if k == 0 || n == 0 {
            return Err(inconsistent(format!("{k} components over {n} training diagrams")));
        }
        if self.eigenvalues.len() != k {
            return Err(inconsistent(format!(
                "{} eigenvalues for {k} components",
                self.eigenvalues.len()
            )));
        }
        if let Some(value) = self.eigenvalues.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(inconsistent(format!("eigenvalue {value} is not positive")));
        }
        for (name, matrix) in [("eigenvectors", &self.eigenvectors), ("coordinates", &self.coordinates)] {
            if matrix.shape() != (n, k) {
                return Err(inconsistent(format!(
                    "{name} are {}x{}, expected {n}x{k}",
                    matrix.nrows(),
                    matrix.ncols()
                )));
            }
        }
        if self.training_means.len() != n {
            return Err(inconsistent(format!(
                "{} column means for {n} training diagrams",
                self.training_means.len()
            )));
        }
        Ok(())
    }

    /// Share of the centered Gram matrix's positive spectrum kept by each component
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        if self.total_variance <= 0.0 {
            return vec![0.0; self.eigenvalues.len()];
        }
        self.eigenvalues
            .iter()
            .map(|v| v / self.total_variance)
            .collect()
    }

    /// Embed new diagrams using their cross-kernel values against the training set
    pub fn project(
        &self,
        diagrams: &[PersistenceDiagram],
        workers: Option<usize>,
    ) -> Result<DMatrix<f64>> {
        let kernel = PersistenceFisherKernel::new(self.params)?;
        if diagrams.is_empty() {
            return Err(PdkError::EmptyCollection);
        }
        let cross = GramMatrixEngine::new(kernel)
            .with_workers(workers)
            .cross_gram(&self.diagrams, diagrams)?;
        self.project_gram(&cross)
    }

    /// Embed rows of a precomputed cross-kernel matrix (rows = new, columns = training)
    pub fn project_gram(&self, cross: &GramMatrix) -> Result<DMatrix<f64>> {
        let n = self.training_means.len();
        if cross.ncols() != n {
            return Err(PdkError::InvalidParameter(format!(
                "cross-kernel matrix has {} columns, model was trained on {n} diagrams",
                cross.ncols()
            )));
        }

        let scales: Vec<f64> = self.eigenvalues.iter().map(|v| v.sqrt()).collect();
        let mut coordinates = DMatrix::zeros(cross.nrows(), self.num_components);

        for (i, row) in cross.rows().enumerate() {
            let row_mean = row.iter().sum::<f64>() / n as f64;
            let centered: Vec<f64> = row
                .iter()
                .zip(&self.training_means)
                .map(|(k, mean)| k - mean - row_mean + self.grand_mean)
                .collect();

            for (c, scale) in scales.iter().enumerate() {
                let dot: f64 = centered
                    .iter()
                    .zip(self.eigenvectors.column(c).iter())
                    .map(|(k, v)| k * v)
                    .sum();
                coordinates[(i, c)] = dot / scale;
            }
        }
        Ok(coordinates)
    }
}
