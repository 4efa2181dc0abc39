//! Model serialization and persistence
//!
//! Fitted models are written as pretty-printed JSON inside an envelope that
//! records what kind of model it is and which library version produced it.
//! Training diagrams, label ranges and matrix shapes are validated again when
//! a model is loaded.

use crate::clustering::KernelClusterModel;
use crate::core::{PdkError, Result};
use crate::embedding::KernelEmbeddingModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Kind tag stored in the metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    KernelPca,
    KernelKmeans,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KernelPca => write!(f, "kernel PCA"),
            Self::KernelKmeans => write!(f, "kernel k-means"),
        }
    }
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    pub model_kind: ModelKind,
}

impl ModelMetadata {
    fn new(model_kind: ModelKind) -> Self {
        Self {
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            model_kind,
        }
    }
}

/// Fitted model payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "model", rename_all = "snake_case")]
pub enum FittedModel {
    KernelPca(KernelEmbeddingModel),
    KernelKmeans(KernelClusterModel),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::KernelPca(_) => ModelKind::KernelPca,
            Self::KernelKmeans(_) => ModelKind::KernelKmeans,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::KernelPca(model) => model.validate(),
            Self::KernelKmeans(model) => model.validate(),
        }
    }
}

/// A fitted model together with its metadata, as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedModel {
    pub metadata: ModelMetadata,
    pub model: FittedModel,
}

impl From<KernelEmbeddingModel> for SavedModel {
    fn from(model: KernelEmbeddingModel) -> Self {
        Self::new(FittedModel::KernelPca(model))
    }
}

impl From<KernelClusterModel> for SavedModel {
    fn from(model: KernelClusterModel) -> Self {
        Self::new(FittedModel::KernelKmeans(model))
    }
}

impl SavedModel {
    pub fn new(model: FittedModel) -> Self {
        Self {
            metadata: ModelMetadata::new(model.kind()),
            model,
        }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(PdkError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| PdkError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(PdkError::IoError)?;
        let reader = BufReader::new(file);
        let saved: Self = serde_json::from_reader(reader)
            .map_err(|e| PdkError::SerializationError(e.to_string()))?;
        if saved.metadata.model_kind != saved.model.kind() {
            return Err(PdkError::SerializationError(format!(
                "metadata says {} but the payload is a {} model",
                saved.metadata.model_kind,
                saved.model.kind()
            )));
        }
        saved.model.validate()?;
        Ok(saved)
    }

    pub fn into_kernel_pca(self) -> Result<KernelEmbeddingModel> {
        match self.model {
            FittedModel::KernelPca(model) => Ok(model),
            other => Err(wrong_kind(ModelKind::KernelPca, other.kind())),
        }
    }

    pub fn into_kernel_kmeans(self) -> Result<KernelClusterModel> {
        match self.model {
            FittedModel::KernelKmeans(model) => Ok(model),
            other => Err(wrong_kind(ModelKind::KernelKmeans, other.kind())),
        }
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== {} Model Summary ===", self.metadata.model_kind);
        match &self.model {
            FittedModel::KernelPca(model) => {
                print_kernel_params(model.params());
                println!("Training Diagrams: {}", model.training_diagrams().len());
                println!("Components: {}", model.num_components());
                println!("Eigenvalues: {:?}", model.eigenvalues());
                println!(
                    "Explained Variance Ratio: {:?}",
                    model.explained_variance_ratio()
                );
            }
            FittedModel::KernelKmeans(model) => {
                print_kernel_params(model.params());
                println!("Training Diagrams: {}", model.training_diagrams().len());
                println!("Clusters: {}", model.num_clusters());
                println!("Cluster Sizes: {:?}", model.cluster_sizes());
                println!("Within-cluster SS: {:?}", model.withinss());
                println!(
                    "Iterations: {} ({})",
                    model.iterations(),
                    if model.converged() {
                        "converged"
                    } else {
                        "iteration cap reached"
                    }
                );
            }
        }
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
    }
}

fn print_kernel_params(params: crate::core::KernelParams) {
    println!("Kernel Parameters:");
    println!("  dim: {}", params.dim);
    println!("  sigma: {}", params.sigma);
    println!("  t: {}", params.t);
}

fn wrong_kind(expected: ModelKind, found: ModelKind) -> PdkError {
    PdkError::InvalidParameter(format!(
        "model file holds a {found} model, expected a {expected} model"
    ))
}
