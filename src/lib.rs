//! Kernel methods for persistence diagrams
//!
//! Wasserstein and Fisher distances between diagrams, the persistence Fisher
//! kernel, parallel Gram matrix assembly, and kernel PCA / kernel k-means with
//! out-of-sample projection and assignment of new diagrams.

pub mod api;
pub mod clustering;
pub mod core;
pub mod data;
pub mod distance;
pub mod embedding;
pub mod gram;
pub mod kernel;
pub mod persistence;
pub mod utils;

// Re-export main types for convenience
pub use crate::clustering::{Init, KMeansConfig, KernelClusterModel, KernelKMeans};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{PdkError, Result};
pub use crate::data::DiagramCsv;
pub use crate::distance::{GroundMetric, Metric, Order, WassersteinConfig};
pub use crate::embedding::{DiagramMDS, KernelEmbeddingModel, KernelPCA, MdsEmbedding, PcaConfig};
pub use crate::gram::GramMatrixEngine;
pub use crate::kernel::PersistenceFisherKernel;
pub use crate::persistence::SavedModel;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
