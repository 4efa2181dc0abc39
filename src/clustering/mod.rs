//! Clustering of persistence diagrams in the Fisher-kernel feature space

pub mod kkmeans;

pub use self::kkmeans::*;
