//! Low-dimensional embeddings of diagram collections

pub mod kpca;
pub mod mds;

pub use self::kpca::*;
pub use self::mds::*;
