//! Positive-definite kernels on persistence diagrams

pub mod fisher;

pub use self::fisher::*;
