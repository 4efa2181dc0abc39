//! Loading diagram collections from tabular files

pub mod csv;

pub use self::csv::*;
