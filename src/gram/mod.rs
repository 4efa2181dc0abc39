//! Parallel assembly of Gram and distance matrices
//!
//! Every matrix entry is an independent evaluation of a [`PairwiseMeasure`] on
//! two read-only diagrams, so the result does not depend on the worker count or
//! on the order in which tasks complete.
//!
//! - Self case (`n x n`): only the `n(n-1)/2` strictly upper pairs are
//!   evaluated; each value is written to `(i, j)` and `(j, i)` and the diagonal
//!   is set to the measure's self value.
//! - Cross case (`m x n`, rows = other collection): the parallel axis is the
//!   larger of the two collections and the other axis is a sequential inner pass.

pub mod pool;

pub use self::pool::{available_workers, default_workers, resolve_workers, WorkerPool};

use crate::core::{GramMatrix, PairwiseMeasure, PdkError, PersistenceDiagram, Result};
use log::debug;
use std::time::Instant;

/// Builds pairwise matrices for a measure over collections of diagrams
#[derive(Debug, Clone)]
pub struct GramMatrixEngine<M: PairwiseMeasure> {
    measure: M,
    workers: Option<usize>,
}

impl<M: PairwiseMeasure> GramMatrixEngine<M> {
    /// Create an engine using the default worker count
    pub fn new(measure: M) -> Self {
        Self {
            measure,
            workers: None,
        }
    }

    /// Set the number of workers (clamped to the available execution units)
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn measure(&self) -> &M {
        &self.measure
    }

    /// Self matrix when `other` is `None`, cross matrix otherwise
    pub fn compute(
        &self,
        diagrams: &[PersistenceDiagram],
        other: Option<&[PersistenceDiagram]>,
    ) -> Result<GramMatrix> {
        match other {
            None => self.self_gram(diagrams),
            Some(other) => self.cross_gram(diagrams, other),
        }
    }

    /// Symmetric `n x n` matrix of a collection against itself
    pub fn self_gram(&self, diagrams: &[PersistenceDiagram]) -> Result<GramMatrix> {
        self.measure.validate()?;
        if diagrams.is_empty() {
            return Err(PdkError::EmptyCollection);
        }

        let n = diagrams.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();

        let start = Instant::now();
        let pool = WorkerPool::acquire(self.workers)?;
        let values = pool.map(&pairs, |&(i, j)| {
            self.measure.evaluate(&diagrams[i], &diagrams[j])
        })?;
        drop(pool);

        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = self.measure.self_value();
        }
        for (&(i, j), &value) in pairs.iter().zip(&values) {
            data[i * n + j] = value;
            data[j * n + i] = value;
        }

        debug!(
            "self matrix {n}x{n}: {} pair evaluations in {:?}",
            pairs.len(),
            start.elapsed()
        );
        Ok(GramMatrix::from_row_major(n, n, data))
    }

    /// `m x n` matrix with rows indexed by `other` and columns by `diagrams`
    pub fn cross_gram(
        &self,
        diagrams: &[PersistenceDiagram],
        other: &[PersistenceDiagram],
    ) -> Result<GramMatrix> {
        self.measure.validate()?;
        if diagrams.is_empty() || other.is_empty() {
            return Err(PdkError::EmptyCollection);
        }

        let (m, n) = (other.len(), diagrams.len());
        let start = Instant::now();
        let pool = WorkerPool::acquire(self.workers)?;

        let data = if m >= n {
            let rows = pool.map_indices(m, |i| {
                diagrams
                    .iter()
                    .map(|column| self.measure.evaluate(&other[i], column))
                    .collect::<Result<Vec<f64>>>()
            })?;
            rows.concat()
        } else {
            let columns = pool.map_indices(n, |j| {
                other
                    .iter()
                    .map(|row| self.measure.evaluate(row, &diagrams[j]))
                    .collect::<Result<Vec<f64>>>()
            })?;
            let mut data = vec![0.0; m * n];
            for (j, column) in columns.iter().enumerate() {
                for (i, &value) in column.iter().enumerate() {
                    data[i * n + j] = value;
                }
            }
            data
        };
        drop(pool);

        debug!(
            "cross matrix {m}x{n}: {} pair evaluations in {:?}",
            m * n,
            start.elapsed()
        );
        Ok(GramMatrix::from_row_major(m, n, data))
    }
}
