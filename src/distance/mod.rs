//! Distances between persistence diagrams
//!
//! Both metrics operate on the points of a single homological dimension. Before
//! a metric is evaluated the two point sets are sorted and put in a canonical
//! order, which makes every distance exactly symmetric (bit for bit) and exactly
//! zero for identical multisets, whatever order the points were recorded in.

pub mod assignment;
pub mod fisher;
pub mod wasserstein;

pub use self::fisher::fisher_distance;
pub use self::wasserstein::{wasserstein_distance, GroundMetric, Order, WassersteinConfig};

use crate::core::{PairwiseMeasure, PdkError, PersistenceDiagram, Result};
use crate::utils::validation::positive_real;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Metric selector with its configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    /// Optimal-transport distance (p-Wasserstein or bottleneck)
    Wasserstein(WassersteinConfig),
    /// Persistence Fisher distance with Gaussian bandwidth `sigma`
    Fisher { sigma: f64 },
}

impl Default for Metric {
    fn default() -> Self {
        Self::Wasserstein(WassersteinConfig::default())
    }
}

impl Metric {
    /// 2-Wasserstein with the L-infinity ground metric
    pub fn wasserstein() -> Self {
        Self::default()
    }

    pub fn fisher(sigma: f64) -> Self {
        Self::Fisher { sigma }
    }

    /// Build a metric from its name, `p` (Wasserstein order) and `sigma` (Fisher bandwidth)
    pub fn from_name(name: &str, p: f64, sigma: f64) -> Result<Self> {
        let metric = match name.parse::<MetricKind>()? {
            MetricKind::Wasserstein => Self::Wasserstein(WassersteinConfig::new(
                Order::from_p(p)?,
                GroundMetric::LInfinity,
            )),
            MetricKind::Fisher => Self::fisher(sigma),
        };
        metric.validate()?;
        Ok(metric)
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Wasserstein(_) => MetricKind::Wasserstein,
            Self::Fisher { .. } => MetricKind::Fisher,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Wasserstein(config) => config.validate(),
            Self::Fisher { sigma } => positive_real("sigma", *sigma).map(|_| ()),
        }
    }
}

/// Name of a supported metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Wasserstein,
    Fisher,
}

impl FromStr for MetricKind {
    type Err = PdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wasserstein" => Ok(Self::Wasserstein),
            "fisher" => Ok(Self::Fisher),
            other => Err(PdkError::InvalidParameter(format!(
                "unsupported metric '{other}': expected 'wasserstein' or 'fisher'"
            ))),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wasserstein => write!(f, "wasserstein"),
            Self::Fisher => write!(f, "fisher"),
        }
    }
}

/// Distance between two diagrams restricted to homological dimension `dim`
pub fn diagram_distance(
    x: &PersistenceDiagram,
    y: &PersistenceDiagram,
    dim: usize,
    metric: &Metric,
) -> Result<f64> {
    metric.validate()?;
    point_set_distance(x.dimension_points(dim), y.dimension_points(dim), metric)
}

fn point_set_distance(
    mut a: Vec<(f64, f64)>,
    mut b: Vec<(f64, f64)>,
    metric: &Metric,
) -> Result<f64> {
    a.sort_by(cmp_point);
    b.sort_by(cmp_point);

    match cmp_point_sets(&a, &b) {
        Ordering::Equal => return Ok(0.0),
        Ordering::Greater => std::mem::swap(&mut a, &mut b),
        Ordering::Less => {}
    }

    let distance = match metric {
        Metric::Wasserstein(config) => wasserstein_distance(&a, &b, config)?,
        Metric::Fisher { sigma } => fisher_distance(&a, &b, *sigma)?,
    };

    if !distance.is_finite() {
        return Err(PdkError::ComputationError(format!(
            "{} distance evaluated to {distance}",
            metric.kind()
        )));
    }
    Ok(distance)
}

fn cmp_point(p: &(f64, f64), q: &(f64, f64)) -> Ordering {
    p.0.total_cmp(&q.0).then(p.1.total_cmp(&q.1))
}

fn cmp_point_sets(a: &[(f64, f64)], b: &[(f64, f64)]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(p, q)| cmp_point(p, q))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Pairwise diagram distance, usable by the Gram engine to build distance matrices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceMeasure {
    pub dim: usize,
    pub metric: Metric,
}

impl DistanceMeasure {
    pub fn new(dim: usize, metric: Metric) -> Self {
        Self { dim, metric }
    }
}

impl PairwiseMeasure for DistanceMeasure {
    fn evaluate(&self, x: &PersistenceDiagram, y: &PersistenceDiagram) -> Result<f64> {
        point_set_distance(
            x.dimension_points(self.dim),
            y.dimension_points(self.dim),
            &self.metric,
        )
    }

    fn self_value(&self) -> f64 {
        0.0
    }

    fn validate(&self) -> Result<()> {
        self.metric.validate()
    }
}
