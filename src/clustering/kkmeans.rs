//! Kernel k-means
//!
//! Feature-space distances are expanded with the kernel trick. For a point with
//! kernel row `k` against the training set and a cluster `C`,
//!
//! ```text
//! ‖φ(x) - μ_C‖² = K(x,x) - 2/|C| Σ_{j∈C} k_j + 1/|C|² Σ_{j,l∈C} K_jl
//! ```
//!
//! `K(x,x)` is the same for every cluster and drops out of the comparison. The
//! last term is stored per cluster, so assigning a new diagram needs only its
//! cross-kernel row. Training and out-of-sample assignment share one nearest
//! cluster routine (ties go to the lowest cluster index), which is what makes
//! assigning the training collection reproduce the fitted labels.
//!
//! A cluster that empties out is re-seeded with the worst-fitting point of a
//! larger cluster. When that point coincides in feature space with its old
//! cluster the re-seed is undone by the next assignment; the fit then stops at
//! that fixed point and the cluster stays empty.

use crate::core::{GramMatrix, KernelParams, PdkError, PersistenceDiagram, Result};
use crate::gram::GramMatrixEngine;
use crate::kernel::PersistenceFisherKernel;
use crate::utils::validation::{at_most, positive_count};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Initial seeding policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Init {
    /// Random first seed, then repeatedly the point farthest from all seeds so far
    #[default]
    FarthestFirst,
    /// `num_clusters` distinct random seeds
    Random,
}

/// Iteration settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    pub max_iterations: usize,
    pub seed: u64,
    pub init: Init,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            seed: 42,
            init: Init::FarthestFirst,
        }
    }
}

/// Kernel k-means builder
#[derive(Debug, Clone)]
pub struct KernelKMeans {
    num_clusters: usize,
    params: KernelParams,
    workers: Option<usize>,
    config: KMeansConfig,
}

impl KernelKMeans {
    pub fn new(num_clusters: usize) -> Self {
        Self {
            num_clusters,
            params: KernelParams::default(),
            workers: None,
            config: KMeansConfig::default(),
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

    pub fn with_config(mut self, config: KMeansConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_init(mut self, init: Init) -> Self {
        self.config.init = init;
        self
    }

    /// Partition the training diagrams
    pub fn fit(&self, diagrams: &[PersistenceDiagram]) -> Result<KernelClusterModel> {
        let kernel = PersistenceFisherKernel::new(self.params)?;
        let k = positive_count("num_clusters", self.num_clusters)?;
        positive_count("max_iterations", self.config.max_iterations)?;
        if diagrams.is_empty() {
            return Err(PdkError::EmptyCollection);
        }
        at_most("num_clusters", k, diagrams.len(), "training diagrams")?;

        let gram = GramMatrixEngine::new(kernel)
            .with_workers(self.workers)
            .self_gram(diagrams)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let seeds = match self.config.init {
            Init::FarthestFirst => farthest_first_seeds(&gram, k, &mut rng),
            Init::Random => random_seeds(gram.nrows(), k, &mut rng),
        };
        debug!("kernel k-means seeds: {seeds:?}");

        let seed_centroids: Vec<Centroid> = seeds
            .iter()
            .map(|&s| Centroid::from_members(&gram, vec![s]))
            .collect();
        let mut labels = nearest_clusters(&gram, &seed_centroids);

        let mut iterations = 0;
        let mut converged = false;
        let mut centroids = seed_centroids;
        while iterations < self.config.max_iterations {
            iterations += 1;
            let before_fill = labels.clone();
            fill_empty_clusters(&gram, &mut labels, k);
            centroids = centroids_from_labels(&gram, &labels, k);
            let next = nearest_clusters(&gram, &centroids);
            if next == labels {
                converged = true;
                break;
            }
            if labels != before_fill && next == before_fill {
                // Re-seeded points tie with their old cluster and fall back into it
                warn!(
                    "kernel k-means cannot keep all {k} clusters non-empty: \
                     fewer distinct feature-space points than clusters"
                );
                labels = next;
                converged = true;
                break;
            }
            labels = next;
        }

        if !converged {
            warn!(
                "kernel k-means stopped after {} iterations without converging",
                iterations
            );
            // Keep labels consistent with the stored centroids
            labels = nearest_clusters(&gram, &centroids);
        }

        let withinss = centroids
            .iter()
            .enumerate()
            .map(|(c, centroid)| {
                labels
                    .iter()
                    .enumerate()
                    .filter(|&(_, &label)| label == c)
                    .map(|(i, _)| gram.get(i, i) + centroid.partial_distance(gram.row(i)))
                    .sum::<f64>()
                    .max(0.0)
            })
            .collect();

        let model = KernelClusterModel {
            params: self.params,
            num_clusters: k,
            labels,
            centroids,
            withinss,
            iterations,
            converged,
            diagrams: diagrams.to_vec(),
        };
        info!(
            "kernel k-means fitted on {} diagrams: {} clusters of sizes {:?} after {} iterations",
            diagrams.len(),
            k,
            model.cluster_sizes(),
            iterations
        );
        Ok(model)
    }
}

/// Cluster centre in the implicit feature space, represented by its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Centroid {
    members: Vec<usize>,
    /// `1/|C|² Σ_{j,l∈C} K_jl`
    self_term: f64,
}

impl Centroid {
    fn from_members(gram: &GramMatrix, members: Vec<usize>) -> Self {
        let size = members.len() as f64;
        let total: f64 = members
            .iter()
            .map(|&j| members.iter().map(|&l| gram.get(j, l)).sum::<f64>())
            .sum();
        Self {
            self_term: total / (size * size),
            members,
        }
    }

    /// Squared feature-space distance minus the point's own `K(x,x)`
    fn partial_distance(&self, row: &[f64]) -> f64 {
        let cross: f64 = self.members.iter().map(|&j| row[j]).sum();
        self.self_term - 2.0 * cross / self.members.len() as f64
    }
}

/// Index of the nearest centroid, lowest index on ties
fn nearest_cluster(row: &[f64], centroids: &[Centroid]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let distance = centroid.partial_distance(row);
        if distance < best_distance {
            best = c;
            best_distance = distance;
        }
    }
    best
}

fn nearest_clusters(gram: &GramMatrix, centroids: &[Centroid]) -> Vec<usize> {
    gram.rows().map(|row| nearest_cluster(row, centroids)).collect()
}

fn centroids_from_labels(gram: &GramMatrix, labels: &[usize], k: usize) -> Vec<Centroid> {
    let mut members = vec![Vec::new(); k];
    for (i, &label) in labels.iter().enumerate() {
        members[label].push(i);
    }
    members
        .into_iter()
        .map(|m| Centroid::from_members(gram, m))
        .collect()
}

/// Move the worst-fitting point of a multi-member cluster into each empty cluster
fn fill_empty_clusters(gram: &GramMatrix, labels: &mut [usize], k: usize) {
    loop {
        let mut sizes = vec![0usize; k];
        for &label in labels.iter() {
            sizes[label] += 1;
        }
        let Some(empty) = sizes.iter().position(|&s| s == 0) else {
            return;
        };

        let centroids: Vec<Option<Centroid>> = (0..k)
            .map(|c| {
                let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == c).collect();
                (!members.is_empty()).then(|| Centroid::from_members(gram, members))
            })
            .collect();

        let mut worst: Option<(usize, f64)> = None;
        for (i, &label) in labels.iter().enumerate() {
            if sizes[label] < 2 {
                continue;
            }
            let Some(centroid) = &centroids[label] else {
                continue;
            };
            let distance = gram.get(i, i) + centroid.partial_distance(gram.row(i));
            if worst.map_or(true, |(_, d)| distance > d) {
                worst = Some((i, distance));
            }
        }

        // k <= n guarantees some cluster has two members while another is empty
        let Some((point, _)) = worst else {
            return;
        };
        warn!("cluster {empty} became empty, re-seeding it with diagram {point}");
        labels[point] = empty;
    }
}

fn inconsistent(message: String) -> PdkError {
    PdkError::SerializationError(format!("inconsistent kernel k-means model: {message}"))
}

fn feature_distance(gram: &GramMatrix, i: usize, j: usize) -> f64 {
    gram.get(i, i) + gram.get(j, j) - 2.0 * gram.get(i, j)
}

fn farthest_first_seeds(gram: &GramMatrix, k: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let n = gram.nrows();
    let mut seeds = vec![rng.gen_range(0..n)];
    let mut closest: Vec<f64> = (0..n).map(|i| feature_distance(gram, i, seeds[0])).collect();

    while seeds.len() < k {
        let mut next: Option<(usize, f64)> = None;
        for (i, &distance) in closest.iter().enumerate() {
            if seeds.contains(&i) {
                continue;
            }
            if next.map_or(true, |(_, d)| distance > d) {
                next = Some((i, distance));
            }
        }
        let Some((seed, _)) = next else {
            break;
        };
        seeds.push(seed);
        for (i, value) in closest.iter_mut().enumerate() {
            *value = value.min(feature_distance(gram, i, seed));
        }
    }
    seeds
}

fn random_seeds(n: usize, k: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices
}

/// Fitted kernel k-means: training labels and the centroids needed to assign new diagrams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelClusterModel {
    params: KernelParams,
    num_clusters: usize,
    labels: Vec<usize>,
    centroids: Vec<Centroid>,
    withinss: Vec<f64>,
    iterations: usize,
    converged: bool,
    diagrams: Vec<PersistenceDiagram>,
}

impl KernelClusterModel {
    pub fn params(&self) -> KernelParams {
        self.params
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Zero-based cluster label of every training diagram
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_clusters];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Within-cluster sum of squared feature-space distances
    pub fn withinss(&self) -> &[f64] {
        &self.withinss
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn training_diagrams(&self) -> &[PersistenceDiagram] {
        &self.diagrams
    }

    /// Check that labels and centroid members refer to existing clusters and
    /// training diagrams, as a deserialized model may not
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        let n = self.diagrams.len();
        let k = self.num_clusters;
        if k == 0 || n == 0 {
            return Err(inconsistent(format!("{k} clusters over {n} training diagrams")));
        }
        if self.labels.len() != n {
            return Err(inconsistent(format!(
                "{} labels for {n} training diagrams",
                self.labels.len()
            )));
        }
        if self.centroids.len() != k || self.withinss.len() != k {
            return Err(inconsistent(format!(
                "{} centroids and {} within-cluster sums for {k} clusters",
                self.centroids.len(),
                self.withinss.len()
            )));
        }
        if let Some(label) = self.labels.iter().find(|&&label| label >= k) {
            return Err(inconsistent(format!("label {label} is not below {k}")));
        }
        for (c, centroid) in self.centroids.iter().enumerate() {
            if centroid.members.is_empty() {
                return Err(inconsistent(format!("centroid {c} has no members")));
            }
            if let Some(member) = centroid.members.iter().find(|&&j| j >= n) {
                return Err(inconsistent(format!(
                    "centroid {c} refers to diagram {member} of {n}"
                )));
            }
            if !centroid.self_term.is_finite() {
                return Err(inconsistent(format!("centroid {c} has a non-finite norm")));
            }
        }
        Ok(())
    }

    /// Label of the nearest cluster for each new diagram
    pub fn assign(
        &self,
        diagrams: &[PersistenceDiagram],
        workers: Option<usize>,
    ) -> Result<Vec<usize>> {
        let kernel = PersistenceFisherKernel::new(self.params)?;
        if diagrams.is_empty() {
            return Err(PdkError::EmptyCollection);
        }
        let cross = GramMatrixEngine::new(kernel)
            .with_workers(workers)
            .cross_gram(&self.diagrams, diagrams)?;
        self.assign_gram(&cross)
    }

    /// Assign rows of a precomputed cross-kernel matrix (rows = new, columns = training)
    pub fn assign_gram(&self, cross: &GramMatrix) -> Result<Vec<usize>> {
        if cross.ncols() != self.labels.len() {
            return Err(PdkError::InvalidParameter(format!(
                "cross-kernel matrix has {} columns, model was trained on {} diagrams",
                cross.ncols(),
                self.labels.len()
            )));
        }
        Ok(cross
            .rows()
            .map(|row| nearest_cluster(row, &self.centroids))
            .collect())
    }
}
