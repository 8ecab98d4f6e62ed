//! Codebook training by generalized Lloyd (LBG / k-means) iteration.
//!
//! ```text
//! initialize ──► assign ──► update ──► shift < threshold? ──yes──► finalize
//!                  ▲                          │no
//!                  └──────────────────────────┘  (at most max_iterations)
//! ```
//!
//! Every pass builds a new codebook from the cluster means; the previous one
//! is only kept long enough to measure the shift. The final assignment is
//! always recomputed against the returned codebook.

use codevec_core::{
    assign, common_dimension, squared_distance, Assignment, Codebook, Distortion, Error, Result,
    UsageStats, Vector,
};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::report::{Diagnostic, TrainingReport};

/// How the initial codebook is drawn from the inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitStrategy {
    /// `k` uniform draws with replacement; duplicate codewords are allowed.
    #[default]
    #[serde(rename = "random")]
    RandomSample,
    /// k-means++ seeding: each further codeword is drawn with probability
    /// proportional to its squared distance from the codewords chosen so far.
    #[serde(rename = "kmeans++")]
    KMeansPlusPlus,
}

/// What happens to a codeword whose cluster is empty during an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyClusterPolicy {
    /// Keep the previous codeword unchanged.
    #[default]
    #[serde(rename = "freeze")]
    Freeze,
    /// Replace it with the input vector farthest from its assigned codeword.
    #[serde(rename = "reseed")]
    ReseedWorstFit,
}

/// Configuration for codebook training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target codebook size `k`.
    #[serde(default = "default_codebook_size")]
    pub codebook_size: usize,

    /// Maximum Lloyd iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Training stops once the codebook shift is strictly below this value.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    /// Seed for reproducibility; `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Initial codebook selection.
    #[serde(default)]
    pub init: InitStrategy,

    /// Handling of empty clusters.
    #[serde(default)]
    pub empty_clusters: EmptyClusterPolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            codebook_size: default_codebook_size(),
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
            seed: None,
            init: InitStrategy::default(),
            empty_clusters: EmptyClusterPolicy::default(),
        }
    }
}

impl TrainingConfig {
    /// Default configuration with codebook size `k`.
    pub fn with_codebook_size(k: usize) -> Self {
        Self {
            codebook_size: k,
            ..Default::default()
        }
    }

    /// Set the seed.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject configurations training cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.codebook_size < 1 {
            return Err(Error::invalid("codebook size k must be at least 1"));
        }
        if self.max_iterations < 1 {
            return Err(Error::invalid("max_iterations must be at least 1"));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(Error::invalid(format!(
                "convergence threshold must be finite and non-negative, got {}",
                self.convergence_threshold
            )));
        }
        Ok(())
    }
}

fn default_codebook_size() -> usize {
    32
}

fn default_max_iterations() -> usize {
    100
}

fn default_convergence_threshold() -> f64 {
    1e-6
}

/// Output of a training run.
#[derive(Debug, Clone)]
pub struct TrainedCodebook {
    /// Final codebook, exactly `k` codewords.
    pub codebook: Codebook,
    /// Nearest-codeword index for every input, against `codebook`.
    pub assignment: Assignment,
    /// Iteration count, convergence and diagnostics.
    pub report: TrainingReport,
}

/// Codebook trainer using Lloyd iteration.
#[derive(Debug, Clone, Default)]
pub struct CodebookTrainer {
    config: TrainingConfig,
}

impl CodebookTrainer {
    /// Create a new trainer.
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Get trainer configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train a codebook on `vectors`.
    ///
    /// Fails with `InvalidArgument` before any iteration if the configuration
    /// is unusable, the input is empty, or the vectors disagree on dimension.
    pub fn train(&self, vectors: &[Vector]) -> Result<TrainedCodebook> {
        self.config.validate()?;
        let dim = common_dimension(vectors)?;
        let k = self.config.codebook_size;

        if k > vectors.len() {
            warn!(
                "codebook size {} exceeds {} input vectors; some clusters will stay empty",
                k,
                vectors.len()
            );
        }

        let mut rng = match self.config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut codebook = match self.config.init {
            InitStrategy::RandomSample => random_init(k, vectors, &mut rng)?,
            InitStrategy::KMeansPlusPlus => kmeans_pp_init(k, vectors, &mut rng)?,
        };
        debug!(k, dim, n = vectors.len(), init = ?self.config.init, "initialized codebook");

        let mut diagnostics = Vec::new();
        let mut iterations = 0;
        let mut converged = false;
        let mut final_shift = f64::INFINITY;

        for iteration in 1..=self.config.max_iterations {
            iterations = iteration;

            let assignment = assign(&codebook, vectors);
            let next = self.update(iteration, &codebook, vectors, &assignment, &mut diagnostics)?;
            let shift = codebook.shift(&next)?;

            codebook = next;
            final_shift = shift;
            debug!(iteration, shift, "lloyd iteration");

            if shift < self.config.convergence_threshold {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                "codebook did not converge within {} iterations (last shift {:.3e})",
                iterations, final_shift
            );
            diagnostics.push(Diagnostic::NotConverged {
                iterations,
                final_shift,
            });
        }

        let assignment = assign(&codebook, vectors);
        let distortion = Distortion::measure(&codebook, vectors, &assignment)?;
        let usage = UsageStats::from_assignment(&assignment, k);

        let report = TrainingReport {
            iterations,
            converged,
            final_shift,
            distortion,
            usage,
            diagnostics,
        };
        info!("trained {}x{} codebook: {}", k, dim, report.summary());

        Ok(TrainedCodebook {
            codebook,
            assignment,
            report,
        })
    }

    /// Compute the next codebook from cluster means.
    ///
    /// Sums are accumulated in input order so the result does not depend on
    /// how the assignment was computed.
    fn update(
        &self,
        iteration: usize,
        codebook: &Codebook,
        vectors: &[Vector],
        assignment: &Assignment,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Codebook> {
        let k = codebook.len();
        let dim = codebook.dim();
        let mut sums = vec![0.0f64; k * dim];
        let mut counts = vec![0usize; k];

        for (v, &cluster) in vectors.iter().zip(assignment.iter()) {
            counts[cluster] += 1;
            let acc = &mut sums[cluster * dim..(cluster + 1) * dim];
            for (s, &c) in acc.iter_mut().zip(v.as_slice()) {
                *s += c;
            }
        }

        let empty: Vec<usize> = (0..k).filter(|&j| counts[j] == 0).collect();
        let reseed = self.config.empty_clusters == EmptyClusterPolicy::ReseedWorstFit;
        let mut replacements = if reseed && !empty.is_empty() {
            worst_fit_order(codebook, vectors, assignment).into_iter()
        } else {
            Vec::new().into_iter()
        };

        let mut codewords = Vec::with_capacity(k);
        for (j, old) in codebook.iter().enumerate() {
            if counts[j] > 0 {
                let n = counts[j] as f64;
                let mean: Vec<f64> = sums[j * dim..(j + 1) * dim].iter().map(|s| s / n).collect();
                codewords.push(Vector::from(mean));
                continue;
            }

            let replacement = if reseed { replacements.next() } else { None };
            diagnostics.push(Diagnostic::DegenerateCluster {
                iteration,
                codeword: j,
                reseeded: replacement.is_some(),
            });
            match replacement {
                Some(position) => codewords.push(vectors[position].clone()),
                None => codewords.push(old.clone()),
            }
        }

        if !empty.is_empty() {
            warn!(
                iteration,
                empty = empty.len(),
                policy = ?self.config.empty_clusters,
                "empty clusters during update"
            );
        }

        Codebook::new(codewords)
    }
}

/// Train a `k`-codeword codebook with default settings.
///
/// `seed` pins the random initialization; `None` is unseeded.
pub fn train(vectors: &[Vector], k: usize, seed: Option<u64>) -> Result<(Codebook, Assignment)> {
    let config = TrainingConfig {
        codebook_size: k,
        seed,
        ..Default::default()
    };
    let trained = CodebookTrainer::new(config).train(vectors)?;
    Ok((trained.codebook, trained.assignment))
}

/// Random initialization: `k` draws with replacement.
fn random_init(k: usize, vectors: &[Vector], rng: &mut StdRng) -> Result<Codebook> {
    let codewords: Vec<Vector> = (0..k)
        .map(|_| vectors[rng.gen_range(0..vectors.len())].clone())
        .collect();
    Codebook::new(codewords)
}

/// K-means++ initialization
fn kmeans_pp_init(k: usize, vectors: &[Vector], rng: &mut StdRng) -> Result<Codebook> {
    let n = vectors.len();
    let mut chosen: Vec<Vector> = Vec::with_capacity(k);
    let mut distances = vec![f64::INFINITY; n];

    chosen.push(vectors[rng.gen_range(0..n)].clone());

    for _ in 1..k {
        let last = chosen[chosen.len() - 1].as_slice();
        for (d, v) in distances.iter_mut().zip(vectors) {
            *d = d.min(squared_distance(v.as_slice(), last));
        }

        let total: f64 = distances.iter().sum();
        let pick = if total > 0.0 && total.is_finite() {
            let threshold = rng.gen::<f64>() * total;
            let mut cumsum = 0.0;
            let mut pick = None;
            for (i, &d) in distances.iter().enumerate() {
                cumsum += d;
                if cumsum > threshold && d > 0.0 {
                    pick = Some(i);
                    break;
                }
            }
            // Rounding can leave the threshold just past the final sum
            pick.or_else(|| distances.iter().rposition(|&d| d > 0.0))
                .unwrap_or(0)
        } else {
            // Every input coincides with a chosen codeword
            rng.gen_range(0..n)
        };

        chosen.push(vectors[pick].clone());
    }

    Codebook::new(chosen)
}

/// Input positions ordered by distance to their assigned codeword, farthest
/// first; ties keep input order.
fn worst_fit_order(codebook: &Codebook, vectors: &[Vector], assignment: &Assignment) -> Vec<usize> {
    let mut fits: Vec<(usize, f64)> = vectors
        .iter()
        .zip(assignment.iter())
        .enumerate()
        .filter_map(|(position, (v, &index))| {
            codebook
                .get(index)
                .map(|c| (position, squared_distance(v.as_slice(), c.as_slice())))
        })
        .collect();
    fits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    fits.into_iter().map(|(position, _)| position).collect()
}
