//! Distortion and usage statistics for a quantized vector set.

use serde::{Deserialize, Serialize};

use crate::codebook::{Assignment, Codebook};
use crate::distance::squared_distance;
use crate::error::{Error, Result};
use crate::vector::Vector;

/// Quantization error of a vector set against a codebook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    /// Mean squared error per component.
    pub mse: f64,

    /// Mean squared Euclidean distance per vector.
    pub mean_squared_distance: f64,

    /// Largest Euclidean distance from any vector to its codeword.
    pub max_distance: f64,

    /// Number of vectors measured.
    pub vectors: usize,
}

impl Distortion {
    /// Measure how far each vector lies from its assigned codeword.
    pub fn measure(codebook: &Codebook, vectors: &[Vector], assignment: &Assignment) -> Result<Self> {
        if vectors.len() != assignment.len() {
            return Err(Error::invalid(format!(
                "{} vectors but {} assignments",
                vectors.len(),
                assignment.len()
            )));
        }
        if vectors.is_empty() {
            return Ok(Self::default());
        }

        let mut total = 0.0;
        let mut max_sq = 0.0f64;
        for (v, &index) in vectors.iter().zip(assignment.iter()) {
            let codeword = codebook
                .get(index)
                .ok_or_else(|| Error::invalid(format!("codeword {} out of range", index)))?;
            if v.dim() != codebook.dim() {
                return Err(Error::dimension_mismatch(codebook.dim(), v.dim()));
            }
            let sq = squared_distance(v.as_slice(), codeword.as_slice());
            total += sq;
            max_sq = max_sq.max(sq);
        }

        let n = vectors.len() as f64;
        Ok(Self {
            mse: total / (n * codebook.dim() as f64),
            mean_squared_distance: total / n,
            max_distance: max_sq.sqrt(),
            vectors: vectors.len(),
        })
    }

    /// Root mean squared error per component.
    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }

    /// Peak signal-to-noise ratio in dB for samples with the given peak value.
    pub fn psnr(&self, peak: f64) -> f64 {
        if self.mse < 1e-12 {
            return f64::INFINITY;
        }
        10.0 * (peak * peak / self.mse).log10()
    }
}

/// How evenly the codewords are used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Vectors assigned to each codeword, by index.
    pub cluster_sizes: Vec<usize>,

    /// Codewords with no assigned vectors.
    pub unused: usize,
}

impl UsageStats {
    /// Count codeword usage for an assignment against `k` codewords.
    pub fn from_assignment(assignment: &Assignment, k: usize) -> Self {
        let cluster_sizes = assignment.cluster_sizes(k);
        let unused = cluster_sizes.iter().filter(|&&s| s == 0).count();
        Self {
            cluster_sizes,
            unused,
        }
    }

    /// (min, max, mean) cluster size.
    pub fn distribution(&self) -> (usize, usize, f64) {
        let min = self.cluster_sizes.iter().copied().min().unwrap_or(0);
        let max = self.cluster_sizes.iter().copied().max().unwrap_or(0);
        let mean = if self.cluster_sizes.is_empty() {
            0.0
        } else {
            self.cluster_sizes.iter().sum::<usize>() as f64 / self.cluster_sizes.len() as f64
        };
        (min, max, mean)
    }

    /// Summary line for logs.
    pub fn summary(&self) -> String {
        let (min, max, mean) = self.distribution();
        format!(
            "codewords: {}, unused: {}, cluster size min/max/mean: {}/{}/{:.1}",
            self.cluster_sizes.len(),
            self.unused,
            min,
            max,
            mean
        )
    }
}
