//! Nearest-codeword classification.
//!
//! The scan compares squared distances with strict less-than, so the lowest
//! index wins when several codewords are equidistant. Ties are decided on the
//! exact squared distances: two codewords whose square roots round to the
//! same `f64` still rank by their squared values. Classification is `O(k)`
//! per vector and dominates training cost.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::codebook::{Assignment, Codebook};
use crate::distance::squared_distance;
use crate::vector::Vector;

/// Index of the codeword nearest to `vector`.
///
/// `vector` must have the codebook's dimension.
#[inline]
pub fn classify(codebook: &Codebook, vector: &[f64]) -> usize {
    nearest(codebook, vector).0
}

/// Index of the nearest codeword and its Euclidean distance.
pub fn classify_with_distance(codebook: &Codebook, vector: &[f64]) -> (usize, f64) {
    let (index, squared) = nearest(codebook, vector);
    (index, squared.sqrt())
}

/// Classify every vector, preserving input order.
///
/// With the `parallel` feature the map is spread over the rayon pool; each
/// result depends only on its own vector, so the output is identical.
pub fn assign(codebook: &Codebook, vectors: &[Vector]) -> Assignment {
    #[cfg(feature = "parallel")]
    let indices: Vec<usize> = vectors
        .par_iter()
        .map(|v| classify(codebook, v.as_slice()))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let indices: Vec<usize> = vectors
        .iter()
        .map(|v| classify(codebook, v.as_slice()))
        .collect();

    Assignment::new(indices)
}

/// Classify every vector and also return the distance to its codeword.
pub fn assign_with_distances(codebook: &Codebook, vectors: &[Vector]) -> (Assignment, Vec<f64>) {
    #[cfg(feature = "parallel")]
    let pairs: Vec<(usize, f64)> = vectors
        .par_iter()
        .map(|v| classify_with_distance(codebook, v.as_slice()))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let pairs: Vec<(usize, f64)> = vectors
        .iter()
        .map(|v| classify_with_distance(codebook, v.as_slice()))
        .collect();

    let (indices, distances) = pairs.into_iter().unzip();
    (Assignment::new(indices), distances)
}

fn nearest(codebook: &Codebook, vector: &[f64]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;

    for (i, codeword) in codebook.iter().enumerate() {
        let dist = squared_distance(vector, codeword.as_slice());
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }

    (best_idx, best_dist)
}
