//! Codebooks and cluster assignments.
//!
//! ## Shapes
//!
//! ```text
//! Codebook    k codewords × d components   (k ≥ 1, d ≥ 1)
//! Assignment  n indices, each in [0, k)    (one per input vector)
//! ```
//!
//! A codebook is a value: training produces a fresh codebook on every
//! iteration instead of mutating one in place.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vector::Vector;

/// An ordered, non-empty set of equal-dimension codewords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vector>", into = "Vec<Vector>")]
pub struct Codebook {
    dim: usize,
    codewords: Vec<Vector>,
}

impl Codebook {
    /// Build a codebook, validating that it is non-empty and uniformly shaped.
    pub fn new(codewords: Vec<Vector>) -> Result<Self> {
        let dim = codewords
            .first()
            .map(Vector::dim)
            .ok_or_else(|| Error::invalid("codebook must contain at least one codeword"))?;
        if dim == 0 {
            return Err(Error::invalid("codewords must have at least one component"));
        }
        if let Some(bad) = codewords.iter().find(|c| c.dim() != dim) {
            return Err(Error::dimension_mismatch(dim, bad.dim()));
        }
        Ok(Self { dim, codewords })
    }

    /// Build a codebook from a flat row-major `k × dim` buffer.
    pub fn from_flat(values: &[f64], dim: usize) -> Result<Self> {
        if dim == 0 || values.is_empty() || values.len() % dim != 0 {
            return Err(Error::invalid(format!(
                "flat codebook of {} values is not a whole number of {}-dimensional codewords",
                values.len(),
                dim
            )));
        }
        Self::new(values.chunks_exact(dim).map(Vector::from).collect())
    }

    /// Number of codewords (`k`).
    #[inline]
    pub fn len(&self) -> usize {
        self.codewords.len()
    }

    /// Always false; a codebook holds at least one codeword.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codewords.is_empty()
    }

    /// Codeword dimension (`d`).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Codeword at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Vector> {
        self.codewords.get(index)
    }

    /// All codewords in index order.
    pub fn codewords(&self) -> &[Vector] {
        &self.codewords
    }

    /// Iterate over codewords in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Vector> {
        self.codewords.iter()
    }

    /// Codewords as a flat row-major buffer.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.len() * self.dim);
        for c in &self.codewords {
            flat.extend_from_slice(c.as_slice());
        }
        flat
    }

    /// Consume the codebook, returning its codewords.
    pub fn into_codewords(self) -> Vec<Vector> {
        self.codewords
    }

    /// Frobenius norm of the difference between two same-shape codebooks:
    /// the square root of the sum of squared differences over every entry.
    pub fn shift(&self, other: &Codebook) -> Result<f64> {
        if self.len() != other.len() {
            return Err(Error::invalid(format!(
                "codebook sizes differ: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        if self.dim != other.dim {
            return Err(Error::dimension_mismatch(self.dim, other.dim));
        }

        let sum: f64 = self
            .codewords
            .iter()
            .zip(other.codewords.iter())
            .map(|(a, b)| crate::distance::squared_distance(a.as_slice(), b.as_slice()))
            .sum();
        Ok(sum.sqrt())
    }

    /// Index of the nearest codeword to `vector`; see [`crate::classify`].
    pub fn classify(&self, vector: &[f64]) -> Result<usize> {
        if vector.len() != self.dim {
            return Err(Error::dimension_mismatch(self.dim, vector.len()));
        }
        Ok(crate::classify::classify(self, vector))
    }

    /// Replace every index with its codeword.
    pub fn decode(&self, assignment: &Assignment) -> Result<Vec<Vector>> {
        assignment
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                self.get(index).cloned().ok_or_else(|| {
                    Error::format(format!(
                        "assignment {} refers to codeword {} of {}",
                        position,
                        index,
                        self.len()
                    ))
                })
            })
            .collect()
    }
}

impl TryFrom<Vec<Vector>> for Codebook {
    type Error = Error;

    fn try_from(codewords: Vec<Vector>) -> Result<Self> {
        Codebook::new(codewords)
    }
}

impl From<Codebook> for Vec<Vector> {
    fn from(codebook: Codebook) -> Self {
        codebook.codewords
    }
}

impl<'a> IntoIterator for &'a Codebook {
    type Item = &'a Vector;
    type IntoIter = std::slice::Iter<'a, Vector>;

    fn into_iter(self) -> Self::IntoIter {
        self.codewords.iter()
    }
}

/// Mapping from input position (insertion order) to codeword index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(Vec<usize>);

impl Assignment {
    /// Wrap a list of codeword indices.
    pub fn new(indices: Vec<usize>) -> Self {
        Assignment(indices)
    }

    /// Number of assigned vectors.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no vectors are assigned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Codeword index for the vector at `position`.
    #[inline]
    pub fn get(&self, position: usize) -> Option<usize> {
        self.0.get(position).copied()
    }

    /// Indices in input order.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Iterate over indices in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    /// Largest index present.
    pub fn max_index(&self) -> Option<usize> {
        self.0.iter().copied().max()
    }

    /// Number of vectors assigned to each of `k` codewords.
    ///
    /// Indices `>= k` are ignored.
    pub fn cluster_sizes(&self, k: usize) -> Vec<usize> {
        let mut sizes = vec![0usize; k];
        for &index in &self.0 {
            if let Some(size) = sizes.get_mut(index) {
                *size += 1;
            }
        }
        sizes
    }

    /// Consume the assignment, returning its indices.
    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl From<Vec<usize>> for Assignment {
    fn from(indices: Vec<usize>) -> Self {
        Assignment(indices)
    }
}

impl FromIterator<usize> for Assignment {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Assignment(iter.into_iter().collect())
    }
}
