//! Fixed-dimension sample vectors.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An immutable, fixed-length tuple of real numbers.
///
/// Vectors are the unit of training data and the shape of every codeword.
/// Once built the components cannot be changed; stages hand vectors around by
/// value or by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector(Box<[f64]>);

impl Vector {
    /// Create a vector from its components.
    pub fn new(components: impl Into<Box<[f64]>>) -> Self {
        Vector(components.into())
    }

    /// Create a zero vector of the given dimension.
    pub fn zeros(dim: usize) -> Self {
        Vector(vec![0.0; dim].into_boxed_slice())
    }

    /// Number of components.
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// Components as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Component at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }

    /// Consume the vector, returning its components.
    pub fn into_inner(self) -> Box<[f64]> {
        self.0
    }

    /// Componentwise arithmetic mean of a non-empty set of equal-dimension vectors.
    pub fn mean<'a, I>(vectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Vector>,
    {
        let mut iter = vectors.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| Error::invalid("mean of an empty vector set"))?;

        let mut sum: Vec<f64> = first.as_slice().to_vec();
        let mut count = 1usize;
        for v in iter {
            if v.dim() != sum.len() {
                return Err(Error::dimension_mismatch(sum.len(), v.dim()));
            }
            for (acc, &c) in sum.iter_mut().zip(v.as_slice()) {
                *acc += c;
            }
            count += 1;
        }

        let scale = 1.0 / count as f64;
        Ok(Vector(sum.into_iter().map(|s| s * scale).collect()))
    }
}

impl From<Vec<f64>> for Vector {
    fn from(components: Vec<f64>) -> Self {
        Vector(components.into_boxed_slice())
    }
}

impl From<&[f64]> for Vector {
    fn from(components: &[f64]) -> Self {
        Vector(components.into())
    }
}

impl<const N: usize> From<[f64; N]> for Vector {
    fn from(components: [f64; N]) -> Self {
        Vector(Box::new(components))
    }
}

impl AsRef<[f64]> for Vector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// Check that a non-empty set of vectors shares one non-zero dimension of
/// finite components, returning that dimension.
pub fn common_dimension(vectors: &[Vector]) -> Result<usize> {
    let first = vectors
        .first()
        .ok_or_else(|| Error::invalid("input vector sequence is empty"))?;
    let dim = first.dim();
    if dim == 0 {
        return Err(Error::invalid("vectors must have at least one component"));
    }

    for (position, v) in vectors.iter().enumerate() {
        if v.dim() != dim {
            return Err(Error::dimension_mismatch(dim, v.dim()));
        }
        if !v.is_finite() {
            return Err(Error::invalid(format!(
                "vector {} has a non-finite component",
                position
            )));
        }
    }

    Ok(dim)
}
