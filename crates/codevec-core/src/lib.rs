//! # codevec Core
//!
//! Vectors, codebooks, the Euclidean distance metric and nearest-codeword
//! classification shared by the codevec vector-quantization crates.
//!
//! ## Design
//!
//! - **Immutable vectors**: a [`Vector`] never changes after construction
//! - **Value codebooks**: a [`Codebook`] is replaced wholesale, never patched
//! - **Deterministic search**: [`classify`] breaks ties toward the lowest index
//! - **Parallel-safe**: with the `parallel` feature, [`assign`] fans out over
//!   rayon and returns exactly what the sequential scan would
//!
//! ## Example
//!
//! ```
//! use codevec_core::{classify, Codebook, Vector};
//!
//! let codebook = Codebook::new(vec![Vector::from([10.0]), Vector::from([200.0])])?;
//! assert_eq!(classify(&codebook, &[180.0]), 1);
//! # Ok::<(), codevec_core::Error>(())
//! ```

pub mod classify;
pub mod codebook;
pub mod distance;
pub mod error;
pub mod stats;
pub mod vector;

pub use classify::{assign, assign_with_distances, classify, classify_with_distance};
pub use codebook::{Assignment, Codebook};
pub use distance::{distance, squared_distance};
pub use error::{Error, Result};
pub use stats::{Distortion, UsageStats};
pub use vector::{common_dimension, Vector};
