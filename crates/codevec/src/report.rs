//! Training diagnostics.
//!
//! Empty clusters and an exhausted iteration budget are not failures; they are
//! collected here and logged, and the trained codebook is still returned.

use codevec_core::{Distortion, UsageStats};
use serde::{Deserialize, Serialize};

/// A non-fatal condition observed during training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A codeword attracted no vectors during an update step.
    DegenerateCluster {
        /// 1-based iteration of the update step.
        iteration: usize,
        /// Index of the empty codeword.
        codeword: usize,
        /// Whether the codeword was reseeded instead of frozen.
        reseeded: bool,
    },

    /// The iteration cap was reached before the convergence test passed.
    NotConverged {
        /// Iterations run.
        iterations: usize,
        /// Codebook shift measured on the last iteration.
        final_shift: f64,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DegenerateCluster {
                iteration,
                codeword,
                reseeded,
            } => write!(
                f,
                "iteration {}: codeword {} has an empty cluster ({})",
                iteration,
                codeword,
                if *reseeded { "reseeded" } else { "frozen" }
            ),
            Diagnostic::NotConverged {
                iterations,
                final_shift,
            } => write!(
                f,
                "not converged after {} iterations (last shift {:.3e})",
                iterations, final_shift
            ),
        }
    }
}

/// Summary of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Lloyd iterations executed (assign + update + convergence test).
    pub iterations: usize,
    /// Whether the convergence test passed before the cap.
    pub converged: bool,
    /// Frobenius shift between the last two codebooks.
    pub final_shift: f64,
    /// Distortion of the inputs against the final codebook.
    pub distortion: Distortion,
    /// Codeword usage under the final assignment.
    pub usage: UsageStats,
    /// Non-fatal conditions, in the order they occurred.
    pub diagnostics: Vec<Diagnostic>,
}

impl TrainingReport {
    /// Number of empty-cluster events across all iterations.
    pub fn degenerate_clusters(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::DegenerateCluster { .. }))
            .count()
    }

    /// Whether the iteration cap cut training short.
    pub fn hit_iteration_cap(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NotConverged { .. }))
    }

    /// Summary line for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "{} after {} iterations (shift {:.3e}), mse {:.4}, {}, {} empty-cluster events",
            if self.converged {
                "converged"
            } else {
                "stopped"
            },
            self.iterations,
            self.final_shift,
            self.distortion.mse,
            self.usage.summary(),
            self.degenerate_clusters()
        )
    }
}
