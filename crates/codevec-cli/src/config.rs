//! Session configuration from JSON files and command-line overrides.
//!
//! A config file holds a serialized [`SessionConfig`]; every field is
//! optional and falls back to the library defaults:
//!
//! ```json
//! {
//!   "block": { "height": 4, "width": 4 },
//!   "encoding": "samples",
//!   "training": { "codebook_size": 64, "seed": 7, "init": "kmeans++" }
//! }
//! ```

use std::fs;
use std::path::Path;

use codevec::{BlockEncoding, BlockShape, EmptyClusterPolicy, InitStrategy, SessionConfig};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] codevec::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load a session configuration from a JSON file.
pub fn load_session_config(path: &Path) -> ConfigResult<SessionConfig> {
    let text = fs::read_to_string(path)?;
    let config: SessionConfig = serde_json::from_str(&text)?;
    Ok(config)
}

/// Values given on the command line; each one that is set wins over the
/// config file.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub codebook_size: Option<usize>,
    pub block: Option<BlockShape>,
    pub encoding: Option<BlockEncoding>,
    pub seed: Option<u64>,
    pub max_iterations: Option<usize>,
    pub convergence_threshold: Option<f64>,
    pub init: Option<InitStrategy>,
    pub empty_clusters: Option<EmptyClusterPolicy>,
}

impl SessionOverrides {
    /// Apply the overrides to `base` and validate the result.
    pub fn apply(&self, mut base: SessionConfig) -> ConfigResult<SessionConfig> {
        if let Some(block) = self.block {
            base.block = block;
        }
        if let Some(encoding) = self.encoding {
            base.encoding = encoding;
        }

        let training = &mut base.training;
        if let Some(k) = self.codebook_size {
            training.codebook_size = k;
        }
        if let Some(seed) = self.seed {
            training.seed = Some(seed);
        }
        if let Some(max) = self.max_iterations {
            training.max_iterations = max;
        }
        if let Some(threshold) = self.convergence_threshold {
            training.convergence_threshold = threshold;
        }
        if let Some(init) = self.init {
            training.init = init;
        }
        if let Some(policy) = self.empty_clusters {
            training.empty_clusters = policy;
        }

        base.validate()?;
        Ok(base)
    }

    /// Resolve the final configuration: file (if any), then overrides.
    pub fn resolve(&self, config_path: Option<&Path>) -> ConfigResult<SessionConfig> {
        let base = match config_path {
            Some(path) => load_session_config(path)?,
            None => SessionConfig::default(),
        };
        self.apply(base)
    }
}
